use super::RawImport;
use super::regexes::{regex_rust_mod, regex_rust_use};
use crate::types::EdgeKind;

/// Scan Rust source for `use` paths and `mod name;` declarations.
///
/// `use` paths are kept verbatim (whitespace collapsed) since mapping them to
/// files needs the crate layout. A `mod name;` always names a file of the
/// same crate, so it is rewritten to the sibling module path: `./name.rs`
/// from `lib.rs`/`main.rs`/`mod.rs`, `./<stem>/name.rs` from any other file.
pub(crate) fn scan_rust(content: &str, file_name: &str) -> Vec<RawImport> {
    let mut imports = Vec::new();

    for caps in regex_rust_use().captures_iter(content) {
        let path = caps[1].split_whitespace().collect::<Vec<_>>().join(" ");
        if path.is_empty() {
            continue;
        }
        imports.push(RawImport::new(&path, EdgeKind::Use));
    }

    let stem = file_name.strip_suffix(".rs").unwrap_or(file_name);
    let owns_directory = matches!(stem, "lib" | "main" | "mod");
    for caps in regex_rust_mod().captures_iter(content) {
        let name = &caps[1];
        let specifier = if owns_directory {
            format!("./{name}.rs")
        } else {
            format!("./{stem}/{name}.rs")
        };
        imports.push(RawImport::new(&specifier, EdgeKind::Mod));
    }

    imports
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn use_paths_kept_verbatim() {
        let content = "\
use std::collections::HashMap;
pub use crate::types::{Edge,
    Kind};
pub(crate) use super::helpers::*;
";
        let found: Vec<_> = scan_rust(content, "graph.rs")
            .into_iter()
            .map(|i| (i.specifier, i.kind))
            .collect();
        assert_eq!(
            found,
            vec![
                ("std::collections::HashMap".to_string(), EdgeKind::Use),
                ("crate::types::{Edge, Kind}".to_string(), EdgeKind::Use),
                ("super::helpers::*".to_string(), EdgeKind::Use),
            ]
        );
    }

    #[test]
    fn mod_declarations_point_at_module_files() {
        let content = "mod cache;\npub mod analyzer;\nmod inline { }\n";
        let from_lib: Vec<_> = scan_rust(content, "lib.rs")
            .into_iter()
            .map(|i| i.specifier)
            .collect();
        assert_eq!(from_lib, vec!["./cache.rs", "./analyzer.rs"]);

        let from_module: Vec<_> = scan_rust("mod js;", "analyzer.rs")
            .into_iter()
            .map(|i| i.specifier)
            .collect();
        assert_eq!(from_module, vec!["./analyzer/js.rs"]);
    }
}
