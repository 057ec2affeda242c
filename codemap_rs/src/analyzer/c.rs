use super::RawImport;
use super::regexes::regex_c_include;
use crate::types::EdgeKind;

/// Scan C/C++ source for `#include` directives.
///
/// Quoted includes are looked up next to the including file, so they are
/// returned as `./` paths; angle-bracket includes stay external.
pub(crate) fn scan_c(content: &str) -> Vec<RawImport> {
    let mut imports = Vec::new();
    for caps in regex_c_include().captures_iter(content) {
        if let Some(local) = caps.get(1) {
            let header = local.as_str();
            let specifier = if header.starts_with('.') || header.starts_with('/') {
                header.to_string()
            } else {
                format!("./{header}")
            };
            imports.push(RawImport::new(&specifier, EdgeKind::Include));
        } else if let Some(system) = caps.get(2) {
            imports.push(RawImport::new(system.as_str(), EdgeKind::Include));
        }
    }
    imports
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_includes_are_local() {
        let content = "#include <stdio.h>\n#include \"util/strings.h\"\n#  include \"../common.h\"\n";
        let found: Vec<_> = scan_c(content).into_iter().map(|i| i.specifier).collect();
        assert_eq!(found, vec!["stdio.h", "./util/strings.h", "../common.h"]);
    }
}
