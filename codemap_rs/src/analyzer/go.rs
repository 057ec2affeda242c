use super::RawImport;
use crate::types::EdgeKind;

/// Scan Go source for single-line and parenthesised `import` forms.
/// Line based on purpose: aliases, blank and dot imports are accepted.
pub(crate) fn scan_go(content: &str) -> Vec<RawImport> {
    let mut imports: Vec<RawImport> = Vec::new();
    let mut in_block = false;

    for line in content.lines() {
        let trimmed = line.trim();

        if !in_block && is_block_open(trimmed) {
            in_block = true;
            // `import ( "fmt" )` on one line
            let inner = trimmed
                .trim_start_matches("import")
                .trim_start()
                .trim_start_matches('(');
            if let Some(path) = extract_import_path(inner) {
                imports.push(RawImport::new(&path, EdgeKind::Import));
            }
            if inner.contains(')') {
                in_block = false;
            }
            continue;
        }

        if in_block {
            if trimmed.starts_with(')') {
                in_block = false;
                continue;
            }
            if let Some(path) = extract_import_path(trimmed) {
                imports.push(RawImport::new(&path, EdgeKind::Import));
            }
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix("import ")
            && let Some(path) = extract_import_path(rest.trim())
        {
            imports.push(RawImport::new(&path, EdgeKind::Import));
        }
    }

    imports
}

fn is_block_open(trimmed: &str) -> bool {
    trimmed
        .strip_prefix("import")
        .is_some_and(|rest| rest.trim_start().starts_with('('))
}

fn extract_import_path(segment: &str) -> Option<String> {
    if segment.starts_with("//") {
        return None;
    }
    // Accept both "pkg/path" and `pkg/path`
    let quote_start = segment.find(&['"', '`'][..])?;
    let quote = segment.as_bytes()[quote_start];
    let tail = &segment[quote_start + 1..];
    let path_end = tail.find(quote as char)?;
    let path = tail[..path_end].trim();
    if path.is_empty() {
        None
    } else {
        Some(path.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs(content: &str) -> Vec<String> {
        scan_go(content).into_iter().map(|i| i.specifier).collect()
    }

    #[test]
    fn single_and_block_imports() {
        let content = r#"package main

import "fmt"

import (
    "net/http"
    log "github.com/sirupsen/logrus"
    _ "github.com/lib/pq"
    // "commented/out"
    "./internal/util"
)

func main() {}
"#;
        assert_eq!(
            specs(content),
            vec![
                "fmt",
                "net/http",
                "github.com/sirupsen/logrus",
                "github.com/lib/pq",
                "./internal/util"
            ]
        );
    }

    #[test]
    fn one_line_block() {
        assert_eq!(specs("import ( \"os\" )\nimport `strings`\n"), vec!["os", "strings"]);
    }
}
