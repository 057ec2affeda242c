//! Graph-database export.
//!
//! One project node, then every classified file's own fragment followed by
//! a `CONTAINS_FILE` link from the project, then one `IMPORTS` statement per
//! distinct internal dependency. External edges are left out. Statement order
//! is the only contract with the loader.

use std::collections::HashSet;

use crate::classifier::ClassifiedFile;
use crate::detect::ProjectInfo;
use crate::types::{DependencyEdge, EdgeKind};

/// Quote `value` as a double-quoted Cypher string literal.
pub fn cypher_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

/// Title a file's document node is matched by.
fn document_title(file: &ClassifiedFile) -> &str {
    let title = file.classification.title.trim();
    if title.is_empty() {
        &file.relative_path
    } else {
        title
    }
}

pub fn build_export(
    project: &ProjectInfo,
    files: &[ClassifiedFile],
    edges: &[DependencyEdge],
) -> Vec<String> {
    let mut statements = Vec::new();
    let project_name = cypher_string(&project.name);
    let types: Vec<&str> = project.types.iter().map(|t| t.as_str()).collect();

    statements.push(format!("// Project: {}", project.name));
    statements.push(format!(
        "CREATE (project:Project {{name: {}, type: {}, primaryLanguage: {}, totalFiles: {}, rootDir: {}}})",
        project_name,
        cypher_string(&types.join(", ")),
        cypher_string(&project.primary_language),
        files.len(),
        cypher_string(&project.root_dir.to_string_lossy().replace('\\', "/")),
    ));

    for file in files {
        statements.push(format!("// File: {}", file.relative_path));
        let fragment = file.classification.export_fragment.trim();
        if !fragment.is_empty() {
            statements.push(fragment.to_string());
        }
        statements.push(format!(
            "MATCH (doc:Document {{title: {}}}), (project:Project {{name: {}}}) CREATE (project)-[:CONTAINS_FILE]->(doc)",
            cypher_string(document_title(file)),
            project_name,
        ));
    }

    let mut seen: HashSet<(&str, &str, EdgeKind)> = HashSet::new();
    let internal: Vec<&DependencyEdge> = edges
        .iter()
        .filter(|e| !e.is_external && seen.insert((e.from.as_str(), e.to.as_str(), e.kind)))
        .collect();
    if !internal.is_empty() {
        statements.push("// Dependencies".to_string());
    }
    for edge in internal {
        statements.push(format!(
            "MERGE (src:File {{path: {}}}) MERGE (dst:File {{path: {}}}) MERGE (src)-[:IMPORTS {{kind: {}}}]->(dst)",
            cypher_string(&edge.from),
            cypher_string(&edge.to),
            cypher_string(edge.kind.as_str()),
        ));
    }

    statements
}

/// Statements joined into one script.
pub fn render_export(statements: &[String]) -> String {
    let mut script = statements.join("\n");
    if !script.is_empty() {
        script.push('\n');
    }
    script
}
