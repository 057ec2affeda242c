//! Lexical dependency extraction and the dependency graph built from it.
//!
//! Each language has a small regex/line scanner (no parse tree) returning raw
//! specifiers. [`DependencyExtractor`] dispatches on the file extension and
//! turns those specifiers into [`DependencyEdge`]s: relative specifiers are
//! resolved against the importing file's directory and re-expressed relative
//! to the scan root, everything else is kept as an external package name.
//!
//! Dynamic or computed imports are not seen; that is accepted.

mod c;
pub mod cycles;
mod go;
pub mod graph;
mod java;
mod js;
mod py;
pub mod regexes;
mod rust;

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::fs_utils::relative_slash_path;
use crate::types::{DependencyEdge, EdgeKind, Language};

pub use cycles::find_cycles;
pub use graph::DependencyGraph;

/// A specifier as written in source, before resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct RawImport {
    pub specifier: String,
    pub kind: EdgeKind,
}

impl RawImport {
    pub(crate) fn new(specifier: &str, kind: EdgeKind) -> Self {
        Self {
            specifier: specifier.to_string(),
            kind,
        }
    }
}

/// Per-project extractor: knows the scan root so edges come out
/// root-relative.
#[derive(Clone, Debug)]
pub struct DependencyExtractor {
    root: PathBuf,
}

impl DependencyExtractor {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Extract edges from already-loaded content. `file` may be absolute
    /// (under the root) or root-relative. Unknown extensions yield nothing.
    pub fn extract(&self, file: &Path, content: &str) -> Vec<DependencyEdge> {
        let Some(language) = Language::from_path(file) else {
            return Vec::new();
        };
        let from = relative_slash_path(file, &self.root);
        extract_edges(&from, language, content)
    }

    /// Read `file` and extract its edges.
    pub async fn extract_file(&self, file: &Path) -> io::Result<Vec<DependencyEdge>> {
        if Language::from_path(file).is_none() {
            return Ok(Vec::new());
        }
        let content = tokio::fs::read_to_string(file).await?;
        Ok(self.extract(file, &content))
    }
}

/// Extract edges for a file whose root-relative, `/`-separated path is `from`.
pub fn extract_edges(from: &str, language: Language, content: &str) -> Vec<DependencyEdge> {
    let file_name = from.rsplit('/').next().unwrap_or(from);
    let raw = match language {
        Language::EcmaScript => js::scan_js(content),
        Language::Python => py::scan_py(content),
        Language::Rust => rust::scan_rust(content, file_name),
        Language::Java => java::scan_java(content),
        Language::Go => go::scan_go(content),
        Language::CFamily => c::scan_c(content),
    };

    // JS-family specifiers usually omit the extension of the importer's own flavour.
    let default_ext = match language {
        Language::EcmaScript => Path::new(file_name).extension().and_then(|e| e.to_str()),
        other => other.default_extension(),
    };

    let edges: Vec<DependencyEdge> = raw
        .into_iter()
        .map(|import| {
            if is_relative_specifier(&import.specifier) {
                let resolved = resolve_specifier(from, &import.specifier, default_ext);
                DependencyEdge::local(from, resolved, import.kind)
            } else {
                DependencyEdge::external(from, &import.specifier, import.kind)
            }
        })
        .collect();

    debug!(file = from, language = language.name(), edges = edges.len(), "extracted dependencies");
    edges
}

pub fn is_relative_specifier(specifier: &str) -> bool {
    specifier.starts_with('.') || specifier.starts_with('/')
}

/// Resolve a relative specifier against the directory of `from` and return
/// the root-relative path. A leading `/` resolves from the scan root.
/// `..` past the root is kept so the edge still points somewhere readable.
pub fn resolve_specifier(from: &str, specifier: &str, default_ext: Option<&str>) -> String {
    let mut segments: Vec<&str> = Vec::new();
    let rest = match specifier.strip_prefix('/') {
        Some(rooted) => rooted,
        None => {
            if let Some((dir, _)) = from.rsplit_once('/') {
                segments.extend(dir.split('/').filter(|s| !s.is_empty()));
            }
            specifier
        }
    };

    for segment in rest.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|last| *last != "..") {
                    segments.pop();
                } else {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }

    let mut resolved = segments.join("/");
    if let Some(ext) = default_ext
        && let Some(last) = segments.last()
        && *last != ".."
        && Path::new(last).extension().is_none()
    {
        resolved.push('.');
        resolved.push_str(ext);
    }
    resolved
}
