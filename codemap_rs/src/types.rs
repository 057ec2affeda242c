use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// How a dependency was declared in source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeKind {
    Import,
    Require,
    DynamicImport,
    Use,
    Mod,
    Include,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Import => "import",
            EdgeKind::Require => "require",
            EdgeKind::DynamicImport => "dynamic-import",
            EdgeKind::Use => "use",
            EdgeKind::Mod => "mod",
            EdgeKind::Include => "include",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One dependency reference found in a file.
///
/// `to` is a project-relative path when the reference was resolved locally,
/// otherwise the external package name exactly as written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub from: String,
    pub to: String,
    pub kind: EdgeKind,
    pub is_relative: bool,
    pub is_external: bool,
}

impl DependencyEdge {
    pub fn local(from: &str, to: String, kind: EdgeKind) -> Self {
        Self {
            from: from.to_string(),
            to,
            kind,
            is_relative: true,
            is_external: false,
        }
    }

    pub fn external(from: &str, to: &str, kind: EdgeKind) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            kind,
            is_relative: false,
            is_external: true,
        }
    }
}

/// Language families the extractor knows how to scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// TypeScript and JavaScript in all their module flavours.
    EcmaScript,
    Python,
    Rust,
    Java,
    Go,
    /// C and C++ sources and headers.
    CFamily,
}

impl Language {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "ts" | "tsx" | "js" | "jsx" | "mjs" | "cjs" | "mts" | "cts" => Some(Language::EcmaScript),
            "py" | "pyi" => Some(Language::Python),
            "rs" => Some(Language::Rust),
            "java" => Some(Language::Java),
            "go" => Some(Language::Go),
            "c" | "h" | "cc" | "cpp" | "cxx" | "hpp" | "hh" => Some(Language::CFamily),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Extension appended to a relative specifier that has none.
    pub fn default_extension(&self) -> Option<&'static str> {
        match self {
            Language::EcmaScript => None,
            Language::Python => Some("py"),
            Language::Rust => Some("rs"),
            Language::Java => Some("java"),
            Language::Go => Some("go"),
            Language::CFamily => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Language::EcmaScript => "ecmascript",
            Language::Python => "python",
            Language::Rust => "rust",
            Language::Java => "java",
            Language::Go => "go",
            Language::CFamily => "c",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_kind_serializes_kebab_case() {
        let json = serde_json::to_string(&EdgeKind::DynamicImport).expect("serialize");
        assert_eq!(json, "\"dynamic-import\"");
        assert_eq!(EdgeKind::DynamicImport.to_string(), "dynamic-import");
    }

    #[test]
    fn language_dispatch_is_case_insensitive() {
        assert_eq!(Language::from_extension("TSX"), Some(Language::EcmaScript));
        assert_eq!(Language::from_path(Path::new("a/b.pyi")), Some(Language::Python));
        assert_eq!(Language::from_path(Path::new("README.md")), None);
        assert_eq!(Language::from_path(Path::new("Makefile")), None);
    }
}
