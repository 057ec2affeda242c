//! Project metadata detection from well-known manifest files.
//!
//! - package.json → nodejs (typescript when tsconfig.json is present)
//! - Cargo.toml → rust
//! - pyproject.toml / setup.py / requirements.txt → python
//! - pom.xml / build.gradle(.kts) → java
//! - go.mod → go
//!
//! More than one ecosystem adds `multi-language`.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectType {
    Nodejs,
    Rust,
    Python,
    Java,
    Go,
    MultiLanguage,
}

impl ProjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectType::Nodejs => "nodejs",
            ProjectType::Rust => "rust",
            ProjectType::Python => "python",
            ProjectType::Java => "java",
            ProjectType::Go => "go",
            ProjectType::MultiLanguage => "multi-language",
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the mapper knows about the project as a whole.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub name: String,
    pub types: Vec<ProjectType>,
    /// `unknown` when no manifest was recognised.
    pub primary_language: String,
    /// Root-relative entry point candidates that exist on disk.
    pub entry_points: Vec<String>,
    pub config_files: Vec<String>,
    pub root_dir: PathBuf,
}

const UNKNOWN: &str = "unknown";

pub fn detect_project(root: &Path) -> ProjectInfo {
    let mut info = ProjectInfo {
        name: directory_name(root).unwrap_or_else(|| UNKNOWN.to_string()),
        types: Vec::new(),
        primary_language: UNKNOWN.to_string(),
        entry_points: Vec::new(),
        config_files: Vec::new(),
        root_dir: root.to_path_buf(),
    };

    if root.join("package.json").is_file() {
        detect_node(root, &mut info);
    }
    if root.join("Cargo.toml").is_file() {
        detect_rust(root, &mut info);
    }
    if let Some(config) = ["pyproject.toml", "setup.py", "requirements.txt"]
        .into_iter()
        .find(|name| root.join(name).is_file())
    {
        info.types.push(ProjectType::Python);
        info.config_files.push(config.to_string());
        set_primary(&mut info, "python");
        push_existing(root, &mut info.entry_points, &["__init__.py", "main.py", "src/__init__.py"]);
    }
    if let Some(config) = ["pom.xml", "build.gradle", "build.gradle.kts"]
        .into_iter()
        .find(|name| root.join(name).is_file())
    {
        info.types.push(ProjectType::Java);
        info.config_files.push(config.to_string());
        set_primary(&mut info, "java");
    }
    if root.join("go.mod").is_file() {
        info.types.push(ProjectType::Go);
        info.config_files.push("go.mod".to_string());
        set_primary(&mut info, "go");
        push_existing(root, &mut info.entry_points, &["main.go"]);
    }

    if info.types.len() > 1 {
        info.types.push(ProjectType::MultiLanguage);
    }

    debug!(
        name = %info.name,
        primary = %info.primary_language,
        types = info.types.len(),
        "detected project"
    );
    info
}

/// Last component of `root`, resolving `.`/`..` endings on disk first.
fn directory_name(root: &Path) -> Option<String> {
    let name = match root.file_name() {
        Some(name) => name.to_os_string(),
        None => root.canonicalize().ok()?.file_name()?.to_os_string(),
    };
    Some(name.to_string_lossy().into_owned())
}

fn detect_node(root: &Path, info: &mut ProjectInfo) {
    info.types.push(ProjectType::Nodejs);
    info.config_files.push("package.json".to_string());
    if root.join("tsconfig.json").is_file() {
        info.config_files.push("tsconfig.json".to_string());
        set_primary(info, "typescript");
    } else {
        set_primary(info, "javascript");
    }

    let manifest = std::fs::read_to_string(root.join("package.json"))
        .ok()
        .and_then(|raw| serde_json::from_str::<serde_json::Value>(&raw).ok());
    if let Some(manifest) = manifest {
        if let Some(name) = manifest.get("name").and_then(|v| v.as_str()) {
            info.name = name.to_string();
        }
        for key in ["main", "module"] {
            if let Some(entry) = manifest.get(key).and_then(|v| v.as_str()) {
                info.entry_points.push(entry.to_string());
            }
        }
    }
    push_existing(
        root,
        &mut info.entry_points,
        &["src/index.ts", "src/index.js", "index.ts", "index.js"],
    );
}

fn detect_rust(root: &Path, info: &mut ProjectInfo) {
    info.types.push(ProjectType::Rust);
    info.config_files.push("Cargo.toml".to_string());
    set_primary(info, "rust");

    let name = std::fs::read_to_string(root.join("Cargo.toml"))
        .ok()
        .and_then(|raw| toml::from_str::<toml::Table>(&raw).ok())
        .and_then(|manifest| {
            manifest
                .get("package")?
                .get("name")?
                .as_str()
                .map(str::to_string)
        });
    if let Some(name) = name {
        info.name = name;
    }
    push_existing(root, &mut info.entry_points, &["src/lib.rs", "src/main.rs"]);
}

/// First recognised ecosystem decides the primary language.
fn set_primary(info: &mut ProjectInfo, language: &str) {
    if info.primary_language == UNKNOWN {
        info.primary_language = language.to_string();
    }
}

fn push_existing(root: &Path, into: &mut Vec<String>, candidates: &[&str]) {
    for candidate in candidates {
        if root.join(candidate).is_file() && !into.iter().any(|e| e == candidate) {
            into.push((*candidate).to_string());
        }
    }
}
