use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::warn;

use crate::ignore::IgnoreMatcher;

/// Extensions mapped by default: source code plus the docs/config formats
/// the classifier understands.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "ts", "tsx", "js", "jsx", "mjs", "cjs", "py", "pyi", "rs", "java", "go", "c", "h", "cc",
    "cpp", "hpp", "md", "json", "yml", "yaml", "toml", "sh",
];

/// Rough role of a file inside its project, used for ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Config,
    Entry,
    Module,
    Test,
    Other,
}

impl FileCategory {
    fn priority(self) -> u8 {
        match self {
            FileCategory::Config => 1,
            FileCategory::Entry => 2,
            FileCategory::Module => 3,
            FileCategory::Test => 4,
            FileCategory::Other => 5,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ScannedFile {
    pub path: PathBuf,
    /// Path relative to the scan root, always `/`-separated.
    pub relative_path: String,
    pub size: u64,
    /// Lowercased extension without the dot.
    pub extension: String,
    pub category: FileCategory,
}

impl AsRef<Path> for ScannedFile {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

/// Knobs for [`gather_files`].
#[derive(Clone, Debug, PartialEq)]
pub struct DiscoveryOptions {
    pub extensions: Option<HashSet<String>>,
    pub include_tests: bool,
    pub show_hidden: bool,
    pub max_depth: Option<usize>,
    /// Read the matcher's ignore file in every directory below the root
    /// while walking. Rules apply to that directory's subtree only.
    pub nested_ignore_files: bool,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            extensions: Some(DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()),
            include_tests: false,
            show_hidden: false,
            max_depth: None,
            nested_ignore_files: true,
        }
    }
}

pub fn matches_extension(path: &Path, extensions: Option<&HashSet<String>>) -> bool {
    match extensions {
        None => true,
        Some(set) => path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| set.contains(&ext.to_lowercase()))
            .unwrap_or(false),
    }
}

pub fn relative_slash_path(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative.to_string_lossy().replace('\\', "/")
}

/// Segment-aware test file heuristic over a `/`-separated relative path.
pub fn is_test_file(relative: &str) -> bool {
    let lower = relative.to_lowercase();
    let mut segments: Vec<&str> = lower.split('/').filter(|s| !s.is_empty()).collect();
    let Some(name) = segments.pop() else {
        return false;
    };

    let dir_hit = segments
        .iter()
        .any(|seg| matches!(*seg, "test" | "tests" | "spec" | "specs" | "__tests__" | "__mocks__"));
    if dir_hit {
        return true;
    }

    let stem = name.split('.').next().unwrap_or(name);
    name.contains(".test.")
        || name.contains(".spec.")
        || stem.starts_with("test_")
        || stem.ends_with("_test")
        || stem.ends_with("_spec")
}

pub fn categorize(relative: &str) -> FileCategory {
    const CONFIG_FILES: &[&str] = &[
        "package.json",
        "tsconfig.json",
        "cargo.toml",
        "pyproject.toml",
        "setup.py",
        "requirements.txt",
        "pom.xml",
        "build.gradle",
        "go.mod",
        "gemfile",
        "composer.json",
        "mix.exs",
    ];
    const ENTRY_STEMS: &[&str] = &["index", "main", "app", "__init__", "lib", "mod"];

    let lower = relative.to_lowercase();
    let name = lower.rsplit('/').next().unwrap_or(&lower);
    if CONFIG_FILES.contains(&name) {
        return FileCategory::Config;
    }

    let is_test = is_test_file(&lower);
    let stem = name.rsplit_once('.').map(|(s, _)| s).unwrap_or(name);
    if ENTRY_STEMS.contains(&stem) && !is_test {
        return FileCategory::Entry;
    }
    if is_test {
        return FileCategory::Test;
    }
    if lower.starts_with("src/")
        || lower.starts_with("lib/")
        || lower.contains("/src/")
        || lower.contains("/lib/")
    {
        return FileCategory::Module;
    }
    FileCategory::Other
}

/// Recursively collect files under `root` that survive the ignore rules,
/// the extension allow-list and the optional test-file exclusion.
///
/// `matcher` should already hold the rules for `root` and its ancestors.
/// Ignore files found further down are layered on top for their own
/// subtree. Unreadable subdirectories are logged and skipped; only an
/// unreadable `root` is an error.
pub fn gather_files(
    root: &Path,
    options: &DiscoveryOptions,
    matcher: &IgnoreMatcher,
) -> io::Result<Vec<ScannedFile>> {
    let mut files = Vec::new();
    // surface a bad root instead of returning an empty scan
    fs::read_dir(root)?;
    walk(root, root, options, matcher, 0, &mut files);
    sort_scanned(&mut files);
    Ok(files)
}

fn walk(
    dir: &Path,
    root: &Path,
    options: &DiscoveryOptions,
    matcher: &IgnoreMatcher,
    depth: usize,
    files: &mut Vec<ScannedFile>,
) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(dir = %dir.display(), error = %err, "could not scan directory");
            return;
        }
    };

    let scoped;
    let matcher = if depth > 0
        && options.nested_ignore_files
        && dir.join(matcher.file_name()).is_file()
    {
        let mut branch = matcher.clone();
        branch.load_dir(dir);
        scoped = branch;
        &scoped
    } else {
        matcher
    };

    let mut dir_entries: Vec<_> = entries
        .filter_map(Result::ok)
        .filter(|entry| {
            let name = entry.file_name();
            options.show_hidden || !name.to_string_lossy().starts_with('.')
        })
        .collect();
    dir_entries.sort_by_key(|entry| entry.file_name().to_string_lossy().to_lowercase());

    for entry in dir_entries {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_symlink() {
            continue;
        }
        let path = entry.path();

        if file_type.is_dir() {
            if matcher.prunes_dir(&path, root) {
                continue;
            }
            if options.max_depth.is_none_or(|max| depth < max) {
                walk(&path, root, options, matcher, depth + 1, files);
            }
            continue;
        }

        if !file_type.is_file()
            || !matches_extension(&path, options.extensions.as_ref())
            || matcher.is_ignored(&path, root, false)
        {
            continue;
        }

        let relative_path = relative_slash_path(&path, root);
        if !options.include_tests && is_test_file(&relative_path) {
            continue;
        }

        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        files.push(ScannedFile {
            category: categorize(&relative_path),
            path,
            relative_path,
            size,
            extension,
        });
    }
}

/// Category priority, then shallower paths first, then path order.
pub fn sort_scanned(files: &mut [ScannedFile]) {
    files.sort_by(|a, b| {
        a.category
            .priority()
            .cmp(&b.category.priority())
            .then_with(|| depth_of(&a.relative_path).cmp(&depth_of(&b.relative_path)))
            .then_with(|| match a.relative_path.cmp(&b.relative_path) {
                Ordering::Equal => a.path.cmp(&b.path),
                other => other,
            })
    });
}

fn depth_of(relative: &str) -> usize {
    relative.split('/').count()
}

/// Aggregate counts over a discovery result.
#[derive(Clone, Debug, Default, Serialize)]
pub struct DiscoveryStatistics {
    pub total_files: usize,
    pub total_size: u64,
    pub by_category: BTreeMap<FileCategory, usize>,
    pub by_extension: BTreeMap<String, usize>,
    pub average_size: f64,
}

pub fn discovery_statistics(files: &[ScannedFile]) -> DiscoveryStatistics {
    let mut stats = DiscoveryStatistics {
        total_files: files.len(),
        ..Default::default()
    };
    for file in files {
        stats.total_size += file.size;
        *stats.by_category.entry(file.category).or_default() += 1;
        *stats.by_extension.entry(file.extension.clone()).or_default() += 1;
    }
    if !files.is_empty() {
        stats.average_size = stats.total_size as f64 / files.len() as f64;
    }
    stats
}
