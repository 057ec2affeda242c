//! Gitignore-style pattern matching.
//!
//! Patterns are compiled once into [`IgnorePattern`] values by the pure
//! function [`compile_pattern`]; an [`IgnoreMatcher`] is just an ordered list
//! of them. Evaluation walks the whole list and the last matching pattern
//! decides, so a later `!pattern` re-includes a path an earlier one ignored.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, warn};

/// File name looked up in every directory by [`IgnoreMatcher::load_dir`].
pub const DEFAULT_IGNORE_FILE: &str = ".gitignore";

/// Dependency, build and cache directories skipped in every scan.
///
/// They are loaded before any ignore file, so project ignore files can
/// still re-include something with a negation.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    // JavaScript / TypeScript
    "**/node_modules/**",
    "**/bower_components/**",
    "**/.next/**",
    "**/.nuxt/**",
    // Build outputs
    "**/dist/**",
    "**/build/**",
    "**/out/**",
    "**/.output/**",
    // Rust, Java, Kotlin, Scala
    "**/target/**",
    "**/.gradle/**",
    "**/gradle/**",
    "**/.mvn/**",
    "**/bin/**",
    "**/*.class",
    // C# / .NET
    "**/obj/**",
    "**/packages/**",
    // C / C++
    "**/cmake-build-*/**",
    "**/*.o",
    "**/*.obj",
    "**/*.exe",
    "**/*.out",
    "**/*.so",
    "**/*.dylib",
    "**/*.dll",
    // Go, PHP
    "**/vendor/**",
    // Elixir / Erlang
    "**/_build/**",
    "**/deps/**",
    "**/.elixir_ls/**",
    "**/.fetch/**",
    "**/erl_crash.dump",
    // Python
    "**/__pycache__/**",
    "**/.pytest_cache/**",
    "**/venv/**",
    "**/env/**",
    "**/.venv/**",
    "**/.env/**",
    "**/*.pyc",
    "**/*.pyo",
    "**/*.egg-info/**",
    // Ruby
    "**/.bundle/**",
    // Caches and scratch space
    "**/cache/**",
    "**/.cache/**",
    "**/coverage/**",
    "**/tmp/**",
    "**/temp/**",
    "**/logs/**",
    "**/log/**",
    // Version control
    "**/.git/**",
    "**/.svn/**",
    "**/.hg/**",
    // Editors
    "**/.idea/**",
    "**/.vscode/**",
    "**/.vs/**",
    // Data
    "**/data/**",
];

/// A single compiled ignore rule.
#[derive(Clone, Debug)]
pub struct IgnorePattern {
    /// Pattern text with the `!` prefix and trailing `/` removed.
    pub raw: String,
    pub negation: bool,
    /// Set by a trailing `/`. Informational: matching still runs on the
    /// path string.
    pub directory_only: bool,
    /// Directory whose ignore file contributed this pattern, if any.
    pub origin: Option<PathBuf>,
    /// Human-readable label of where the pattern came from.
    pub source: String,
    matcher: Regex,
}

impl IgnorePattern {
    pub fn is_match(&self, normalized_path: &str) -> bool {
        self.matcher.is_match(normalized_path)
    }

    /// The regular expression this pattern compiled to.
    pub fn as_regex(&self) -> &str {
        self.matcher.as_str()
    }

    /// Whether this pattern could match some path inside `dir`, a
    /// `/`-separated directory relative to the pattern's origin.
    ///
    /// Only rooted patterns can be ruled out: everything else floats to any
    /// depth.
    pub fn may_match_below(&self, dir: &str) -> bool {
        let Some(body) = self.raw.strip_prefix('/') else {
            return true;
        };
        let dir_segments = dir.split('/').filter(|s| !s.is_empty());
        for (pattern_segment, dir_segment) in body.split('/').zip(dir_segments) {
            if pattern_segment.contains("**") {
                return true;
            }
            if !segment_may_match(pattern_segment, dir_segment) {
                return false;
            }
        }
        true
    }
}

fn segment_may_match(pattern_segment: &str, segment: &str) -> bool {
    if !pattern_segment.contains(['*', '?', '[', '\\']) {
        return pattern_segment == segment;
    }
    match Regex::new(&format!("^{}$", translate_glob(pattern_segment))) {
        Ok(re) => re.is_match(segment),
        Err(_) => true,
    }
}

/// Compile one pattern line.
///
/// Returns `None` for blank lines, comments and patterns that reduce to
/// nothing (a bare `!` or `/`).
pub fn compile_pattern(line: &str, source: &str, origin: Option<&Path>) -> Option<IgnorePattern> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let (negation, rest) = match trimmed.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    let (directory_only, rest) = match rest.strip_suffix('/') {
        Some(rest) => (true, rest),
        None => (false, rest),
    };
    if rest.is_empty() || rest == "/" {
        return None;
    }

    let pattern = glob_to_regex(rest);
    let matcher = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(err) => {
            warn!(pattern = rest, %source, error = %err, "skipping ignore pattern that does not compile");
            return None;
        }
    };

    Some(IgnorePattern {
        raw: rest.to_string(),
        negation,
        directory_only,
        origin: origin.map(Path::to_path_buf),
        source: source.to_string(),
        matcher,
    })
}

/// Translate a gitignore glob into an anchored regular expression.
///
/// - no leading `/` or `**`: may match after any `/` (any depth)
/// - leading `/`: anchored to the root only
/// - `**`: zero or more characters including `/`; `/**/` may collapse to `/`
/// - `*`: any run within one segment, `?`: one non-separator character
///
/// Every pattern also matches everything below the path it names.
fn glob_to_regex(pattern: &str) -> String {
    let mut out = String::from("^");
    let body = if let Some(rooted) = pattern.strip_prefix('/') {
        out.push_str("/?");
        rooted
    } else if let Some(rest) = pattern.strip_prefix("**/") {
        out.push_str("(?:.*/)?");
        rest
    } else if let Some(rest) = pattern.strip_prefix("**") {
        out.push_str(".*");
        rest
    } else {
        out.push_str("(?:.*/)?");
        pattern
    };
    out.push_str(&translate_glob(body));
    out.push_str("(?:/|$)");
    out
}

fn translate_glob(glob: &str) -> String {
    let chars: Vec<char> = glob.chars().collect();
    let mut out = String::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                let after_slash = out.ends_with('/');
                if after_slash && chars.get(i) == Some(&'/') {
                    // `a/**/b` must also match `a/b`
                    out.pop();
                    out.push_str("(?:/.*)?/");
                    i += 1;
                } else {
                    out.push_str(".*");
                }
                continue;
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            '[' => {
                if let Some(len) = class_len(&chars[i..]) {
                    out.push('[');
                    let inner = &chars[i + 1..i + len - 1];
                    for (idx, c) in inner.iter().enumerate() {
                        match c {
                            '!' if idx == 0 => out.push('^'),
                            '[' | '\\' => {
                                out.push('\\');
                                out.push(*c);
                            }
                            other => out.push(*other),
                        }
                    }
                    out.push(']');
                    i += len;
                    continue;
                }
                out.push_str("\\[");
            }
            '\\' if i + 1 < chars.len() => {
                out.push_str(&regex::escape(&chars[i + 1].to_string()));
                i += 2;
                continue;
            }
            c => out.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }

    out
}

/// Length of a `[...]` class starting at `chars[0]`, closing bracket included.
fn class_len(chars: &[char]) -> Option<usize> {
    let mut j = 1;
    if chars.get(j) == Some(&'!') {
        j += 1;
    }
    // a `]` right after the opening bracket is a literal member
    if chars.get(j) == Some(&']') {
        j += 1;
    }
    while j < chars.len() {
        if chars[j] == ']' {
            return (j > 1).then_some(j + 1);
        }
        j += 1;
    }
    None
}

/// Convert separators to `/` and make `path` relative to `base` when it
/// lies underneath it.
pub fn normalize_for_match(path: &str, base: Option<&str>) -> String {
    let mut normalized = path.replace('\\', "/");
    if let Some(base) = base.filter(|b| !b.is_empty()) {
        let base = base.replace('\\', "/");
        let base = base.trim_end_matches('/');
        if let Some(stripped) = normalized.strip_prefix(base)
            && (stripped.is_empty() || stripped.starts_with('/'))
        {
            normalized = stripped.trim_start_matches('/').to_string();
        }
    }
    normalized
}

/// `path` relative to `origin` (or to `root` when the pattern has no
/// origin), normalized for matching. `None` when an origin does not
/// contain the path.
fn scoped_path(path: &Path, origin: Option<&Path>, root: &Path, is_dir: bool) -> Option<String> {
    let relative = match origin {
        Some(dir) => path.strip_prefix(dir).ok()?,
        None => path.strip_prefix(root).unwrap_or(path),
    };
    let mut normalized = normalize_for_match(&relative.to_string_lossy(), None);
    if normalized.is_empty() {
        return None;
    }
    if is_dir {
        normalized.push('/');
    }
    Some(normalized)
}

/// Ordered set of ignore rules.
#[derive(Clone, Debug)]
pub struct IgnoreMatcher {
    patterns: Vec<IgnorePattern>,
    file_name: String,
}

impl Default for IgnoreMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl IgnoreMatcher {
    pub fn new() -> Self {
        Self {
            patterns: Vec::new(),
            file_name: DEFAULT_IGNORE_FILE.to_string(),
        }
    }

    /// Matcher preloaded with [`DEFAULT_IGNORE_PATTERNS`].
    pub fn with_defaults() -> Self {
        let mut matcher = Self::new();
        matcher.add_patterns(DEFAULT_IGNORE_PATTERNS.iter().copied(), "defaults");
        matcher
    }

    /// Use a different per-directory ignore file name (e.g. `.codemapignore`).
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Ingest newline-delimited pattern text. Returns how many patterns were added.
    pub fn load(&mut self, content: &str, source: &str, origin: Option<&Path>) -> usize {
        let before = self.patterns.len();
        self.patterns.extend(
            content
                .lines()
                .filter_map(|line| compile_pattern(line, source, origin)),
        );
        self.patterns.len() - before
    }

    /// Append literal patterns, e.g. from configuration.
    pub fn add_patterns<I, S>(&mut self, patterns: I, source: &str) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let before = self.patterns.len();
        for pattern in patterns {
            if let Some(compiled) = compile_pattern(pattern.as_ref(), source, None) {
                self.patterns.push(compiled);
            }
        }
        self.patterns.len() - before
    }

    /// Load one ignore file. Unreadable files are logged and skipped.
    pub fn load_file(&mut self, path: &Path) -> usize {
        match fs::read_to_string(path) {
            Ok(content) => {
                let origin = path.parent().filter(|dir| !dir.as_os_str().is_empty());
                let added = self.load(&content, &path.display().to_string(), origin);
                debug!(path = %path.display(), added, "loaded ignore file");
                added
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => 0,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "could not read ignore file");
                0
            }
        }
    }

    /// Load the ignore file of a single directory, if present.
    pub fn load_dir(&mut self, dir: &Path) -> usize {
        let path = dir.join(&self.file_name);
        self.load_file(&path)
    }

    /// Load ignore files from `start` up to `stop_at` (inclusive) or the
    /// filesystem root.
    ///
    /// Ancestors are loaded first, so rules from deeper directories come
    /// later in evaluation order and win over the ones above them.
    pub fn load_cascading(&mut self, start: &Path, stop_at: Option<&Path>) -> usize {
        let mut chain: Vec<&Path> = Vec::new();
        let mut current = Some(start);
        while let Some(dir) = current {
            chain.push(dir);
            if stop_at.is_some_and(|stop| stop == dir) {
                break;
            }
            current = dir.parent().filter(|parent| !parent.as_os_str().is_empty());
        }

        chain.iter().rev().map(|dir| self.load_dir(dir)).sum()
    }

    /// Decide whether `path` is ignored. `base` is stripped first when the
    /// path starts with it.
    pub fn should_ignore(&self, path: &str, base: Option<&str>) -> bool {
        let normalized = normalize_for_match(path, base);
        self.evaluate(&normalized)
    }

    /// Path-typed check used by discovery.
    ///
    /// Patterns loaded from an ignore file match paths relative to that
    /// file's directory and never apply outside it; patterns without an
    /// origin match relative to `root`. Directories are checked with a
    /// trailing `/` so `dir/**` rules catch the directory itself.
    pub fn is_ignored(&self, path: &Path, root: &Path, is_dir: bool) -> bool {
        self.last_match(path, root, is_dir)
            .is_some_and(|idx| !self.patterns[idx].negation)
    }

    /// Whether discovery may skip everything under the directory `path`.
    ///
    /// True only when the directory is ignored and no negation evaluated
    /// after the deciding rule could re-include something below it.
    pub fn prunes_dir(&self, path: &Path, root: &Path) -> bool {
        let Some(decisive) = self.last_match(path, root, true) else {
            return false;
        };
        if self.patterns[decisive].negation {
            return false;
        }
        !self.patterns[decisive + 1..].iter().any(|pattern| {
            pattern.negation
                && scoped_path(path, pattern.origin.as_deref(), root, true)
                    .is_some_and(|dir| pattern.may_match_below(&dir))
        })
    }

    /// Index of the last pattern matching `path`.
    fn last_match(&self, path: &Path, root: &Path, is_dir: bool) -> Option<usize> {
        if path == root {
            return None;
        }
        // consecutive patterns mostly share an origin
        let mut scope: Option<(Option<&Path>, Option<String>)> = None;
        let mut last = None;
        for (idx, pattern) in self.patterns.iter().enumerate() {
            let origin = pattern.origin.as_deref();
            if scope.as_ref().is_none_or(|(cached, _)| *cached != origin) {
                scope = Some((origin, scoped_path(path, origin, root, is_dir)));
            }
            if let Some((_, Some(candidate))) = &scope
                && pattern.is_match(candidate)
            {
                last = Some(idx);
            }
        }
        last
    }

    fn evaluate(&self, normalized: &str) -> bool {
        let mut ignored = false;
        for pattern in &self.patterns {
            if pattern.is_match(normalized) {
                ignored = !pattern.negation;
            }
        }
        ignored
    }

    pub fn patterns(&self) -> &[IgnorePattern] {
        &self.patterns
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn clear(&mut self) {
        self.patterns.clear();
    }
}
