use std::sync::OnceLock;

use regex::Regex;

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex literal")
}

pub(crate) fn regex_es_import() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // import x from 'a'; import { a, b } from 'a'; import * as ns from 'a';
        // import x, { y } from 'a'; import type { T } from 'a'
        regex(
            r#"\bimport\s+(?:type\s+)?(?:[A-Za-z0-9_$]+\s*,\s*)?(?:\{[^}]*\}|\*\s+as\s+[A-Za-z0-9_$]+|[A-Za-z0-9_$]+)\s+from\s+["']([^"']+)["']"#,
        )
    })
}

pub(crate) fn regex_side_effect_import() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r#"(?m)^\s*import\s+["']([^"']+)["']"#))
}

pub(crate) fn regex_dynamic_import() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r#"\bimport\s*\(\s*["']([^"']+)["']\s*\)"#))
}

pub(crate) fn regex_require() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r#"\brequire\s*\(\s*["']([^"']+)["']\s*\)"#))
}

pub(crate) fn regex_export_from() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex(
            r#"\bexport\s+(?:type\s+)?(?:\{[^}]*\}|\*(?:\s+as\s+[A-Za-z0-9_$]+)?)\s+from\s+["']([^"']+)["']"#,
        )
    })
}

pub(crate) fn regex_py_import() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // import a.b.c / import a as x, b
    RE.get_or_init(|| regex(r#"(?m)^[ \t]*import[ \t]+([A-Za-z0-9_.][A-Za-z0-9_., \t]*)"#))
}

pub(crate) fn regex_py_from_import() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // from a.b import x / from . import x / from ..pkg.mod import y
    RE.get_or_init(|| regex(r#"(?m)^[ \t]*from[ \t]+(\.*[A-Za-z0-9_.]*)[ \t]+import\b"#))
}

pub(crate) fn regex_rust_use() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r#"(?m)^\s*(?:pub\s*(?:\([^)]*\))?\s+)?use\s+([^;]+);"#))
}

pub(crate) fn regex_rust_mod() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex(r#"(?m)^\s*(?:pub\s*(?:\([^)]*\))?\s+)?mod\s+([A-Za-z_][A-Za-z0-9_]*)\s*;"#)
    })
}

pub(crate) fn regex_java_import() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r#"(?m)^\s*import\s+(?:static\s+)?([A-Za-z0-9_.]+(?:\.\*)?)\s*;"#))
}

pub(crate) fn regex_c_include() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // #include "local.h"  /  #include <system.h>
    RE.get_or_init(|| regex(r#"(?m)^\s*#\s*include\s*(?:"([^"]+)"|<([^>]+)>)"#))
}
