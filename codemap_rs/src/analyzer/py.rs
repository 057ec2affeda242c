use super::RawImport;
use super::regexes::{regex_py_from_import, regex_py_import};
use crate::types::EdgeKind;

/// Scan Python source for `import a.b` and `from a.b import x` statements.
///
/// Relative modules (`from .x import y`) come back as `./`/`../` paths so the
/// shared resolver can place them next to the importing file; absolute module
/// names are returned dotted, as written.
pub(crate) fn scan_py(content: &str) -> Vec<RawImport> {
    let mut imports = Vec::new();

    for caps in regex_py_import().captures_iter(content) {
        for item in caps[1].split(',') {
            let module = item.split_whitespace().next().unwrap_or("");
            if module.is_empty() || module.starts_with('.') {
                continue;
            }
            imports.push(RawImport::new(module, EdgeKind::Import));
        }
    }

    for caps in regex_py_from_import().captures_iter(content) {
        let module = &caps[1];
        if module.is_empty() {
            continue;
        }
        let specifier = if module.starts_with('.') {
            relative_module_path(module)
        } else {
            module.to_string()
        };
        imports.push(RawImport::new(&specifier, EdgeKind::Import));
    }

    imports
}

/// `.x.y` -> `./x/y`, `..pkg` -> `../pkg`, `.` -> `./__init__`.
fn relative_module_path(module: &str) -> String {
    let dots = module.chars().take_while(|c| *c == '.').count();
    let rest = &module[dots..];

    let mut path = if dots == 1 {
        String::from("./")
    } else {
        "../".repeat(dots - 1)
    };
    if rest.is_empty() {
        path.push_str("__init__");
    } else {
        path.push_str(&rest.replace('.', "/"));
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs(content: &str) -> Vec<String> {
        scan_py(content).into_iter().map(|i| i.specifier).collect()
    }

    #[test]
    fn plain_and_aliased_imports() {
        let content = "import os\nimport numpy as np, pandas\nimport a.b.c\n";
        assert_eq!(specs(content), vec!["os", "numpy", "pandas", "a.b.c"]);
    }

    #[test]
    fn from_imports_absolute_and_relative() {
        let content = "\
from typing import List
from .models import User
from ..core.db import session
from . import helpers

def f():
    from .lazy import thing
";
        assert_eq!(
            specs(content),
            vec![
                "typing",
                "./models",
                "../core/db",
                "./__init__",
                "./lazy"
            ]
        );
    }

    #[test]
    fn dynamic_imports_are_not_seen() {
        let content = "mod = importlib.import_module('plugins.' + name)\n";
        assert!(specs(content).is_empty());
    }
}
