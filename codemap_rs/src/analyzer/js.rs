use super::RawImport;
use super::regexes::{
    regex_dynamic_import, regex_es_import, regex_export_from, regex_require,
    regex_side_effect_import,
};
use crate::types::EdgeKind;

/// Scan TypeScript/JavaScript source for module references.
///
/// Statement forms are collected group by group (static imports, side-effect
/// imports, dynamic imports, `require`, re-exports), each group in source order.
pub(crate) fn scan_js(content: &str) -> Vec<RawImport> {
    let mut imports = Vec::new();

    for caps in regex_es_import().captures_iter(content) {
        imports.push(RawImport::new(&caps[1], EdgeKind::Import));
    }
    for caps in regex_side_effect_import().captures_iter(content) {
        imports.push(RawImport::new(&caps[1], EdgeKind::Import));
    }
    for caps in regex_dynamic_import().captures_iter(content) {
        imports.push(RawImport::new(&caps[1], EdgeKind::DynamicImport));
    }
    for caps in regex_require().captures_iter(content) {
        imports.push(RawImport::new(&caps[1], EdgeKind::Require));
    }
    for caps in regex_export_from().captures_iter(content) {
        imports.push(RawImport::new(&caps[1], EdgeKind::Import));
    }

    imports
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs(imports: &[RawImport]) -> Vec<(&str, EdgeKind)> {
        imports
            .iter()
            .map(|i| (i.specifier.as_str(), i.kind))
            .collect()
    }

    #[test]
    fn collects_every_statement_form() {
        let content = r#"
import { foo } from './utils';
import * as bar from "./helpers";
import React, { useState } from 'react';
import type { Props } from './types';
import './styles.css';
const lazy = await import('./heavy-module');
const express = require('express');
export { a, b } from '../shared';
export * from './barrel';
"#;
        let found = scan_js(content);
        assert_eq!(
            specs(&found),
            vec![
                ("./utils", EdgeKind::Import),
                ("./helpers", EdgeKind::Import),
                ("react", EdgeKind::Import),
                ("./types", EdgeKind::Import),
                ("./styles.css", EdgeKind::Import),
                ("./heavy-module", EdgeKind::DynamicImport),
                ("express", EdgeKind::Require),
                ("../shared", EdgeKind::Import),
                ("./barrel", EdgeKind::Import),
            ]
        );
    }

    #[test]
    fn computed_specifiers_are_missed() {
        let content = "const m = await import(`./locales/${lang}.js`);\nrequire(name);";
        assert!(scan_js(content).is_empty());
    }

    #[test]
    fn multiline_named_imports() {
        let content = "import {\n  a,\n  b,\n} from './multi';\n";
        assert_eq!(specs(&scan_js(content)), vec![("./multi", EdgeKind::Import)]);
    }
}
