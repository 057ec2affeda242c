use super::RawImport;
use super::regexes::regex_java_import;
use crate::types::EdgeKind;

/// Scan Java source for `import [static] a.b.Class;` statements.
pub(crate) fn scan_java(content: &str) -> Vec<RawImport> {
    regex_java_import()
        .captures_iter(content)
        .map(|caps| RawImport::new(&caps[1], EdgeKind::Import))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_static_and_wildcard_imports() {
        let content = "\
package com.acme.app;

import java.util.List;
import static org.junit.Assert.assertEquals;
import com.acme.core.*;
";
        let found: Vec<_> = scan_java(content).into_iter().map(|i| i.specifier).collect();
        assert_eq!(
            found,
            vec![
                "java.util.List",
                "org.junit.Assert.assertEquals",
                "com.acme.core.*"
            ]
        );
    }
}
