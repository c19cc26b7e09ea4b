//! Regex-based ES/CommonJS import scanner.
//!
//! Deliberately lighter than a real parser: it recognizes the import forms
//! that matter for file-level dependency edges and resolves only relative
//! specifiers. Bare specifiers (`react`, `lodash/merge`) are external
//! packages and never become graph edges.

use std::collections::BTreeSet;
use std::path::Path;

use regex::Regex;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::{ExtractError, ImportExtractor};

/// Extensions the scanner treats as analyzable source.
const SOURCE_EXTENSIONS: [&str; 6] = ["ts", "tsx", "js", "jsx", "mjs", "cjs"];

/// Import scanner for JavaScript/TypeScript trees.
pub struct EsImportScanner {
    patterns: Vec<Regex>,
}

impl Default for EsImportScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl EsImportScanner {
    pub fn new() -> Self {
        // One capture group per pattern: the specifier string.
        let patterns = [
            // import defaultExport from '...'; import { a, b } from '...';
            // import * as ns from '...'; import '...';
            r#"(?m)^\s*import\s+(?:[\w$]+\s*,?\s*)?(?:\*\s+as\s+[\w$]+\s+from\s+|\{[^}]*\}\s*from\s+|[\w$]+\s+from\s+)?["']([^"']+)["']"#,
            // export { a } from '...'; export * from '...';
            r#"(?m)^\s*export\s+(?:\*(?:\s+as\s+[\w$]+)?|\{[^}]*\})\s*from\s+["']([^"']+)["']"#,
            // require('...')
            r#"\brequire\s*\(\s*["']([^"']+)["']\s*\)"#,
            // dynamic import('...')
            r#"\bimport\s*\(\s*["']([^"']+)["']\s*\)"#,
        ]
        .into_iter()
        .map(|p| Regex::new(p).expect("static import pattern"))
        .collect();

        Self { patterns }
    }

    /// Resolve a specifier found in `from` to a repo-relative path, probing
    /// the working tree for extension and index variants. Returns `None`
    /// for bare specifiers and for anything that does not land on a source
    /// file inside the repo.
    fn resolve(&self, repo_root: &Path, from: &str, specifier: &str) -> Option<String> {
        if !specifier.starts_with("./") && !specifier.starts_with("../") {
            return None;
        }

        let dir = from.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
        let joined = if dir.is_empty() {
            specifier.to_string()
        } else {
            format!("{dir}/{specifier}")
        };
        let base = normalize(&joined)?;

        if base.split('/').any(|seg| seg == "node_modules") {
            return None;
        }

        let mut candidates = Vec::new();
        if has_source_extension(&base) {
            candidates.push(base.clone());
        }
        for ext in SOURCE_EXTENSIONS {
            candidates.push(format!("{base}.{ext}"));
        }
        for ext in SOURCE_EXTENSIONS {
            candidates.push(format!("{base}/index.{ext}"));
        }

        candidates
            .into_iter()
            .find(|cand| repo_root.join(cand).is_file())
    }
}

impl ImportExtractor for EsImportScanner {
    fn is_source_file(&self, path: &str) -> bool {
        has_source_extension(path)
            && !path
                .split('/')
                .any(|seg| seg == "node_modules" || seg.starts_with('.'))
    }

    fn extract(&self, repo_root: &Path, file: &str) -> Result<Vec<String>, ExtractError> {
        let source = match std::fs::read_to_string(repo_root.join(file)) {
            Ok(source) => source,
            Err(e) => {
                // Unreadable or non-UTF-8 content never sinks the job; a
                // file we cannot scan simply has no resolvable imports.
                warn!(file, error = %e, "unreadable file, treating as importless");
                return Ok(Vec::new());
            }
        };

        let mut resolved = BTreeSet::new();
        for pattern in &self.patterns {
            for captures in pattern.captures_iter(&source) {
                let specifier = &captures[1];
                match self.resolve(repo_root, file, specifier) {
                    Some(target) if target != file => {
                        resolved.insert(target);
                    }
                    Some(_) => {}
                    None if specifier.starts_with('.') => {
                        // A relative import we could not land on a file:
                        // skip it, keep the rest of the file.
                        debug!(file, specifier, "unresolved relative import, skipping");
                    }
                    None => {}
                }
            }
        }

        Ok(resolved.into_iter().collect())
    }

    fn list_source_files(&self, repo_root: &Path) -> Result<Vec<String>, ExtractError> {
        let mut files = Vec::new();

        let walker = WalkDir::new(repo_root).into_iter().filter_entry(|entry| {
            if entry.depth() == 0 {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            name != "node_modules" && !name.starts_with('.')
        });

        for entry in walker {
            let entry = entry.map_err(|e| ExtractError::Walk(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(repo_root)
                .map_err(|e| ExtractError::Walk(e.to_string()))?;
            let rel = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if self.is_source_file(&rel) {
                files.push(rel);
            }
        }

        files.sort();
        Ok(files)
    }
}

fn has_source_extension(path: &str) -> bool {
    path.rsplit_once('.')
        .is_some_and(|(_, ext)| SOURCE_EXTENSIONS.contains(&ext))
}

/// Collapse `.` and `..` segments. `None` means the path escaped the repo
/// root, which is never a valid edge target.
fn normalize(path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn resolves_static_import_forms() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(root, "src/b.ts", "export const b = 1;");
        write(root, "src/c.ts", "export const c = 1;");
        write(root, "src/d.ts", "export default 1;");
        write(
            root,
            "src/a.ts",
            r#"
import { b } from './b';
import * as c from "./c";
import d from './d';
"#,
        );

        let scanner = EsImportScanner::new();
        let imports = scanner.extract(root, "src/a.ts").unwrap();
        assert_eq!(imports, vec!["src/b.ts", "src/c.ts", "src/d.ts"]);
    }

    #[test]
    fn resolves_reexports_requires_and_dynamic_imports() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(root, "src/b.ts", "");
        write(root, "src/c.cjs", "");
        write(root, "src/d.ts", "");
        write(
            root,
            "src/a.ts",
            r#"
export * from './b';
const c = require('./c');
const d = await import('./d');
"#,
        );

        let scanner = EsImportScanner::new();
        let imports = scanner.extract(root, "src/a.ts").unwrap();
        assert_eq!(imports, vec!["src/b.ts", "src/c.cjs", "src/d.ts"]);
    }

    #[test]
    fn bare_specifiers_are_external() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(
            root,
            "src/a.ts",
            "import React from 'react';\nimport merge from 'lodash/merge';\n",
        );

        let scanner = EsImportScanner::new();
        assert!(scanner.extract(root, "src/a.ts").unwrap().is_empty());
    }

    #[test]
    fn probes_index_files() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(root, "src/utils/index.ts", "");
        write(root, "src/a.ts", "import { x } from './utils';\n");

        let scanner = EsImportScanner::new();
        let imports = scanner.extract(root, "src/a.ts").unwrap();
        assert_eq!(imports, vec!["src/utils/index.ts"]);
    }

    #[test]
    fn parent_traversal_resolves_within_repo() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(root, "lib/shared.ts", "");
        write(root, "src/deep/a.ts", "import { s } from '../../lib/shared';\n");

        let scanner = EsImportScanner::new();
        let imports = scanner.extract(root, "src/deep/a.ts").unwrap();
        assert_eq!(imports, vec!["lib/shared.ts"]);
    }

    #[test]
    fn escaping_the_repo_root_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(root, "a.ts", "import { x } from '../outside';\n");

        let scanner = EsImportScanner::new();
        assert!(scanner.extract(root, "a.ts").unwrap().is_empty());
    }

    #[test]
    fn unresolved_import_does_not_fail_the_file() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(root, "src/b.ts", "");
        write(
            root,
            "src/a.ts",
            "import { gone } from './missing';\nimport { b } from './b';\n",
        );

        let scanner = EsImportScanner::new();
        let imports = scanner.extract(root, "src/a.ts").unwrap();
        assert_eq!(imports, vec!["src/b.ts"]);
    }

    #[test]
    fn listing_skips_node_modules_and_hidden_dirs() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(root, "src/a.ts", "");
        write(root, "src/b.tsx", "");
        write(root, "node_modules/react/index.js", "");
        write(root, ".git/hooks/pre-commit.js", "");
        write(root, "README.md", "");

        let scanner = EsImportScanner::new();
        let files = scanner.list_source_files(root).unwrap();
        assert_eq!(files, vec!["src/a.ts", "src/b.tsx"]);
    }

    #[test]
    fn source_eligibility_matches_the_walk() {
        let scanner = EsImportScanner::new();

        assert!(scanner.is_source_file("src/a.ts"));
        assert!(scanner.is_source_file("deep/nested/b.jsx"));
        assert!(!scanner.is_source_file("logo.png"));
        assert!(!scanner.is_source_file("README.md"));
        assert!(!scanner.is_source_file("node_modules/react/index.js"));
        assert!(!scanner.is_source_file(".github/workflows/ci.js"));
        assert!(!scanner.is_source_file("src/.hidden.ts"));
    }

    #[test]
    fn unreadable_file_yields_no_imports() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        // Valid extension, invalid UTF-8 content.
        fs::write(root.join("blob.ts"), [0xff, 0xfe, 0x00, 0x42]).unwrap();

        let scanner = EsImportScanner::new();
        assert!(scanner.extract(root, "blob.ts").unwrap().is_empty());
    }

    #[test]
    fn missing_file_yields_no_imports() {
        let tmp = TempDir::new().unwrap();

        let scanner = EsImportScanner::new();
        assert!(scanner.extract(tmp.path(), "gone.ts").unwrap().is_empty());
    }

    #[test]
    fn duplicate_imports_collapse() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(root, "src/b.ts", "");
        write(
            root,
            "src/a.ts",
            "import { x } from './b';\nimport { y } from './b';\nconst z = require('./b');\n",
        );

        let scanner = EsImportScanner::new();
        let imports = scanner.extract(root, "src/a.ts").unwrap();
        assert_eq!(imports, vec!["src/b.ts"]);
    }
}
