//! Schema and constraint management.

use dora_graph::Result;

use super::{classify, SurrealGraphStore};

/// The `file` table: one record per tracked source file.
const FILE_SCHEMA: &str = r#"
    DEFINE TABLE IF NOT EXISTS file SCHEMAFULL;
    DEFINE FIELD IF NOT EXISTS path ON file TYPE string;
    DEFINE FIELD IF NOT EXISTS repo ON file TYPE string;
    DEFINE FIELD IF NOT EXISTS name ON file TYPE string;
"#;

/// The `repository` table: analysis bookkeeping.
const REPOSITORY_SCHEMA: &str = r#"
    DEFINE TABLE IF NOT EXISTS repository SCHEMAFULL;
    DEFINE FIELD IF NOT EXISTS name ON repository TYPE string;
    DEFINE FIELD IF NOT EXISTS last_analyzed_sha ON repository TYPE option<string>;
"#;

/// The `imports` relation between files.
const IMPORTS_SCHEMA: &str = r#"
    DEFINE TABLE IF NOT EXISTS imports TYPE RELATION FROM file TO file;
"#;

/// Early deployments constrained files on `path` alone, which breaks the
/// moment two repositories share a layout. The legacy index is dropped
/// before the composite one is defined; this is the only schema migration
/// the store performs.
const LEGACY_MIGRATION: &str = r#"
    REMOVE INDEX IF EXISTS idx_file_path ON file;
"#;

/// Uniqueness constraints: file identity on `(path, repo)`, repository on
/// `name`, at most one `imports` edge per ordered endpoint pair.
const CONSTRAINTS: &str = r#"
    DEFINE INDEX IF NOT EXISTS idx_file_repo ON file FIELDS repo;
    DEFINE INDEX IF NOT EXISTS idx_file_identity ON file FIELDS path, repo UNIQUE;
    DEFINE INDEX IF NOT EXISTS idx_repository_name ON repository FIELDS name UNIQUE;
    DEFINE INDEX IF NOT EXISTS idx_imports_endpoints ON imports FIELDS in, out UNIQUE;
"#;

impl SurrealGraphStore {
    /// Tables first, then the legacy-index drop, then the live constraint
    /// set. Each step is individually repeatable, so startup can run this
    /// on every boot.
    pub(super) async fn define_schema(&self) -> Result<()> {
        for statements in [
            FILE_SCHEMA,
            REPOSITORY_SCHEMA,
            IMPORTS_SCHEMA,
            LEGACY_MIGRATION,
            CONSTRAINTS,
        ] {
            self.db()
                .query(statements)
                .await
                .map_err(classify)?
                .check()
                .map_err(classify)?;
        }
        Ok(())
    }
}
