//! Database schema migrations.
//!
//! Applies the initial schema: templates, sessions, documents, and the
//! schema_migrations tracking table.

use rusqlite::Connection;
use tracing::info;

use docuflow_core::error::DocuflowError;

/// Run all pending database migrations.
///
/// Currently implements the initial schema (version 1). Future migrations
/// can be added by checking the current version and applying incremental changes.
pub fn run_migrations(conn: &Connection) -> Result<(), DocuflowError> {
    // Create the migrations tracking table first.
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| DocuflowError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| DocuflowError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

/// Version 1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<(), DocuflowError> {
    conn.execute_batch(
        "
        -- Template metadata. Template and prompt-config JSON live in blob
        -- storage; this table only tracks identity and blob paths.
        CREATE TABLE IF NOT EXISTS templates (
            id                  TEXT PRIMARY KEY NOT NULL,
            name                TEXT NOT NULL UNIQUE,
            description         TEXT,
            template_blob_path  TEXT NOT NULL,
            prompt_blob_path    TEXT NOT NULL,
            version             TEXT NOT NULL DEFAULT '1.0.0',
            is_active           INTEGER NOT NULL DEFAULT 1,
            created_at          INTEGER NOT NULL,
            updated_at          INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_templates_active
            ON templates (is_active, name);

        -- Conversation sessions. JSON state columns are serialized as TEXT.
        CREATE TABLE IF NOT EXISTS sessions (
            session_id               TEXT PRIMARY KEY NOT NULL,
            template_name            TEXT NOT NULL,
            execution_plan           TEXT,
            answered_question_ids    TEXT NOT NULL DEFAULT '[]',
            current_sequence_number  INTEGER NOT NULL DEFAULT 0,
            collected_data           TEXT NOT NULL DEFAULT '{}',
            status                   TEXT NOT NULL DEFAULT 'in_progress'
                                     CHECK (status IN ('in_progress', 'ready_for_generation', 'completed')),
            created_at               INTEGER NOT NULL,
            updated_at               INTEGER NOT NULL,
            expires_at               INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_sessions_template
            ON sessions (template_name);

        CREATE INDEX IF NOT EXISTS idx_sessions_status
            ON sessions (status, updated_at DESC);

        -- Generated document artifacts.
        CREATE TABLE IF NOT EXISTS documents (
            document_id      TEXT PRIMARY KEY NOT NULL,
            session_id       TEXT NOT NULL,
            blob_url         TEXT NOT NULL,
            file_format      TEXT NOT NULL
                             CHECK (file_format IN ('html', 'txt')),
            file_size_bytes  INTEGER NOT NULL DEFAULT 0,
            generated_at     INTEGER NOT NULL,
            FOREIGN KEY (session_id) REFERENCES sessions(session_id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_documents_session
            ON documents (session_id, generated_at DESC);

        -- Record migration.
        INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
    )
    .map_err(|e| DocuflowError::Storage(format!("Failed to apply migration v1: {}", e)))?;

    Ok(())
}
