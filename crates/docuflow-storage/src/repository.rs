//! Repository implementations for SQLite-backed persistence.
//!
//! Provides TemplateRepository, SessionRepository, and DocumentRepository
//! that operate on the Database struct using raw SQL.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{OptionalExtension, Row};
use uuid::Uuid;

use docuflow_core::error::DocuflowError;
use docuflow_core::types::{
    DocumentFormat, ExecutionPlan, GeneratedDocumentRecord, SessionRecord, SessionStatus,
    TemplateRecord,
};

use crate::db::Database;

fn epoch_to_datetime(epoch: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(epoch, 0).single().unwrap_or_default()
}

fn parse_uuid(s: &str) -> Result<Uuid, DocuflowError> {
    Uuid::parse_str(s).map_err(|e| DocuflowError::Storage(format!("Invalid UUID '{}': {}", s, e)))
}

/// Repository for template metadata.
pub struct TemplateRepository {
    db: Arc<Database>,
}

impl TemplateRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a template, or update the existing record with the same name.
    ///
    /// Re-uploading a template refreshes its description, blob paths, and
    /// version, and re-activates it. Returns the effective record id (the
    /// existing id when the name was already present).
    pub fn upsert(&self, template: &TemplateRecord) -> Result<Uuid, DocuflowError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO templates
                    (id, name, description, template_blob_path, prompt_blob_path, version, is_active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(name) DO UPDATE SET
                    description = excluded.description,
                    template_blob_path = excluded.template_blob_path,
                    prompt_blob_path = excluded.prompt_blob_path,
                    version = excluded.version,
                    is_active = 1,
                    updated_at = excluded.updated_at",
                rusqlite::params![
                    template.id.to_string(),
                    template.name,
                    template.description,
                    template.template_blob_path,
                    template.prompt_blob_path,
                    template.version,
                    template.is_active as i32,
                    template.created_at.timestamp(),
                    template.updated_at.timestamp(),
                ],
            )
            .map_err(|e| DocuflowError::Storage(format!("Failed to upsert template: {}", e)))?;

            let id: String = conn
                .query_row(
                    "SELECT id FROM templates WHERE name = ?1",
                    rusqlite::params![template.name],
                    |row| row.get(0),
                )
                .map_err(|e| DocuflowError::Storage(e.to_string()))?;
            parse_uuid(&id)
        })
    }

    /// Find a template by id.
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<TemplateRecord>, DocuflowError> {
        self.db.with_conn(|conn| {
            let result = conn
                .query_row(
                    "SELECT id, name, description, template_blob_path, prompt_blob_path, version, is_active, created_at, updated_at
                     FROM templates WHERE id = ?1",
                    rusqlite::params![id.to_string()],
                    |row| Ok(row_to_template(row)),
                )
                .optional()
                .map_err(|e| DocuflowError::Storage(e.to_string()))?;

            match result {
                Some(template) => Ok(Some(template?)),
                None => Ok(None),
            }
        })
    }

    /// Find an active template by its unique name.
    pub fn find_active_by_name(&self, name: &str) -> Result<Option<TemplateRecord>, DocuflowError> {
        self.db.with_conn(|conn| {
            let result = conn
                .query_row(
                    "SELECT id, name, description, template_blob_path, prompt_blob_path, version, is_active, created_at, updated_at
                     FROM templates WHERE name = ?1 AND is_active = 1",
                    rusqlite::params![name],
                    |row| Ok(row_to_template(row)),
                )
                .optional()
                .map_err(|e| DocuflowError::Storage(e.to_string()))?;

            match result {
                Some(template) => Ok(Some(template?)),
                None => Ok(None),
            }
        })
    }

    /// List all active templates, ordered by name.
    pub fn list_active(&self) -> Result<Vec<TemplateRecord>, DocuflowError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, name, description, template_blob_path, prompt_blob_path, version, is_active, created_at, updated_at
                     FROM templates WHERE is_active = 1
                     ORDER BY name ASC",
                )
                .map_err(|e| DocuflowError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map([], |row| Ok(row_to_template(row)))
                .map_err(|e| DocuflowError::Storage(e.to_string()))?;

            let mut templates = Vec::new();
            for row in rows {
                let template = row.map_err(|e| DocuflowError::Storage(e.to_string()))??;
                templates.push(template);
            }
            Ok(templates)
        })
    }

    /// Count active templates.
    pub fn count_active(&self) -> Result<u64, DocuflowError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM templates WHERE is_active = 1",
                    [],
                    |row| row.get(0),
                )
                .map_err(|e| DocuflowError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }
}

/// Repository for conversation sessions.
pub struct SessionRepository {
    db: Arc<Database>,
}

impl SessionRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Store a new session.
    pub fn create(&self, session: &SessionRecord) -> Result<(), DocuflowError> {
        let plan_json = session
            .execution_plan
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let answered_json = serde_json::to_string(&session.answered_question_ids)?;
        let collected_json = serde_json::to_string(&session.collected_data)?;

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions
                    (session_id, template_name, execution_plan, answered_question_ids,
                     current_sequence_number, collected_data, status, created_at, updated_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                rusqlite::params![
                    session.session_id.to_string(),
                    session.template_name,
                    plan_json,
                    answered_json,
                    session.current_sequence_number,
                    collected_json,
                    session.status.as_str(),
                    session.created_at.timestamp(),
                    session.updated_at.timestamp(),
                    session.expires_at.timestamp(),
                ],
            )
            .map_err(|e| DocuflowError::Storage(format!("Failed to create session: {}", e)))?;
            Ok(())
        })
    }

    /// Find a session by id.
    pub fn find_by_id(&self, session_id: Uuid) -> Result<Option<SessionRecord>, DocuflowError> {
        self.db.with_conn(|conn| {
            let result = conn
                .query_row(
                    "SELECT session_id, template_name, execution_plan, answered_question_ids,
                            current_sequence_number, collected_data, status, created_at, updated_at, expires_at
                     FROM sessions WHERE session_id = ?1",
                    rusqlite::params![session_id.to_string()],
                    |row| Ok(row_to_session(row)),
                )
                .optional()
                .map_err(|e| DocuflowError::Storage(e.to_string()))?;

            match result {
                Some(session) => Ok(Some(session?)),
                None => Ok(None),
            }
        })
    }

    /// Persist the mutable state of a session (answers, plan, status).
    pub fn update(&self, session: &SessionRecord) -> Result<(), DocuflowError> {
        let plan_json = session
            .execution_plan
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let answered_json = serde_json::to_string(&session.answered_question_ids)?;
        let collected_json = serde_json::to_string(&session.collected_data)?;

        self.db.with_conn(|conn| {
            let changed = conn
                .execute(
                    "UPDATE sessions SET
                        execution_plan = ?2,
                        answered_question_ids = ?3,
                        current_sequence_number = ?4,
                        collected_data = ?5,
                        status = ?6,
                        updated_at = ?7
                     WHERE session_id = ?1",
                    rusqlite::params![
                        session.session_id.to_string(),
                        plan_json,
                        answered_json,
                        session.current_sequence_number,
                        collected_json,
                        session.status.as_str(),
                        session.updated_at.timestamp(),
                    ],
                )
                .map_err(|e| DocuflowError::Storage(format!("Failed to update session: {}", e)))?;

            if changed == 0 {
                return Err(DocuflowError::Session(format!(
                    "Session {} not found",
                    session.session_id
                )));
            }
            Ok(())
        })
    }

    /// Count all sessions.
    pub fn count(&self) -> Result<u64, DocuflowError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))
                .map_err(|e| DocuflowError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }
}

/// Repository for generated-document records.
pub struct DocumentRepository {
    db: Arc<Database>,
}

impl DocumentRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Record a generated document.
    pub fn insert(&self, document: &GeneratedDocumentRecord) -> Result<(), DocuflowError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO documents
                    (document_id, session_id, blob_url, file_format, file_size_bytes, generated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    document.document_id.to_string(),
                    document.session_id.to_string(),
                    document.blob_url,
                    document.file_format.as_str(),
                    document.file_size_bytes as i64,
                    document.generated_at.timestamp(),
                ],
            )
            .map_err(|e| DocuflowError::Storage(format!("Failed to insert document: {}", e)))?;
            Ok(())
        })
    }

    /// List documents generated for a session, newest first.
    pub fn list_by_session(
        &self,
        session_id: Uuid,
    ) -> Result<Vec<GeneratedDocumentRecord>, DocuflowError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT document_id, session_id, blob_url, file_format, file_size_bytes, generated_at
                     FROM documents
                     WHERE session_id = ?1
                     ORDER BY generated_at DESC",
                )
                .map_err(|e| DocuflowError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![session_id.to_string()], |row| {
                    Ok(row_to_document(row))
                })
                .map_err(|e| DocuflowError::Storage(e.to_string()))?;

            let mut documents = Vec::new();
            for row in rows {
                let document = row.map_err(|e| DocuflowError::Storage(e.to_string()))??;
                documents.push(document);
            }
            Ok(documents)
        })
    }
}

// =============================================================================
// Row mappers
// =============================================================================

fn row_to_template(row: &Row<'_>) -> Result<TemplateRecord, DocuflowError> {
    let id: String = row
        .get(0)
        .map_err(|e| DocuflowError::Storage(e.to_string()))?;
    let created_at: i64 = row
        .get(7)
        .map_err(|e| DocuflowError::Storage(e.to_string()))?;
    let updated_at: i64 = row
        .get(8)
        .map_err(|e| DocuflowError::Storage(e.to_string()))?;

    Ok(TemplateRecord {
        id: parse_uuid(&id)?,
        name: row
            .get(1)
            .map_err(|e| DocuflowError::Storage(e.to_string()))?,
        description: row
            .get(2)
            .map_err(|e| DocuflowError::Storage(e.to_string()))?,
        template_blob_path: row
            .get(3)
            .map_err(|e| DocuflowError::Storage(e.to_string()))?,
        prompt_blob_path: row
            .get(4)
            .map_err(|e| DocuflowError::Storage(e.to_string()))?,
        version: row
            .get(5)
            .map_err(|e| DocuflowError::Storage(e.to_string()))?,
        is_active: row
            .get::<_, i64>(6)
            .map_err(|e| DocuflowError::Storage(e.to_string()))?
            != 0,
        created_at: epoch_to_datetime(created_at),
        updated_at: epoch_to_datetime(updated_at),
    })
}

fn row_to_session(row: &Row<'_>) -> Result<SessionRecord, DocuflowError> {
    let session_id: String = row
        .get(0)
        .map_err(|e| DocuflowError::Storage(e.to_string()))?;
    let plan_json: Option<String> = row
        .get(2)
        .map_err(|e| DocuflowError::Storage(e.to_string()))?;
    let answered_json: String = row
        .get(3)
        .map_err(|e| DocuflowError::Storage(e.to_string()))?;
    let collected_json: String = row
        .get(5)
        .map_err(|e| DocuflowError::Storage(e.to_string()))?;
    let status: String = row
        .get(6)
        .map_err(|e| DocuflowError::Storage(e.to_string()))?;
    let created_at: i64 = row
        .get(7)
        .map_err(|e| DocuflowError::Storage(e.to_string()))?;
    let updated_at: i64 = row
        .get(8)
        .map_err(|e| DocuflowError::Storage(e.to_string()))?;
    let expires_at: i64 = row
        .get(9)
        .map_err(|e| DocuflowError::Storage(e.to_string()))?;

    let execution_plan: Option<ExecutionPlan> = plan_json
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(|e| DocuflowError::Storage(format!("Corrupt execution plan: {}", e)))?;

    Ok(SessionRecord {
        session_id: parse_uuid(&session_id)?,
        template_name: row
            .get(1)
            .map_err(|e| DocuflowError::Storage(e.to_string()))?,
        execution_plan,
        answered_question_ids: serde_json::from_str(&answered_json)
            .map_err(|e| DocuflowError::Storage(format!("Corrupt answered ids: {}", e)))?,
        current_sequence_number: row
            .get(4)
            .map_err(|e| DocuflowError::Storage(e.to_string()))?,
        collected_data: serde_json::from_str(&collected_json)
            .map_err(|e| DocuflowError::Storage(format!("Corrupt collected data: {}", e)))?,
        status: SessionStatus::parse(&status)
            .ok_or_else(|| DocuflowError::Storage(format!("Unknown session status '{}'", status)))?,
        created_at: epoch_to_datetime(created_at),
        updated_at: epoch_to_datetime(updated_at),
        expires_at: epoch_to_datetime(expires_at),
    })
}

fn row_to_document(row: &Row<'_>) -> Result<GeneratedDocumentRecord, DocuflowError> {
    let document_id: String = row
        .get(0)
        .map_err(|e| DocuflowError::Storage(e.to_string()))?;
    let session_id: String = row
        .get(1)
        .map_err(|e| DocuflowError::Storage(e.to_string()))?;
    let format: String = row
        .get(3)
        .map_err(|e| DocuflowError::Storage(e.to_string()))?;
    let generated_at: i64 = row
        .get(5)
        .map_err(|e| DocuflowError::Storage(e.to_string()))?;

    Ok(GeneratedDocumentRecord {
        document_id: parse_uuid(&document_id)?,
        session_id: parse_uuid(&session_id)?,
        blob_url: row
            .get(2)
            .map_err(|e| DocuflowError::Storage(e.to_string()))?,
        file_format: DocumentFormat::parse(&format)
            .ok_or_else(|| DocuflowError::Storage(format!("Unknown file format '{}'", format)))?,
        file_size_bytes: row
            .get::<_, i64>(4)
            .map_err(|e| DocuflowError::Storage(e.to_string()))? as u64,
        generated_at: epoch_to_datetime(generated_at),
    })
}
