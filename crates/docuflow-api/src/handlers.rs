//! Route handler functions for all API endpoints.
//!
//! Each handler extracts path/body parameters via axum extractors,
//! interacts with AppState services, and returns JSON responses.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use docuflow_core::types::{
    DataMap, DocumentFormat, GeneratedDocumentRecord, Progress, Question, SessionRecord,
    SessionStatus, ValidationIssue,
};
use docuflow_storage::{DocumentRepository, SessionRepository, TemplateRepository};

use crate::error::ApiError;
use crate::state::AppState;

/// Welcome text used when a plan does not provide one.
const DEFAULT_WELCOME: &str = "Let's get started with your document.";

// =============================================================================
// Request types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct StartSessionRequest {
    /// Name of the document template to use.
    pub template_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitAnswersRequest {
    /// Map of field_id to answer value.
    pub answers: DataMap,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateDocumentRequest {
    /// Document format: "html" or "txt".
    pub format: String,
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct TemplateItem {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub version: String,
    pub is_active: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TemplateListResponse {
    pub templates: Vec<TemplateItem>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartSessionResponse {
    pub session_id: Uuid,
    pub template_name: String,
    pub welcome_message: String,
    /// First set of questions to display.
    pub current_questions: Vec<Question>,
    pub progress: Progress,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitAnswersResponse {
    pub session_id: Uuid,
    pub validation_passed: bool,
    pub errors: Vec<ValidationIssue>,
    /// Non-blocking issues; present even when validation passes.
    pub warnings: Vec<ValidationIssue>,
    pub next_questions: Vec<Question>,
    pub progress: Progress,
    pub is_complete: bool,
    pub status: SessionStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionStateResponse {
    pub session_id: Uuid,
    pub template_name: String,
    pub status: SessionStatus,
    pub answered_question_ids: Vec<String>,
    pub collected_data: DataMap,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateDocumentResponse {
    pub document_id: Uuid,
    pub session_id: Uuid,
    /// Location of the generated artifact in blob storage.
    pub blob_url: String,
    pub file_format: DocumentFormat,
    pub file_size_bytes: u64,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionDocumentItem {
    pub document_id: Uuid,
    pub blob_url: String,
    pub file_format: DocumentFormat,
    pub file_size_bytes: u64,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionDocumentsResponse {
    pub session_id: Uuid,
    pub documents: Vec<SessionDocumentItem>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub templates: u64,
    pub sessions: u64,
}

// =============================================================================
// Handler functions
// =============================================================================

/// GET /health - service liveness plus basic store counts.
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let templates = TemplateRepository::new(Arc::clone(&state.database)).count_active()?;
    let sessions = SessionRepository::new(Arc::clone(&state.database)).count()?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        templates,
        sessions,
    }))
}

/// GET /templates - list all active document templates.
pub async fn list_templates(
    State(state): State<AppState>,
) -> Result<Json<TemplateListResponse>, ApiError> {
    let repo = TemplateRepository::new(Arc::clone(&state.database));
    let templates = repo
        .list_active()?
        .into_iter()
        .map(|t| TemplateItem {
            id: t.id,
            name: t.name,
            description: t.description,
            version: t.version,
            is_active: t.is_active,
        })
        .collect();

    Ok(Json(TemplateListResponse { templates }))
}

/// GET /templates/{template_id} - details of a specific template.
pub async fn get_template(
    State(state): State<AppState>,
    Path(template_id): Path<Uuid>,
) -> Result<Json<TemplateItem>, ApiError> {
    let repo = TemplateRepository::new(Arc::clone(&state.database));
    let template = repo
        .find_by_id(template_id)?
        .ok_or_else(|| ApiError::NotFound(format!("Template {} not found", template_id)))?;

    Ok(Json(TemplateItem {
        id: template.id,
        name: template.name,
        description: template.description,
        version: template.version,
        is_active: template.is_active,
    }))
}

/// POST /sessions/start - start a new document generation session.
///
/// Loads the template pair from blob storage, has the engine derive the
/// execution plan, persists the session with the cached plan, and returns
/// the first questions.
pub async fn start_session(
    State(state): State<AppState>,
    Json(request): Json<StartSessionRequest>,
) -> Result<Json<StartSessionResponse>, ApiError> {
    let templates = TemplateRepository::new(Arc::clone(&state.database));
    let template = templates.find_active_by_name(&request.template_name)?.ok_or_else(|| {
        ApiError::NotFound(format!(
            "Template '{}' not found or inactive",
            request.template_name
        ))
    })?;

    let (template_json, prompt_config_json) = state
        .blob
        .load_template_and_prompt(&template.template_blob_path, &template.prompt_blob_path)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to load template from blob storage: {}", e)))?;

    let plan = state
        .engine
        .analyze_prompt_config(&prompt_config_json, &template_json)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to analyze prompt configuration: {}", e)))?;

    let first_questions = state.engine.first_questions(&plan);
    let progress = state.engine.progress(&plan, &[], first_questions.first());
    let welcome_message = plan
        .welcome_message
        .clone()
        .unwrap_or_else(|| DEFAULT_WELCOME.to_string());

    let session = SessionRecord::new(
        template.name.clone(),
        plan,
        state.config.session.ttl_hours,
    );
    SessionRepository::new(Arc::clone(&state.database)).create(&session)?;

    tracing::info!(
        session_id = %session.session_id,
        template = %template.name,
        "Session started"
    );

    Ok(Json(StartSessionResponse {
        session_id: session.session_id,
        template_name: template.name,
        welcome_message,
        current_questions: first_questions,
        progress,
        status: session.status,
        created_at: session.created_at,
    }))
}

/// POST /sessions/{session_id}/submit_answers - submit answers to questions.
///
/// Validates the answers against the questions currently on screen; on
/// failure returns the errors without saving anything. On success merges the
/// answers, attaches suggestions to the next questions, and flips the session
/// to ready_for_generation once every required question is answered.
pub async fn submit_answers(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<SubmitAnswersRequest>,
) -> Result<Json<SubmitAnswersResponse>, ApiError> {
    let sessions = SessionRepository::new(Arc::clone(&state.database));
    let mut session = sessions
        .find_by_id(session_id)?
        .ok_or_else(|| ApiError::NotFound(format!("Session {} not found", session_id)))?;

    if session.status == SessionStatus::Completed {
        return Err(ApiError::BadRequest(
            "Session is already completed".to_string(),
        ));
    }

    let plan = session.execution_plan.clone().ok_or_else(|| {
        ApiError::Internal(
            "Session execution plan not found. Please start a new session.".to_string(),
        )
    })?;

    // The questions shown to the user in this step; validation is scoped to
    // exactly these.
    let current_questions = state.engine.next_questions(
        &plan,
        &session.answered_question_ids,
        &session.collected_data,
    );

    let validation = state
        .engine
        .validate_answers(
            &plan,
            &request.answers,
            &session.collected_data,
            &current_questions,
        )
        .await
        .map_err(|e| ApiError::Internal(format!("Validation failed: {}", e)))?;

    if !validation.is_valid {
        // Nothing is saved on a failed validation.
        let progress = state
            .engine
            .progress(&plan, &session.answered_question_ids, None);
        return Ok(Json(SubmitAnswersResponse {
            session_id,
            validation_passed: false,
            errors: validation.errors,
            warnings: validation.warnings,
            next_questions: Vec::new(),
            progress,
            is_complete: false,
            status: session.status,
        }));
    }

    for (field_id, value) in &request.answers {
        session
            .collected_data
            .insert(field_id.clone(), value.clone());
    }
    session
        .answered_question_ids
        .extend(request.answers.keys().cloned());

    let mut next_questions = state.engine.next_questions(
        &plan,
        &session.answered_question_ids,
        &session.collected_data,
    );

    // Suggestions are best-effort and never block the response.
    for question in &mut next_questions {
        if let Some(suggestion) = state
            .engine
            .smart_suggestion(question, &session.collected_data)
            .await
        {
            question.suggestion = Some(suggestion);
        }
    }

    let is_complete = state
        .engine
        .is_complete(&plan, &session.answered_question_ids);
    if is_complete {
        session.status = SessionStatus::ReadyForGeneration;
    }

    let progress = state.engine.progress(
        &plan,
        &session.answered_question_ids,
        next_questions.first(),
    );

    session.updated_at = Utc::now();
    sessions.update(&session)?;

    Ok(Json(SubmitAnswersResponse {
        session_id,
        validation_passed: true,
        errors: Vec::new(),
        warnings: validation.warnings,
        next_questions,
        progress,
        is_complete,
        status: session.status,
    }))
}

/// GET /sessions/{session_id} - current state of a session.
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionStateResponse>, ApiError> {
    let session = SessionRepository::new(Arc::clone(&state.database))
        .find_by_id(session_id)?
        .ok_or_else(|| ApiError::NotFound(format!("Session {} not found", session_id)))?;

    Ok(Json(SessionStateResponse {
        session_id: session.session_id,
        template_name: session.template_name,
        status: session.status,
        answered_question_ids: session.answered_question_ids,
        collected_data: session.collected_data,
        created_at: session.created_at,
        updated_at: session.updated_at,
        expires_at: session.expires_at,
    }))
}

/// POST /sessions/{session_id}/generate - generate the final document.
pub async fn generate_document(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<GenerateDocumentRequest>,
) -> Result<Json<GenerateDocumentResponse>, ApiError> {
    let sessions = SessionRepository::new(Arc::clone(&state.database));
    let mut session = sessions
        .find_by_id(session_id)?
        .ok_or_else(|| ApiError::NotFound(format!("Session {} not found", session_id)))?;

    if session.status == SessionStatus::InProgress {
        return Err(ApiError::BadRequest(
            "Data collection not complete. Continue the conversation first.".to_string(),
        ));
    }

    let format = DocumentFormat::parse(&request.format)
        .ok_or_else(|| ApiError::BadRequest("Format must be 'html' or 'txt'".to_string()))?;

    let templates = TemplateRepository::new(Arc::clone(&state.database));
    let template = templates
        .find_active_by_name(&session.template_name)?
        .ok_or_else(|| {
            ApiError::NotFound(format!("Template '{}' not found", session.template_name))
        })?;

    let template_json = state
        .blob
        .get_json(&template.template_blob_path)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to load template from blob storage: {}", e)))?;

    let artifact = state
        .generator
        .generate(&template_json, &session.collected_data, session_id, format)
        .await
        .map_err(|e| ApiError::Internal(format!("Document generation failed: {}", e)))?;

    let document = GeneratedDocumentRecord::new(
        session_id,
        artifact.blob_url.clone(),
        format,
        artifact.file_size_bytes,
    );
    DocumentRepository::new(Arc::clone(&state.database)).insert(&document)?;

    session.status = SessionStatus::Completed;
    session.updated_at = Utc::now();
    sessions.update(&session)?;

    tracing::info!(
        session_id = %session_id,
        document_id = %document.document_id,
        format = format.as_str(),
        "Document generated"
    );

    Ok(Json(GenerateDocumentResponse {
        document_id: document.document_id,
        session_id,
        blob_url: document.blob_url,
        file_format: format,
        file_size_bytes: document.file_size_bytes,
        generated_at: document.generated_at,
    }))
}

/// GET /sessions/{session_id}/documents - artifacts generated for a session.
pub async fn list_session_documents(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionDocumentsResponse>, ApiError> {
    let sessions = SessionRepository::new(Arc::clone(&state.database));
    if sessions.find_by_id(session_id)?.is_none() {
        return Err(ApiError::NotFound(format!(
            "Session {} not found",
            session_id
        )));
    }

    let documents = DocumentRepository::new(Arc::clone(&state.database))
        .list_by_session(session_id)?
        .into_iter()
        .map(|d| SessionDocumentItem {
            document_id: d.document_id,
            blob_url: d.blob_url,
            file_format: d.file_format,
            file_size_bytes: d.file_size_bytes,
            generated_at: d.generated_at,
        })
        .collect();

    Ok(Json(SessionDocumentsResponse {
        session_id,
        documents,
    }))
}
