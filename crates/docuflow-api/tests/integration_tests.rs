//! Integration tests for the docuflow API.
//!
//! Covers every route: happy paths, error paths, and the full
//! start -> submit -> generate session lifecycle. Each test runs against its
//! own in-memory database, in-memory blob store, and scripted chat client.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use docuflow_api::create_router;
use docuflow_api::handlers::{
    GenerateDocumentResponse, HealthResponse, SessionDocumentsResponse, SessionStateResponse,
    StartSessionResponse, SubmitAnswersResponse, TemplateItem, TemplateListResponse,
};
use docuflow_api::state::AppState;
use docuflow_blob::BlobStore;
use docuflow_core::config::DocuflowConfig;
use docuflow_core::types::TemplateRecord;
use docuflow_llm::{ChatClient, MockChatClient};
use docuflow_storage::{Database, TemplateRepository};

// =============================================================================
// Helpers
// =============================================================================

/// Create a fresh AppState over in-memory stores and the given mock client.
fn make_state(mock: Arc<MockChatClient>) -> AppState {
    AppState::new(
        DocuflowConfig::default(),
        Database::in_memory().unwrap(),
        BlobStore::in_memory(),
        mock as Arc<dyn ChatClient>,
    )
}

/// Seed a template: blob pair plus metadata record.
async fn seed_template(state: &AppState, name: &str) -> TemplateRecord {
    let template_json = json!({
        "title": "EMPLOYMENT AGREEMENT",
        "sections": [{
            "section_title": "PARTIES",
            "content": ["EMPLOYER: [EMPLOYER_NAME]"]
        }]
    });
    let prompt_json = json!({
        "systemPrompt": "You collect employment agreement details.",
        "dataCollection": {
            "questions": [
                {"id": "employer_name", "prompt": "What is the employer's legal name?", "type": "text", "required": true}
            ]
        }
    });

    let blob_id = Uuid::new_v4().to_string();
    let (template_path, prompt_path) = state
        .blob
        .upload_template(&blob_id, &template_json, &prompt_json)
        .await
        .unwrap();

    let record = TemplateRecord::new(
        name,
        Some("test template".to_string()),
        template_path,
        prompt_path,
        "1.0.0",
    );
    TemplateRepository::new(Arc::clone(&state.database))
        .upsert(&record)
        .unwrap();
    record
}

/// Scripted plan-analysis response with a single required question.
fn plan_response() -> String {
    json!({
        "structure_analysis": {
            "type": "flat list",
            "total_questions": 1,
            "has_conditional_logic": false,
            "description": "Employment agreement intake"
        },
        "question_sequence": [{
            "sequence_number": 1,
            "question_id": "employer_name",
            "question_text": "What is the employer's legal name?",
            "input_type": "text",
            "required": true,
            "maps_to_field": "EMPLOYER_NAME"
        }],
        "conditional_questions": [],
        "validation_rules": {"field_validations": {}, "cross_field_validations": []},
        "welcome_message": "Welcome to the employment agreement assistant."
    })
    .to_string()
}

/// Scripted plan with two questions (for suggestion coverage).
fn two_question_plan_response() -> String {
    json!({
        "structure_analysis": {
            "type": "flat list",
            "total_questions": 2,
            "has_conditional_logic": false,
            "description": "Employment agreement intake"
        },
        "question_sequence": [
            {
                "sequence_number": 1,
                "question_id": "employer_name",
                "question_text": "What is the employer's legal name?",
                "input_type": "text",
                "required": true
            },
            {
                "sequence_number": 2,
                "question_id": "work_location",
                "question_text": "Where will the employee work?",
                "input_type": "text",
                "required": true
            }
        ],
        "conditional_questions": [],
        "validation_rules": {"field_validations": {}, "cross_field_validations": []},
        "welcome_message": "Welcome."
    })
    .to_string()
}

fn validation_ok() -> String {
    json!({"is_valid": true, "errors": [], "warnings": []}).to_string()
}

fn validation_failed() -> String {
    json!({
        "is_valid": false,
        "errors": [{"field": "employer_name", "message": "Employer name is required", "severity": "error"}],
        "warnings": []
    })
    .to_string()
}

fn fill_response() -> String {
    json!({
        "title": "EMPLOYMENT AGREEMENT",
        "sections": [{
            "section_title": "PARTIES",
            "content": ["EMPLOYER: Acme Corp"]
        }]
    })
    .to_string()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json<T: serde::de::DeserializeOwned>(resp: axum::response::Response) -> T {
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Drive a session to ready_for_generation. Requires the mock to be loaded
/// with [plan, validation] responses.
async fn start_and_complete_session(app: &axum::Router) -> Uuid {
    let resp = app
        .clone()
        .oneshot(post_json(
            "/sessions/start",
            json!({"template_name": "Employment Agreement"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let started: StartSessionResponse = body_json(resp).await;

    let resp = app
        .clone()
        .oneshot(post_json(
            &format!("/sessions/{}/submit_answers", started.session_id),
            json!({"answers": {"employer_name": "Acme Corp"}}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let submitted: SubmitAnswersResponse = body_json(resp).await;
    assert!(submitted.is_complete);

    started.session_id
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_happy_path() {
    let state = make_state(Arc::new(MockChatClient::new()));
    let app = create_router(state);

    let resp = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let health: HealthResponse = body_json(resp).await;
    assert_eq!(health.status, "healthy");
    assert_eq!(health.templates, 0);
    assert_eq!(health.sessions, 0);
}

#[tokio::test]
async fn test_health_counts_seeded_data() {
    let state = make_state(Arc::new(MockChatClient::new()));
    seed_template(&state, "Employment Agreement").await;
    let app = create_router(state);

    let resp = app.oneshot(get("/health")).await.unwrap();
    let health: HealthResponse = body_json(resp).await;
    assert_eq!(health.templates, 1);
}

// =============================================================================
// Templates
// =============================================================================

#[tokio::test]
async fn test_list_templates_empty() {
    let state = make_state(Arc::new(MockChatClient::new()));
    let app = create_router(state);

    let resp = app.oneshot(get("/templates")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let list: TemplateListResponse = body_json(resp).await;
    assert!(list.templates.is_empty());
}

#[tokio::test]
async fn test_list_templates_includes_uploaded() {
    let state = make_state(Arc::new(MockChatClient::new()));
    seed_template(&state, "Employment Agreement").await;
    seed_template(&state, "NDA").await;
    let app = create_router(state);

    let resp = app.oneshot(get("/templates")).await.unwrap();
    let list: TemplateListResponse = body_json(resp).await;

    assert_eq!(list.templates.len(), 2);
    let names: Vec<&str> = list.templates.iter().map(|t| t.name.as_str()).collect();
    assert!(names.contains(&"Employment Agreement"));
    assert!(names.contains(&"NDA"));
    assert!(list.templates.iter().all(|t| t.is_active));
}

#[tokio::test]
async fn test_get_template_by_id() {
    let state = make_state(Arc::new(MockChatClient::new()));
    let record = seed_template(&state, "Employment Agreement").await;
    let app = create_router(state);

    let resp = app
        .oneshot(get(&format!("/templates/{}", record.id)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let item: TemplateItem = body_json(resp).await;
    assert_eq!(item.id, record.id);
    assert_eq!(item.name, "Employment Agreement");
    assert_eq!(item.version, "1.0.0");
}

#[tokio::test]
async fn test_get_template_not_found() {
    let state = make_state(Arc::new(MockChatClient::new()));
    let app = create_router(state);

    let resp = app
        .oneshot(get(&format!("/templates/{}", Uuid::new_v4())))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_template_malformed_id() {
    let state = make_state(Arc::new(MockChatClient::new()));
    let app = create_router(state);

    let resp = app.oneshot(get("/templates/not-a-uuid")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Session start
// =============================================================================

#[tokio::test]
async fn test_start_session_happy_path() {
    let mock = Arc::new(MockChatClient::with_responses([plan_response()]));
    let state = make_state(Arc::clone(&mock));
    seed_template(&state, "Employment Agreement").await;
    let app = create_router(state);

    let resp = app
        .clone()
        .oneshot(post_json(
            "/sessions/start",
            json!({"template_name": "Employment Agreement"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let started: StartSessionResponse = body_json(resp).await;
    assert_eq!(started.template_name, "Employment Agreement");
    assert_eq!(
        started.welcome_message,
        "Welcome to the employment agreement assistant."
    );
    assert_eq!(started.current_questions.len(), 1);
    assert_eq!(started.current_questions[0].field_id, "employer_name");
    assert_eq!(started.progress.total_steps, 1);
    assert_eq!(started.progress.current_step, 1);

    // One plan-analysis call went to the model.
    assert_eq!(mock.call_count(), 1);

    // The session is retrievable.
    let resp = app
        .oneshot(get(&format!("/sessions/{}", started.session_id)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let session: SessionStateResponse = body_json(resp).await;
    assert_eq!(session.template_name, "Employment Agreement");
    assert!(session.collected_data.is_empty());
}

#[tokio::test]
async fn test_start_session_unknown_template() {
    let mock = Arc::new(MockChatClient::new());
    let state = make_state(Arc::clone(&mock));
    let app = create_router(state);

    let resp = app
        .oneshot(post_json(
            "/sessions/start",
            json!({"template_name": "Missing"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // No model call was made for an unknown template.
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_start_session_missing_blobs() {
    let state = make_state(Arc::new(MockChatClient::new()));
    // Record exists but its blobs were never uploaded.
    let record = TemplateRecord::new(
        "Broken",
        None,
        "templates/broken/template.json",
        "templates/broken/prompt_config.json",
        "1.0.0",
    );
    TemplateRepository::new(Arc::clone(&state.database))
        .upsert(&record)
        .unwrap();
    let app = create_router(state);

    let resp = app
        .oneshot(post_json(
            "/sessions/start",
            json!({"template_name": "Broken"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

// =============================================================================
// Submit answers
// =============================================================================

#[tokio::test]
async fn test_submit_answers_completes_session() {
    let mock = Arc::new(MockChatClient::with_responses([
        plan_response(),
        validation_ok(),
    ]));
    let state = make_state(Arc::clone(&mock));
    seed_template(&state, "Employment Agreement").await;
    let app = create_router(state);

    let resp = app
        .clone()
        .oneshot(post_json(
            "/sessions/start",
            json!({"template_name": "Employment Agreement"}),
        ))
        .await
        .unwrap();
    let started: StartSessionResponse = body_json(resp).await;

    let resp = app
        .clone()
        .oneshot(post_json(
            &format!("/sessions/{}/submit_answers", started.session_id),
            json!({"answers": {"employer_name": "Acme Corp"}}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let submitted: SubmitAnswersResponse = body_json(resp).await;
    assert!(submitted.validation_passed);
    assert!(submitted.errors.is_empty());
    assert!(submitted.is_complete);
    assert!(submitted.next_questions.is_empty());
    assert_eq!(submitted.progress.percent_complete, 100.0);

    // Answers persisted and status advanced.
    let resp = app
        .oneshot(get(&format!("/sessions/{}", started.session_id)))
        .await
        .unwrap();
    let session: SessionStateResponse = body_json(resp).await;
    assert_eq!(session.collected_data["employer_name"], "Acme Corp");
    assert_eq!(session.answered_question_ids, vec!["employer_name"]);
}

#[tokio::test]
async fn test_submit_answers_validation_failure_saves_nothing() {
    let mock = Arc::new(MockChatClient::with_responses([
        plan_response(),
        validation_failed(),
    ]));
    let state = make_state(Arc::clone(&mock));
    seed_template(&state, "Employment Agreement").await;
    let app = create_router(state);

    let resp = app
        .clone()
        .oneshot(post_json(
            "/sessions/start",
            json!({"template_name": "Employment Agreement"}),
        ))
        .await
        .unwrap();
    let started: StartSessionResponse = body_json(resp).await;

    let resp = app
        .clone()
        .oneshot(post_json(
            &format!("/sessions/{}/submit_answers", started.session_id),
            json!({"answers": {"employer_name": ""}}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let submitted: SubmitAnswersResponse = body_json(resp).await;
    assert!(!submitted.validation_passed);
    assert_eq!(submitted.errors.len(), 1);
    assert_eq!(submitted.errors[0].field, "employer_name");
    assert!(!submitted.is_complete);
    assert!(submitted.next_questions.is_empty());

    // The rejected answer was not persisted.
    let resp = app
        .oneshot(get(&format!("/sessions/{}", started.session_id)))
        .await
        .unwrap();
    let session: SessionStateResponse = body_json(resp).await;
    assert!(session.collected_data.is_empty());
    assert!(session.answered_question_ids.is_empty());
}

#[tokio::test]
async fn test_submit_answers_attaches_suggestion() {
    let mock = Arc::new(MockChatClient::with_responses([
        two_question_plan_response(),
        validation_ok(),
        json!({"suggestion": "Toronto, Ontario", "reasoning": "common default", "confidence": 0.8})
            .to_string(),
    ]));
    let state = make_state(Arc::clone(&mock));
    seed_template(&state, "Employment Agreement").await;
    let app = create_router(state);

    let resp = app
        .clone()
        .oneshot(post_json(
            "/sessions/start",
            json!({"template_name": "Employment Agreement"}),
        ))
        .await
        .unwrap();
    let started: StartSessionResponse = body_json(resp).await;

    let resp = app
        .clone()
        .oneshot(post_json(
            &format!("/sessions/{}/submit_answers", started.session_id),
            json!({"answers": {"employer_name": "Acme Corp"}}),
        ))
        .await
        .unwrap();
    let submitted: SubmitAnswersResponse = body_json(resp).await;

    assert!(!submitted.is_complete);
    assert_eq!(submitted.next_questions.len(), 1);
    assert_eq!(submitted.next_questions[0].field_id, "work_location");
    assert_eq!(
        submitted.next_questions[0].suggestion.as_deref(),
        Some("Toronto, Ontario")
    );
}

#[tokio::test]
async fn test_submit_answers_unknown_session() {
    let state = make_state(Arc::new(MockChatClient::new()));
    let app = create_router(state);

    let resp = app
        .oneshot(post_json(
            &format!("/sessions/{}/submit_answers", Uuid::new_v4()),
            json!({"answers": {"a": "b"}}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_submit_answers_to_completed_session() {
    let mock = Arc::new(MockChatClient::with_responses([
        plan_response(),
        validation_ok(),
        fill_response(),
    ]));
    let state = make_state(Arc::clone(&mock));
    seed_template(&state, "Employment Agreement").await;
    let app = create_router(state);

    let session_id = start_and_complete_session(&app).await;

    let resp = app
        .clone()
        .oneshot(post_json(
            &format!("/sessions/{}/generate", session_id),
            json!({"format": "html"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // Session is now completed; further submits are rejected.
    let resp = app
        .oneshot(post_json(
            &format!("/sessions/{}/submit_answers", session_id),
            json!({"answers": {"employer_name": "Other"}}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Session state
// =============================================================================

#[tokio::test]
async fn test_get_session_not_found() {
    let state = make_state(Arc::new(MockChatClient::new()));
    let app = create_router(state);

    let resp = app
        .oneshot(get(&format!("/sessions/{}", Uuid::new_v4())))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Document generation
// =============================================================================

#[tokio::test]
async fn test_generate_full_lifecycle() {
    let mock = Arc::new(MockChatClient::with_responses([
        plan_response(),
        validation_ok(),
        fill_response(),
    ]));
    let state = make_state(Arc::clone(&mock));
    seed_template(&state, "Employment Agreement").await;
    let blob = Arc::clone(&state.blob);
    let app = create_router(state);

    let session_id = start_and_complete_session(&app).await;

    let resp = app
        .clone()
        .oneshot(post_json(
            &format!("/sessions/{}/generate", session_id),
            json!({"format": "html"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let generated: GenerateDocumentResponse = body_json(resp).await;
    assert_eq!(generated.session_id, session_id);
    assert!(generated.blob_url.contains(&session_id.to_string()));
    assert!(generated.blob_url.ends_with(".html"));
    assert!(generated.file_size_bytes > 0);

    // The artifact actually exists in blob storage.
    let path = generated.blob_url.strip_prefix("memory:///").unwrap();
    let bytes = blob.get_bytes(path).await.unwrap();
    let body = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(body.contains("EMPLOYER: Acme Corp"));

    // The document is listed for the session.
    let resp = app
        .clone()
        .oneshot(get(&format!("/sessions/{}/documents", session_id)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let docs: SessionDocumentsResponse = body_json(resp).await;
    assert_eq!(docs.documents.len(), 1);
    assert_eq!(docs.documents[0].document_id, generated.document_id);

    // The session is closed out.
    let resp = app
        .oneshot(get(&format!("/sessions/{}", session_id)))
        .await
        .unwrap();
    let session: SessionStateResponse = body_json(resp).await;
    assert_eq!(
        session.status,
        docuflow_core::types::SessionStatus::Completed
    );
}

#[tokio::test]
async fn test_generate_while_in_progress() {
    let mock = Arc::new(MockChatClient::with_responses([plan_response()]));
    let state = make_state(Arc::clone(&mock));
    seed_template(&state, "Employment Agreement").await;
    let app = create_router(state);

    let resp = app
        .clone()
        .oneshot(post_json(
            "/sessions/start",
            json!({"template_name": "Employment Agreement"}),
        ))
        .await
        .unwrap();
    let started: StartSessionResponse = body_json(resp).await;

    let resp = app
        .oneshot(post_json(
            &format!("/sessions/{}/generate", started.session_id),
            json!({"format": "html"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_generate_rejects_unknown_format() {
    let mock = Arc::new(MockChatClient::with_responses([
        plan_response(),
        validation_ok(),
    ]));
    let state = make_state(Arc::clone(&mock));
    seed_template(&state, "Employment Agreement").await;
    let app = create_router(state);

    let session_id = start_and_complete_session(&app).await;

    let resp = app
        .oneshot(post_json(
            &format!("/sessions/{}/generate", session_id),
            json!({"format": "docx"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_generate_unknown_session() {
    let state = make_state(Arc::new(MockChatClient::new()));
    let app = create_router(state);

    let resp = app
        .oneshot(post_json(
            &format!("/sessions/{}/generate", Uuid::new_v4()),
            json!({"format": "html"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_generate_txt_format() {
    let mock = Arc::new(MockChatClient::with_responses([
        plan_response(),
        validation_ok(),
        fill_response(),
    ]));
    let state = make_state(Arc::clone(&mock));
    seed_template(&state, "Employment Agreement").await;
    let app = create_router(state);

    let session_id = start_and_complete_session(&app).await;

    let resp = app
        .oneshot(post_json(
            &format!("/sessions/{}/generate", session_id),
            json!({"format": "txt"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let generated: GenerateDocumentResponse = body_json(resp).await;
    assert!(generated.blob_url.ends_with(".txt"));
}

// =============================================================================
// Session documents
// =============================================================================

#[tokio::test]
async fn test_documents_unknown_session() {
    let state = make_state(Arc::new(MockChatClient::new()));
    let app = create_router(state);

    let resp = app
        .oneshot(get(&format!("/sessions/{}/documents", Uuid::new_v4())))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_documents_empty_for_fresh_session() {
    let mock = Arc::new(MockChatClient::with_responses([plan_response()]));
    let state = make_state(Arc::clone(&mock));
    seed_template(&state, "Employment Agreement").await;
    let app = create_router(state);

    let resp = app
        .clone()
        .oneshot(post_json(
            "/sessions/start",
            json!({"template_name": "Employment Agreement"}),
        ))
        .await
        .unwrap();
    let started: StartSessionResponse = body_json(resp).await;

    let resp = app
        .oneshot(get(&format!("/sessions/{}/documents", started.session_id)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let docs: SessionDocumentsResponse = body_json(resp).await;
    assert!(docs.documents.is_empty());
}
