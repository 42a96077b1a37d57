//! Application state shared across all route handlers.
//!
//! AppState holds references to all services and shared resources.
//! It is passed to handlers via axum's State extractor.

use std::sync::Arc;
use std::time::Instant;

use docuflow_blob::BlobStore;
use docuflow_core::config::DocuflowConfig;
use docuflow_engine::ConversationFlowEngine;
use docuflow_llm::ChatClient;
use docuflow_render::{DocumentGenerator, TemplateFiller};
use docuflow_storage::Database;

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<DocuflowConfig>,
    /// SQLite database for templates, sessions, and document records.
    pub database: Arc<Database>,
    /// Blob store for template JSON and generated artifacts.
    pub blob: Arc<BlobStore>,
    /// Conversation flow engine.
    pub engine: Arc<ConversationFlowEngine>,
    /// Document generator (fill + render + persist).
    pub generator: Arc<DocumentGenerator>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Create a new AppState over the given components.
    pub fn new(
        config: DocuflowConfig,
        database: Database,
        blob: BlobStore,
        chat_client: Arc<dyn ChatClient>,
    ) -> Self {
        let blob = Arc::new(blob);
        let engine = Arc::new(ConversationFlowEngine::new(
            Arc::clone(&chat_client),
            config.session.questions_per_step,
        ));
        let generator = Arc::new(DocumentGenerator::new(
            TemplateFiller::new(chat_client),
            Arc::clone(&blob),
        ));

        Self {
            config: Arc::new(config),
            database: Arc::new(database),
            blob,
            engine,
            generator,
            start_time: Instant::now(),
        }
    }
}
