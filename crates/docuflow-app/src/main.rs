//! docuflow application binary - composition root.
//!
//! Ties together all docuflow crates into a single executable:
//! 1. Load configuration from TOML
//! 2. Initialize storage (SQLite) and blob storage
//! 3. Build the chat client, flow engine, and document generator
//! 4. Start the axum REST API server
//!
//! Also provides the `upload-template` subcommand that registers a template
//! (structure JSON + prompt-config JSON) with blob storage and the database.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use docuflow_api::{routes, AppState};
use docuflow_blob::BlobStore;
use docuflow_core::config::DocuflowConfig;
use docuflow_core::types::TemplateRecord;
use docuflow_llm::AzureChatClient;
use docuflow_storage::{Database, TemplateRepository};

#[derive(Parser)]
#[command(name = "docuflow", version, about = "Conversational legal document generation service")]
struct Cli {
    /// Path to the TOML config file (defaults to DOCUFLOW_CONFIG or ./docuflow.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API server (default).
    Serve,
    /// Upload a template and its prompt configuration.
    UploadTemplate {
        /// Template name (e.g., "Employment Agreement - Canada").
        #[arg(long)]
        name: String,
        /// Template description.
        #[arg(long, default_value = "")]
        description: String,
        /// Path to the template JSON file.
        #[arg(long)]
        template: PathBuf,
        /// Path to the prompt configuration JSON file.
        #[arg(long)]
        prompt: PathBuf,
        /// Template version.
        #[arg(long, default_value = "1.0.0")]
        version: String,
    },
}

/// Resolve the config file path (--config flag, DOCUFLOW_CONFIG env, or
/// ./docuflow.toml).
fn config_path(cli: &Cli) -> PathBuf {
    if let Some(path) = &cli.config {
        return path.clone();
    }
    if let Ok(path) = std::env::var("DOCUFLOW_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("docuflow.toml")
}

/// Database file location: relative paths land inside the data directory.
fn database_path(config: &DocuflowConfig) -> PathBuf {
    let path = Path::new(&config.database.path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        Path::new(&config.server.data_dir).join(path)
    }
}

async fn serve(config: DocuflowConfig) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(&config.server.data_dir)?;

    let db_path = database_path(&config);
    let database = Database::new(&db_path)?;
    tracing::info!(path = %db_path.display(), "SQLite database opened");

    let blob = BlobStore::from_config(&config.blob)?;

    let chat_client = Arc::new(AzureChatClient::from_config(&config.llm)?);
    tracing::info!(deployment = %config.llm.deployment, "Chat completion client ready");

    let state = AppState::new(config, database, blob, chat_client);
    routes::start_server(state).await?;

    Ok(())
}

async fn upload_template(
    config: DocuflowConfig,
    name: String,
    description: String,
    template: PathBuf,
    prompt: PathBuf,
    version: String,
) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(&config.server.data_dir)?;

    // Validate both JSON files before touching any store.
    let template_json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&template)?)
            .map_err(|e| format!("Invalid JSON in '{}': {}", template.display(), e))?;
    let prompt_json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&prompt)?)
        .map_err(|e| format!("Invalid JSON in '{}': {}", prompt.display(), e))?;

    let blob = BlobStore::from_config(&config.blob)?;
    let blob_id = uuid::Uuid::new_v4().to_string();
    let (template_path, prompt_path) = blob
        .upload_template(&blob_id, &template_json, &prompt_json)
        .await?;

    let database = Arc::new(Database::new(&database_path(&config))?);
    let record = TemplateRecord::new(
        &name,
        (!description.is_empty()).then_some(description),
        template_path.clone(),
        prompt_path.clone(),
        version,
    );
    let id = TemplateRepository::new(database).upsert(&record)?;

    tracing::info!(template = %name, id = %id, "Template registered");
    tracing::info!(template_blob = %template_path, prompt_blob = %prompt_path, "Blobs uploaded");
    tracing::info!(
        "Start a session with: POST /sessions/start {{\"template_name\": \"{}\"}}",
        name
    );

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting docuflow v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();

    // Config.
    let config_file = config_path(&cli);
    let config = DocuflowConfig::load_or_default(&config_file);
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::UploadTemplate {
            name,
            description,
            template,
            prompt,
            version,
        } => upload_template(config, name, description, template, prompt, version).await,
    }
}
