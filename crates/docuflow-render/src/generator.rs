//! Document generation: fill, render, persist.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use docuflow_blob::BlobStore;
use docuflow_core::error::Result;
use docuflow_core::types::{DataMap, DocumentFormat};

use crate::fill::TemplateFiller;
use crate::html::{render_html, render_text};

/// A persisted document artifact.
#[derive(Clone, Debug)]
pub struct GeneratedArtifact {
    /// Addressable location in blob storage.
    pub blob_url: String,
    pub file_size_bytes: u64,
}

/// Generates document artifacts from templates and collected session data.
pub struct DocumentGenerator {
    filler: TemplateFiller,
    blob: Arc<BlobStore>,
}

impl DocumentGenerator {
    pub fn new(filler: TemplateFiller, blob: Arc<BlobStore>) -> Self {
        Self { filler, blob }
    }

    /// Fill the template, render it in the requested format, and persist the
    /// artifact as `{session_id}_{timestamp}.{ext}` under the documents
    /// prefix.
    pub async fn generate(
        &self,
        template: &Value,
        collected_data: &DataMap,
        session_id: Uuid,
        format: DocumentFormat,
    ) -> Result<GeneratedArtifact> {
        let filled = self.filler.fill(template, collected_data).await?;

        let rendered = match format {
            DocumentFormat::Html => render_html(&filled),
            DocumentFormat::Txt => render_text(&filled),
        };

        let filename = format!(
            "{}_{}.{}",
            session_id,
            Utc::now().format("%Y%m%d_%H%M%S"),
            format.extension()
        );
        let (blob_url, file_size_bytes) = self.blob.put_document(&filename, rendered.into_bytes()).await?;

        info!(
            session_id = %session_id,
            format = format.as_str(),
            size = file_size_bytes,
            "Document generated"
        );

        Ok(GeneratedArtifact {
            blob_url,
            file_size_bytes,
        })
    }
}
