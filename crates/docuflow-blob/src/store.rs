//! Blob store wrapper over `object_store`.
//!
//! Template and prompt-config JSON blobs live under the templates prefix as
//! `templates/{template_id}/template.json` and `.../prompt_config.json`;
//! generated artifacts go under the documents prefix. JSON reads go through
//! an in-memory cache that is invalidated on upload and delete.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures::TryStreamExt;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as BlobPath;
use object_store::{ObjectStore, PutPayload};
use serde_json::Value;
use tracing::{debug, info};

use docuflow_core::config::BlobConfig;
use docuflow_core::error::{DocuflowError, Result};

/// Blob storage handle shared across the service.
pub struct BlobStore {
    store: Arc<dyn ObjectStore>,
    base_url: String,
    templates_prefix: String,
    documents_prefix: String,
    cache: Mutex<HashMap<String, Value>>,
}

impl BlobStore {
    /// Build a store from config. Supported URLs: `file://<dir>` (created if
    /// absent) and `memory://` (tests, ephemeral).
    pub fn from_config(config: &BlobConfig) -> Result<Self> {
        let (store, base_url): (Arc<dyn ObjectStore>, String) =
            if let Some(dir) = config.url.strip_prefix("file://") {
                std::fs::create_dir_all(dir)?;
                let fs = LocalFileSystem::new_with_prefix(dir).map_err(|e| {
                    DocuflowError::Blob(format!("Failed to open blob directory '{}': {}", dir, e))
                })?;
                (
                    Arc::new(fs) as Arc<dyn ObjectStore>,
                    config.url.trim_end_matches('/').to_string(),
                )
            } else if config.url.starts_with("memory://") {
                (
                    Arc::new(InMemory::new()) as Arc<dyn ObjectStore>,
                    "memory://".to_string(),
                )
            } else {
                return Err(DocuflowError::Config(format!(
                    "Unsupported blob url '{}': expected file:// or memory://",
                    config.url
                )));
            };

        info!(url = %config.url, "Blob store initialized");

        Ok(Self {
            store,
            base_url,
            templates_prefix: config.templates_prefix.clone(),
            documents_prefix: config.documents_prefix.clone(),
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// An ephemeral in-memory store with default prefixes (for testing).
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(InMemory::new()),
            base_url: "memory://".to_string(),
            templates_prefix: "templates".to_string(),
            documents_prefix: "documents".to_string(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Externally addressable location for a blob path.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Blob paths for a template's pair of JSON files.
    pub fn template_blob_paths(&self, template_id: &str) -> (String, String) {
        (
            format!("{}/{}/template.json", self.templates_prefix, template_id),
            format!("{}/{}/prompt_config.json", self.templates_prefix, template_id),
        )
    }

    /// Load a JSON blob, consulting the read cache first.
    pub async fn get_json(&self, path: &str) -> Result<Value> {
        if let Some(cached) = self
            .cache
            .lock()
            .map_err(|e| DocuflowError::Blob(format!("Cache lock poisoned: {}", e)))?
            .get(path)
        {
            debug!(path, "Blob cache hit");
            return Ok(cached.clone());
        }

        let bytes = self.get_bytes(path).await?;
        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|e| DocuflowError::Blob(format!("Blob '{}' is not valid JSON: {}", path, e)))?;

        self.cache
            .lock()
            .map_err(|e| DocuflowError::Blob(format!("Cache lock poisoned: {}", e)))?
            .insert(path.to_string(), value.clone());

        Ok(value)
    }

    /// Write a JSON blob, invalidating any cached copy.
    pub async fn put_json(&self, path: &str, value: &Value) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.put_bytes(path, bytes).await?;
        self.invalidate(path)?;
        Ok(())
    }

    /// Raw blob read.
    pub async fn get_bytes(&self, path: &str) -> Result<Bytes> {
        let blob_path = BlobPath::from(path);
        let result = self
            .store
            .get(&blob_path)
            .await
            .map_err(|e| match e {
                object_store::Error::NotFound { .. } => {
                    DocuflowError::Blob(format!("Blob '{}' not found", path))
                }
                other => DocuflowError::Blob(format!("Failed to read blob '{}': {}", path, other)),
            })?;
        result
            .bytes()
            .await
            .map_err(|e| DocuflowError::Blob(format!("Failed to read blob '{}': {}", path, e)))
    }

    /// Raw blob write.
    pub async fn put_bytes(&self, path: &str, bytes: Vec<u8>) -> Result<()> {
        let blob_path = BlobPath::from(path);
        self.store
            .put(&blob_path, PutPayload::from(Bytes::from(bytes)))
            .await
            .map_err(|e| DocuflowError::Blob(format!("Failed to write blob '{}': {}", path, e)))?;
        Ok(())
    }

    /// Load a template and its prompt configuration together.
    pub async fn load_template_and_prompt(
        &self,
        template_blob_path: &str,
        prompt_blob_path: &str,
    ) -> Result<(Value, Value)> {
        let template = self.get_json(template_blob_path).await?;
        let prompt = self.get_json(prompt_blob_path).await?;
        Ok((template, prompt))
    }

    /// Upload a template's pair of JSON blobs. Returns the blob paths.
    pub async fn upload_template(
        &self,
        template_id: &str,
        template: &Value,
        prompt_config: &Value,
    ) -> Result<(String, String)> {
        let (template_path, prompt_path) = self.template_blob_paths(template_id);
        self.put_json(&template_path, template).await?;
        self.put_json(&prompt_path, prompt_config).await?;
        info!(template_id, "Template blobs uploaded");
        Ok((template_path, prompt_path))
    }

    /// Delete a template's blobs. Missing blobs are ignored.
    pub async fn delete_template(&self, template_id: &str) -> Result<()> {
        let (template_path, prompt_path) = self.template_blob_paths(template_id);
        for path in [template_path, prompt_path] {
            match self.store.delete(&BlobPath::from(path.as_str())).await {
                Ok(()) | Err(object_store::Error::NotFound { .. }) => {}
                Err(e) => {
                    return Err(DocuflowError::Blob(format!(
                        "Failed to delete blob '{}': {}",
                        path, e
                    )))
                }
            }
            self.invalidate(&path)?;
        }
        Ok(())
    }

    /// Template ids present under the templates prefix, sorted.
    pub async fn list_template_ids(&self) -> Result<Vec<String>> {
        let prefix = BlobPath::from(self.templates_prefix.as_str());
        let objects: Vec<_> = self
            .store
            .list(Some(&prefix))
            .try_collect()
            .await
            .map_err(|e| DocuflowError::Blob(format!("Failed to list templates: {}", e)))?;

        let mut ids: Vec<String> = objects
            .iter()
            .filter_map(|meta| {
                let mut parts = meta.location.parts();
                // templates/{id}/file.json
                let _prefix = parts.next()?;
                parts.next().map(|p| p.as_ref().to_string())
            })
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    /// Store a generated document artifact under the documents prefix.
    ///
    /// Returns the artifact's addressable location and byte size.
    pub async fn put_document(&self, filename: &str, bytes: Vec<u8>) -> Result<(String, u64)> {
        let size = bytes.len() as u64;
        let path = format!("{}/{}", self.documents_prefix, filename);
        self.put_bytes(&path, bytes).await?;
        debug!(path, size, "Document artifact stored");
        Ok((self.url_for(&path), size))
    }

    /// Drop all cached JSON blobs.
    pub fn clear_cache(&self) -> Result<()> {
        self.cache
            .lock()
            .map_err(|e| DocuflowError::Blob(format!("Cache lock poisoned: {}", e)))?
            .clear();
        Ok(())
    }

    fn invalidate(&self, path: &str) -> Result<()> {
        self.cache
            .lock()
            .map_err(|e| DocuflowError::Blob(format!("Cache lock poisoned: {}", e)))?
            .remove(path);
        Ok(())
    }
}

impl std::fmt::Debug for BlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobStore")
            .field("base_url", &self.base_url)
            .finish()
    }
}
