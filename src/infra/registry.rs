// ============================================================
// Layer 6 - Pretrained Model Registry
// ============================================================
// Turns a model id into local files, the way `from_pretrained`
// does: an existing directory is used as-is, anything else is
// looked up on the HuggingFace Hub (downloads land in the hub's
// own cache, so a second run works offline).
//
// Files the pipeline asks for:
//   tokenizer.json         required
//   config.json            required
//   tokenizer_config.json  optional (pad / eos token names)
//   model.mpk              optional (weights saved by this tool)
//   model.safetensors      optional (pretrained GPT-2 weights)
//
// Only an HTTP 404 from the hub means "file not shipped"; every
// other failure is reported.
//
// Reference: hf-hub crate documentation (sync API)

use anyhow::{Context, Result};
use hf_hub::api::sync::ApiError;
use std::path::{Path, PathBuf};

use crate::domain::traits::ModelRegistry;

/// Reads model files straight out of a directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalRegistry;

impl ModelRegistry for LocalRegistry {
    fn fetch(&self, model_id: &str, file: &str) -> Result<Option<PathBuf>> {
        let path = Path::new(model_id).join(file);
        Ok(path.is_file().then_some(path))
    }
}

/// Downloads model files from the HuggingFace Hub.
pub struct HubRegistry {
    api: hf_hub::api::sync::Api,
}

impl HubRegistry {
    pub fn new() -> Result<Self> {
        let mut builder = hf_hub::api::sync::ApiBuilder::new();
        if let Ok(token) = std::env::var("HF_TOKEN") {
            if !token.is_empty() {
                builder = builder.with_token(Some(token));
            }
        }
        let api = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to initialise the HuggingFace Hub client: {e}"))?;
        Ok(Self { api })
    }
}

impl ModelRegistry for HubRegistry {
    fn fetch(&self, model_id: &str, file: &str) -> Result<Option<PathBuf>> {
        tracing::debug!("Fetching '{}' from hub model '{}'", file, model_id);
        match self.api.model(model_id.to_string()).get(file) {
            Ok(path) => Ok(Some(path)),
            Err(e) if is_missing_file(&e) => Ok(None),
            Err(e) => Err(anyhow::anyhow!("Cannot fetch '{file}' for '{model_id}': {e}")),
        }
    }
}

fn is_missing_file(err: &ApiError) -> bool {
    match err {
        ApiError::RequestError(e) => status_code(&e.to_string()) == Some(404),
        _ => false,
    }
}

/// HTTP status of a failed request, read from the "{url}: status code {n}"
/// message the hub client produces.
fn status_code(message: &str) -> Option<u16> {
    let (_, rest) = message.rsplit_once("status code ")?;
    rest.split(|c: char| !c.is_ascii_digit()).next()?.parse().ok()
}

/// Registry for `model_id`: local directory if it exists, hub otherwise.
pub fn registry_for(model_id: &str) -> Result<Box<dyn ModelRegistry>> {
    if Path::new(model_id).is_dir() {
        tracing::info!("Using local model directory '{}'", model_id);
        Ok(Box::new(LocalRegistry))
    } else {
        tracing::info!("Resolving '{}' from the HuggingFace Hub", model_id);
        Ok(Box::new(HubRegistry::new()?))
    }
}

/// Like `fetch`, but a missing file is an error.
pub fn fetch_required(registry: &dyn ModelRegistry, model_id: &str, file: &str) -> Result<PathBuf> {
    registry
        .fetch(model_id, file)?
        .with_context(|| format!("Model '{model_id}' has no '{file}'"))
}
