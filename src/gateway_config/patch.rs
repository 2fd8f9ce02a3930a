//! Provider injection into an existing gateway document.
//!
//! Loads whatever is on disk (an empty object if missing or unparseable),
//! makes sure `models.providers` and `agents.defaults` exist, and when a
//! provider key is present sets the Google provider and default model.
//! Unrelated keys are preserved. A container that exists with a non-object
//! type (for example an `agents` array) is left as is and its injection is
//! skipped.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::fs;

use super::builtin::provider_api_key;
use super::{process_env, write_atomic, ConfigGenerator, EnvSnapshot, GenerateError};

const GOOGLE_BASE_URL: &str = "https://generativelanguage.googleapis.com";
/// Context and output limits sized for small sandbox containers.
const PATCHED_CONTEXT_WINDOW: u32 = 2048;
const PATCHED_MAX_TOKENS: u32 = 2048;

/// Walk `path` from `root`, creating empty objects along the way.
/// Returns `None` when an existing segment is not an object.
fn ensure_object<'a>(root: &'a mut Map<String, Value>, path: &[&str]) -> Option<&'a mut Map<String, Value>> {
    let mut current = root;
    for key in path {
        let entry = current
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if entry.is_null() {
            *entry = Value::Object(Map::new());
        }
        current = entry.as_object_mut()?;
    }
    Some(current)
}

/// Apply the provider patch to a parsed document.
pub fn patch_document(document: Value, env: &EnvSnapshot, model: &str) -> Value {
    let mut root = match document {
        Value::Object(map) => map,
        other => {
            tracing::warn!(kind = %json_kind(&other), "Gateway config is not an object, starting fresh");
            Map::new()
        }
    };

    let providers_ok = ensure_object(&mut root, &["models", "providers"]).is_some();
    let defaults_ok = ensure_object(&mut root, &["agents", "defaults"]).is_some();

    let Some(api_key) = provider_api_key(env) else {
        tracing::warn!("No provider API key found, skipping provider injection");
        return Value::Object(root);
    };

    if providers_ok {
        if let Some(providers) = ensure_object(&mut root, &["models", "providers"]) {
            providers.insert(
                "google".into(),
                json!({
                    "apiKey": api_key,
                    "baseUrl": GOOGLE_BASE_URL,
                    "api": "google",
                    "models": [{
                        "id": model,
                        "name": model,
                        "contextWindow": PATCHED_CONTEXT_WINDOW,
                        "maxTokens": PATCHED_MAX_TOKENS,
                    }],
                }),
            );
        }
    } else {
        tracing::warn!("'models.providers' is not an object, provider not injected");
    }

    if defaults_ok {
        if let Some(defaults) = ensure_object(&mut root, &["agents", "defaults"]) {
            defaults.insert("model".into(), json!({ "primary": format!("google/{model}") }));
        }
    } else {
        tracing::warn!("'agents.defaults' is not an object, default model not set");
    }

    Value::Object(root)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Load, patch and rewrite the document at `path`.
pub async fn patch_file(path: &Path, env: &EnvSnapshot, model: &str) -> Result<(), GenerateError> {
    let existing = match fs::read_to_string(path).await {
        Ok(content) => match serde_json::from_str::<Value>(&content) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Existing gateway config unparseable, starting fresh");
                Value::Object(Map::new())
            }
        },
        Err(_) => {
            tracing::info!(path = %path.display(), "No existing gateway config, creating new");
            Value::Object(Map::new())
        }
    };

    let patched = patch_document(existing, env, model);
    write_atomic(path, &serde_json::to_vec_pretty(&patched)?).await?;
    tracing::info!(path = %path.display(), "Gateway configuration patched");
    Ok(())
}

/// Runs another generator, then patches its output.
pub struct PatchingGenerator {
    inner: Arc<dyn ConfigGenerator>,
    path: PathBuf,
    model: String,
    env: Option<EnvSnapshot>,
}

impl PatchingGenerator {
    pub fn new(inner: Arc<dyn ConfigGenerator>, path: PathBuf, model: String) -> Self {
        Self {
            inner,
            path,
            model,
            env: None,
        }
    }

    pub fn with_env(mut self, env: EnvSnapshot) -> Self {
        self.env = Some(env);
        self
    }
}

#[async_trait]
impl ConfigGenerator for PatchingGenerator {
    async fn generate(&self) -> Result<(), GenerateError> {
        // The patch still runs when the inner generator fails; the error is reported afterwards.
        let inner_result = self.inner.generate().await;
        if let Err(e) = &inner_result {
            tracing::warn!(generator = self.inner.name(), error = %e, "Generator failed, patching existing config");
        }

        let env = match &self.env {
            Some(env) => env.clone(),
            None => process_env(),
        };
        patch_file(&self.path, &env, &self.model).await?;
        inner_result
    }

    fn name(&self) -> &'static str {
        "patched"
    }
}
