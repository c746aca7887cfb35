//! Note generation backends.
//!
//! A [`NoteGenerator`] turns one [`PageContent`] into the raw text of the
//! model's first answer. It makes exactly one attempt: the pipeline adds the
//! timeout and decides what a failure looks like on the page.
//!
//! Two backends ship with the crate:
//!
//! * [`GeminiClient`]: Gemini `generateContent` REST API via `reqwest`
//! * [`ProviderNoteGenerator`]: any `edgequake_llm` provider (OpenAI,
//!   Anthropic, Gemini, Ollama, …)

pub mod gemini;
pub mod provider;

pub use gemini::GeminiClient;
pub use provider::ProviderNoteGenerator;

use crate::config::ScribbleConfig;
use crate::error::{NotesError, ScribbleError};
use crate::output::PageContent;
use edgequake_llm::ProviderFactory;
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::{debug, info};

/// Environment variable holding the Gemini API key.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Produces note text for a page.
pub trait NoteGenerator: Send + Sync {
    /// Short label for logs (e.g. `gemini/gemini-1.5-flash`).
    fn name(&self) -> &str;

    /// Issue one request for `page`.
    fn generate<'a>(&'a self, page: &'a PageContent) -> BoxFuture<'a, Result<String, NotesError>>;
}

/// Resolve the note generator, from most-specific to least-specific.
///
/// 1. **Pre-built generator** (`config.generator`), used as-is.
/// 2. **Named provider** (`config.provider_name`) through `edgequake_llm`.
/// 3. **Gemini REST** when an API key is configured or `GEMINI_API_KEY` is set.
/// 4. **Environment pair** `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`.
/// 5. **Auto-detection** with `ProviderFactory::from_env`.
pub fn resolve_generator(config: &ScribbleConfig) -> Result<Arc<dyn NoteGenerator>, ScribbleError> {
    if let Some(ref generator) = config.generator {
        return Ok(Arc::clone(generator));
    }

    if let Some(ref name) = config.provider_name {
        let model = config
            .model
            .clone()
            .unwrap_or_else(|| provider::default_model(name).to_string());
        let generator = ProviderNoteGenerator::from_name(name, &model, config)?;
        info!("Notes backend: {}", generator.name());
        return Ok(Arc::new(generator));
    }

    if let Some(key) = gemini_api_key(config) {
        let client = GeminiClient::from_config(config, key);
        info!("Notes backend: {}", client.name());
        return Ok(Arc::new(client));
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            let generator = ProviderNoteGenerator::from_name(&prov, &model, config)?;
            info!("Notes backend: {}", generator.name());
            return Ok(Arc::new(generator));
        }
    }

    debug!("No Gemini key or named provider; trying provider auto-detection");
    let (llm, _embedding) = ProviderFactory::from_env().map_err(|e| ScribbleError::GeneratorNotConfigured {
        backend: "auto".to_string(),
        hint: format!(
            "Set {GEMINI_API_KEY_ENV}, or name a provider (e.g. --provider openai) with its API key.\n\
            Error: {e}"
        ),
    })?;
    Ok(Arc::new(ProviderNoteGenerator::new(llm, "auto", config)))
}

/// Configured key first, then the environment. Blank values count as unset.
fn gemini_api_key(config: &ScribbleConfig) -> Option<String> {
    config
        .gemini_api_key
        .clone()
        .or_else(|| std::env::var(GEMINI_API_KEY_ENV).ok())
        .filter(|k| !k.trim().is_empty())
}
