//! Note generation through an `edgequake_llm` provider.
//!
//! ## Message layout
//!
//! 1. **System message**: the notes prompt (or the configured override)
//! 2. **User message**: the page text, with the page PNG attached when the
//!    page was rasterised

use super::NoteGenerator;
use crate::config::ScribbleConfig;
use crate::error::{NotesError, ScribbleError};
use crate::output::PageContent;
use crate::pipeline::encode::image_data;
use crate::prompts::notes_prompt;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::debug;

/// Model used for a named provider when none is configured.
pub fn default_model(provider: &str) -> &'static str {
    match provider {
        "openai" => "gpt-4.1-nano",
        "anthropic" => "claude-sonnet-4-20250514",
        "ollama" => "llava",
        _ => crate::config::DEFAULT_MODEL,
    }
}

/// Note generator wrapping any vision-capable `LLMProvider`.
pub struct ProviderNoteGenerator {
    provider: Arc<dyn LLMProvider>,
    prompt: String,
    options: CompletionOptions,
    label: String,
}

impl ProviderNoteGenerator {
    /// Wrap an existing provider.
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>, config: &ScribbleConfig) -> Self {
        Self {
            provider,
            prompt: notes_prompt(config.prompt.as_deref()).to_string(),
            options: build_options(config),
            label: label.into(),
        }
    }

    /// Instantiate a named provider (reads its API key from the environment).
    pub fn from_name(name: &str, model: &str, config: &ScribbleConfig) -> Result<Self, ScribbleError> {
        let provider = ProviderFactory::create_llm_provider(name, model).map_err(|e| {
            ScribbleError::GeneratorNotConfigured {
                backend: name.to_string(),
                hint: format!("{e}"),
            }
        })?;
        Ok(Self::new(provider, format!("{name}/{model}"), config))
    }

    fn messages(&self, page: &PageContent) -> Vec<ChatMessage> {
        let text = page.text.trim();
        let user_text = if text.is_empty() {
            "This page has no text layer; work from the attached image.".to_string()
        } else {
            format!("Page text:\n\"\"\"\n{text}\n\"\"\"")
        };
        let images = page.image.as_deref().map(image_data).into_iter().collect();
        vec![
            ChatMessage::system(&self.prompt),
            ChatMessage::user_with_images(user_text, images),
        ]
    }

    async fn request(&self, page: &PageContent) -> Result<String, NotesError> {
        let messages = self.messages(page);
        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| NotesError::Provider(e.to_string()))?;
        debug!(
            "Page {}: {} input tokens, {} output tokens",
            page.page_num, response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }
}

impl NoteGenerator for ProviderNoteGenerator {
    fn name(&self) -> &str {
        &self.label
    }

    fn generate<'a>(&'a self, page: &'a PageContent) -> BoxFuture<'a, Result<String, NotesError>> {
        Box::pin(self.request(page))
    }
}

/// Build `CompletionOptions` from the configuration.
fn build_options(config: &ScribbleConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}
