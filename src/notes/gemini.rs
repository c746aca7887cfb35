//! Gemini `generateContent` REST client.
//!
//! One POST per page:
//!
//! ```text
//! POST {endpoint}/models/{model}:generateContent
//! x-goog-api-key: {key}
//! {"contents":[{"parts":[{"text": prompt}, {"inline_data": {"mime_type": "image/png", "data": …}}]}]}
//! ```
//!
//! The answer is `candidates[0].content.parts[0].text`. A non-2xx status
//! becomes [`NotesError::Api`] with the `error.message` Gemini reports.
//! The key travels only in the header, and transport errors are stripped of
//! their URL before they reach logs or error pages.

use super::NoteGenerator;
use crate::config::ScribbleConfig;
use crate::error::NotesError;
use crate::output::PageContent;
use crate::pipeline::encode::{to_base64, PNG_MIME};
use crate::prompts::{notes_prompt, with_page_text};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::debug;

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(alias = "inlineData", skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InlineData {
    #[serde(alias = "mimeType")]
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationConfig {
    pub temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    pub max_output_tokens: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate.
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
    }
}

// ── Client ───────────────────────────────────────────────────────────────

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Note generator backed by the Gemini REST API.
pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    prompt: String,
    generation: GenerationConfig,
    label: String,
}

impl GeminiClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        let model = model.into();
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            label: format!("gemini/{model}"),
            model,
            prompt: prompt.into(),
            generation: GenerationConfig {
                temperature: 0.4,
                max_output_tokens: 1024,
            },
        }
    }

    /// Build from configuration with an already resolved key.
    pub fn from_config(config: &ScribbleConfig, api_key: String) -> Self {
        let mut client = Self::new(
            config.gemini_endpoint.clone(),
            api_key,
            config.model_or_default(),
            notes_prompt(config.prompt.as_deref()),
        );
        client.generation = GenerationConfig {
            temperature: config.temperature,
            max_output_tokens: config.max_tokens,
        };
        client
    }

    /// `{endpoint}/models/{model}:generateContent`, without the key.
    pub fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    /// Request body for `page`: prompt (with page text) and the page bitmap if any.
    pub fn build_request(&self, page: &PageContent) -> GenerateContentRequest {
        let mut parts = vec![Part {
            text: Some(with_page_text(&self.prompt, &page.text)),
            ..Part::default()
        }];
        if let Some(ref png) = page.image {
            parts.push(Part {
                inline_data: Some(InlineData {
                    mime_type: PNG_MIME.to_string(),
                    data: to_base64(png),
                }),
                ..Part::default()
            });
        }
        GenerateContentRequest {
            contents: vec![Content { role: None, parts }],
            generation_config: Some(self.generation.clone()),
        }
    }

    /// Send one request and return the first candidate's text.
    pub async fn request(&self, page: &PageContent) -> Result<String, NotesError> {
        if self.api_key.trim().is_empty() {
            return Err(NotesError::MissingApiKey { backend: "Gemini" });
        }
        let body = self.build_request(page);
        debug!(
            "Page {}: POST {} ({} parts)",
            page.page_num,
            self.url(),
            body.contents[0].parts.len()
        );

        let response = self
            .http
            .post(self.url())
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| NotesError::Http(e.without_url()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| NotesError::Http(e.without_url()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .ok()
                .and_then(|env| env.error)
                .and_then(|err| err.message)
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(NotesError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text)
            .map_err(|e| NotesError::MalformedResponse(format!("invalid JSON: {e}")))?;
        parsed
            .first_text()
            .map(str::to_string)
            .ok_or_else(|| NotesError::MalformedResponse("no candidates[0].content.parts[0].text".into()))
    }
}

impl NoteGenerator for GeminiClient {
    fn name(&self) -> &str {
        &self.label
    }

    fn generate<'a>(&'a self, page: &'a PageContent) -> BoxFuture<'a, Result<String, NotesError>> {
        Box::pin(self.request(page))
    }
}
