//! Gemini `generateContent` extraction backend.

use std::time::Instant;

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use fuelscan_core::defaults::{
    ENV_GEMINI_API_KEY, ENV_GEMINI_BASE_URL, ENV_GEMINI_MODEL, FALLBACK_IMAGE_MIME,
    GEMINI_BASE_URL, GEMINI_MODEL,
};
use fuelscan_core::{Error, ExtractionBackend, ExtractionError, Result};

use crate::prompt::{response_schema, OCR_PROMPT};

/// Gemini-based vision extraction backend.
pub struct GeminiBackend {
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiBackend {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            base_url: GEMINI_BASE_URL.to_string(),
            model,
            api_key,
            client: reqwest::Client::new(),
        }
    }

    /// Point the backend at a different API root (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Create from environment variables.
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `GEMINI_API_KEY` | (required) | API key sent as `x-goog-api-key` |
    /// | `GEMINI_MODEL` | `gemini-2.5-flash` | Model id |
    /// | `GEMINI_BASE_URL` | Google endpoint | API root |
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(ENV_GEMINI_API_KEY)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::Config(format!("{ENV_GEMINI_API_KEY} is not set")))?;
        let model = std::env::var(ENV_GEMINI_MODEL)
            .ok()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| GEMINI_MODEL.to_string());
        let base_url =
            std::env::var(ENV_GEMINI_BASE_URL).unwrap_or_else(|_| GEMINI_BASE_URL.to_string());

        Ok(Self::new(api_key, model).with_base_url(base_url))
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    /// Download the image and return `(mime_type, bytes)`.
    async fn fetch_image(
        &self,
        image_url: &str,
    ) -> std::result::Result<(String, Vec<u8>), ExtractionError> {
        let response = self
            .client
            .get(image_url)
            .send()
            .await
            .map_err(|e| ExtractionError::transport(format!("image fetch failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractionError::Upstream {
                status: Some(status.as_u16()),
                message: "failed to fetch image".to_string(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ExtractionError::transport(format!("image download failed: {e}")))?;
        let mime_type = infer::get(&bytes)
            .map(|kind| kind.mime_type())
            .filter(|mime| mime.starts_with("image/"))
            .unwrap_or(FALLBACK_IMAGE_MIME)
            .to_string();

        Ok((mime_type, bytes.to_vec()))
    }
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: serde_json::Value,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    fn into_text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl ExtractionBackend for GeminiBackend {
    async fn extract(&self, image_url: &str) -> std::result::Result<String, ExtractionError> {
        let start = Instant::now();
        let (mime_type, image) = self.fetch_image(image_url).await?;
        let image_bytes = image.len();

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: OCR_PROMPT.to_string(),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: mime_type.clone(),
                            data: base64::engine::general_purpose::STANDARD.encode(image),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: response_schema(),
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ExtractionError::transport(format!("vision request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                subsystem = "inference",
                component = "gemini",
                op = "generate",
                model = %self.model,
                status = status.as_u16(),
                "Vision API returned non-success status"
            );
            return Err(ExtractionError::Upstream {
                status: Some(status.as_u16()),
                message: body,
            });
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ExtractionError::Parse(format!("invalid generateContent body: {e}")))?;
        let text = body.into_text();

        debug!(
            subsystem = "inference",
            component = "gemini",
            op = "generate",
            model = %self.model,
            mime_type = %mime_type,
            image_bytes,
            response_len = text.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Extraction response received"
        );
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
