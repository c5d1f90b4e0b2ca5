use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::stream::ChunkDecoder;
use super::truncate_for_error;
use crate::config::InferenceConfig;
use crate::error::{AssistantError, Result};

/// Final text of one query and whether it arrived over the streaming path.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub text: String,
    pub streamed: bool,
}

pub struct InferenceClient {
    config: InferenceConfig,
    http: reqwest::Client,
}

impl InferenceClient {
    pub fn new(config: InferenceConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| {
                AssistantError::Inference(format!("failed to build inference http client: {}", e))
            })?;

        Ok(Self { config, http })
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Streams the answer, handing each text fragment to `on_chunk`.
    ///
    /// Any failure of the streaming request falls back to a single
    /// non-streaming request with the same prompt and options; fragments
    /// already delivered are not retracted.
    pub async fn generate<F>(&self, prompt: &str, mut on_chunk: F) -> Result<Generation>
    where
        F: FnMut(&str),
    {
        match self.generate_streaming(prompt, &mut on_chunk).await {
            Ok(text) => Ok(Generation {
                text,
                streamed: true,
            }),
            Err(stream_err) => {
                warn!("Streaming request failed, retrying without streaming: {}", stream_err);
                let text = self.generate_blocking(prompt).await?;
                Ok(Generation {
                    text,
                    streamed: false,
                })
            }
        }
    }

    async fn generate_streaming<F>(&self, prompt: &str, on_chunk: &mut F) -> Result<String>
    where
        F: FnMut(&str),
    {
        let mut response = self.send(prompt, true).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::Inference(format!(
                "inference endpoint returned HTTP {}: {}",
                status,
                truncate_for_error(&body)
            )));
        }

        let mut decoder = ChunkDecoder::new();
        let mut text = String::new();
        while let Some(bytes) = response
            .chunk()
            .await
            .map_err(|e| AssistantError::Inference(format!("stream interrupted: {}", e)))?
        {
            for chunk in decoder.push(&bytes)? {
                if !chunk.response.is_empty() {
                    on_chunk(&chunk.response);
                    text.push_str(&chunk.response);
                }
                if chunk.done {
                    debug!("Stream finished ({} chars)", text.len());
                    return Ok(text);
                }
            }
        }

        if let Some(chunk) = decoder.finish()? {
            if !chunk.response.is_empty() {
                on_chunk(&chunk.response);
                text.push_str(&chunk.response);
            }
        }
        debug!("Stream closed without done flag ({} chars)", text.len());
        Ok(text)
    }

    async fn generate_blocking(&self, prompt: &str) -> Result<String> {
        let response = self.send(prompt, false).await?;
        let status = response.status();
        let body = response.text().await.map_err(|e| {
            AssistantError::Inference(format!("failed to read inference response body: {}", e))
        })?;

        if !status.is_success() {
            return Err(AssistantError::Inference(format!(
                "inference endpoint returned HTTP {}: {}",
                status,
                truncate_for_error(&body)
            )));
        }

        let parsed: GenerateResponse = serde_json::from_str(&body).map_err(|e| {
            AssistantError::Inference(format!(
                "invalid JSON from inference endpoint: {} (body={})",
                e,
                truncate_for_error(&body)
            ))
        })?;
        Ok(parsed.response)
    }

    async fn send(&self, prompt: &str, stream: bool) -> Result<reqwest::Response> {
        let payload = GenerateRequest {
            model: &self.config.model,
            prompt,
            stream,
            options: GenerateOptions {
                temperature: self.config.temperature,
                top_p: self.config.top_p,
                num_predict: self.config.num_predict,
            },
        };

        debug!(
            "POST {} (model={}, stream={})",
            self.config.endpoint, self.config.model, stream
        );
        self.http
            .post(&self.config.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AssistantError::Inference(format!(
                        "inference request timed out after {:?} (model={})",
                        self.config.timeout(),
                        self.config.model
                    ))
                } else {
                    AssistantError::Inference(format!(
                        "inference request failed (endpoint={}, model={}): {}",
                        self.config.endpoint, self.config.model, e
                    ))
                }
            })
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    top_p: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}
