// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use std::ops::ControlFlow;
use std::time::Duration;

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

use super::{ErrorBody, drain_sse_data, provider_error, send_checked};
use crate::config::{Config, Provider, Settings};
use crate::error::{Error, Result};

const NAME: &str = "gemini";

/// Finish reasons that mean generation ended normally.
const NORMAL_FINISH: [&str; 3] = ["STOP", "MAX_TOKENS", "FINISH_REASON_UNSPECIFIED"];

pub struct GeminiProvider {
    client: Client,
    base_url: String,
    model: String,
    api_key: SecretString,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
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

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    /// Error carried in the body, a block verdict on the prompt, or a
    /// candidate stopped early (e.g. `SAFETY`) without any text.
    fn failure(&self) -> Option<String> {
        if let Some(ref error) = self.error {
            return Some(error.message.clone());
        }
        let Some(candidate) = self.candidates.first() else {
            let reason = self.prompt_feedback.as_ref()?.block_reason.as_ref()?;
            return Some(format!("prompt blocked: {reason}"));
        };
        let reason = candidate.finish_reason.as_deref()?;
        if !NORMAL_FINISH.contains(&reason) && self.text().is_empty() {
            return Some(format!("response stopped: {reason}"));
        }
        None
    }
}

impl GeminiProvider {
    pub fn new(config: &Config, settings: &Settings) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: settings.base_url_for(Provider::Gemini),
            model: settings.model_for(Provider::Gemini).to_string(),
            api_key: SecretString::from(config.effective_api_key().unwrap_or_default()),
        }
    }

    fn request<'a>(system: &'a str, prompt: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: [Part { text: system }],
            },
            contents: [Content {
                role: Some("user"),
                parts: [Part { text: prompt }],
            }],
        }
    }

    fn post(&self, method: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}/models/{}:{method}", self.base_url, self.model))
            .header("x-goog-api-key", self.api_key.expose_secret())
    }

    pub async fn complete(
        &self,
        system: &str,
        prompt: &str,
        cancel: CancellationToken,
    ) -> Result<String> {
        tokio::select! {
            _ = cancel.cancelled() => Err(Error::Cancelled),
            result = self.complete_inner(system, prompt) => result,
        }
    }

    async fn complete_inner(&self, system: &str, prompt: &str) -> Result<String> {
        let request = self
            .post("generateContent")
            .json(&Self::request(system, prompt));
        let response = send_checked(NAME, request).await?;

        let body = response
            .text()
            .await
            .map_err(|e| provider_error(NAME, e.to_string()))?;
        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| provider_error(NAME, format!("malformed response: {e}")))?;

        if let Some(message) = parsed.failure() {
            return Err(provider_error(NAME, message));
        }

        Ok(parsed.text())
    }

    pub async fn stream(
        &self,
        system: &str,
        prompt: &str,
        chunk_tx: mpsc::Sender<String>,
        cancel: CancellationToken,
    ) -> Result<()> {
        let request = self
            .post("streamGenerateContent?alt=sse")
            .json(&Self::request(system, prompt));
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            response = send_checked(NAME, request) => response?,
        };

        let mut stream = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(Error::Cancelled);
                }
                chunk = stream.next() => {
                    let Some(chunk) = chunk else { break };

                    let chunk = chunk.map_err(|e| provider_error(NAME, e.to_string()))?;
                    buffer.extend_from_slice(&chunk);

                    for data in drain_sse_data(NAME, &mut buffer)? {
                        if Self::forward_event(&data, &chunk_tx).await?.is_break() {
                            return Ok(());
                        }
                    }
                }
            }
        }

        // The last event may arrive without a trailing newline
        buffer.push(b'\n');
        for data in drain_sse_data(NAME, &mut buffer)? {
            if Self::forward_event(&data, &chunk_tx).await?.is_break() {
                break;
            }
        }

        Ok(())
    }

    /// Handle one SSE payload. Breaks once the receiver is gone.
    async fn forward_event(data: &str, chunk_tx: &mpsc::Sender<String>) -> Result<ControlFlow<()>> {
        let event: GenerateResponse = serde_json::from_str(data)
            .map_err(|e| provider_error(NAME, format!("malformed stream event: {e}")))?;

        if let Some(message) = event.failure() {
            return Err(provider_error(NAME, message));
        }

        let text = event.text();
        if !text.is_empty() && chunk_tx.send(text).await.is_err() {
            return Ok(ControlFlow::Break(()));
        }

        Ok(ControlFlow::Continue(()))
    }

    pub fn name(&self) -> &str {
        NAME
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}
