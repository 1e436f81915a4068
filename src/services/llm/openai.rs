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

/// Returned when the provider answers without any message content.
pub const EMPTY_RESPONSE: &str = "No response received";

const NAME: &str = "openai";

pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    model: String,
    api_key: SecretString,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    stream: bool,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    delta: Option<Delta>,
}

#[derive(Deserialize)]
struct Delta {
    content: Option<String>,
}

impl OpenAiProvider {
    pub fn new(config: &Config, settings: &Settings) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: settings.base_url_for(Provider::OpenAi),
            model: settings.model_for(Provider::OpenAi).to_string(),
            api_key: SecretString::from(config.effective_api_key().unwrap_or_default()),
        }
    }

    fn request<'a>(&'a self, system: &'a str, prompt: &'a str, stream: bool) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: [
                Message {
                    role: "system",
                    content: system,
                },
                Message {
                    role: "user",
                    content: prompt,
                },
            ],
            stream,
        }
    }

    fn post(&self) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
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
        let response =
            send_checked(NAME, self.post().json(&self.request(system, prompt, false))).await?;

        let body = response
            .text()
            .await
            .map_err(|e| provider_error(NAME, e.to_string()))?;
        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| provider_error(NAME, format!("malformed response: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|c| !c.is_empty());

        Ok(content.unwrap_or_else(|| EMPTY_RESPONSE.to_string()))
    }

    pub async fn stream(
        &self,
        system: &str,
        prompt: &str,
        chunk_tx: mpsc::Sender<String>,
        cancel: CancellationToken,
    ) -> Result<()> {
        let request = self.post().json(&self.request(system, prompt, true));
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

    /// Handle one SSE payload. Breaks on `[DONE]` or once the receiver is gone.
    async fn forward_event(data: &str, chunk_tx: &mpsc::Sender<String>) -> Result<ControlFlow<()>> {
        if data == "[DONE]" {
            return Ok(ControlFlow::Break(()));
        }

        let event: ChatChunk = serde_json::from_str(data)
            .map_err(|e| provider_error(NAME, format!("malformed stream event: {e}")))?;

        if let Some(error) = event.error {
            return Err(provider_error(NAME, error.message));
        }

        for choice in event.choices {
            let Some(content) = choice.delta.and_then(|d| d.content) else {
                continue;
            };
            if !content.is_empty() && chunk_tx.send(content).await.is_err() {
                return Ok(ControlFlow::Break(()));
            }
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
