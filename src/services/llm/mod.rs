// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use reqwest::{RequestBuilder, Response};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub mod gemini;
pub mod openai;

use crate::config::{Config, Provider, Settings};
use crate::error::{Error, Result};

/// Hosted model backend, one variant per supported provider.
pub enum LlmProvider {
    OpenAi(openai::OpenAiProvider),
    Gemini(gemini::GeminiProvider),
}

impl LlmProvider {
    /// Wait for the whole response and return its text.
    pub async fn complete(
        &self,
        system: &str,
        prompt: &str,
        cancel: CancellationToken,
    ) -> Result<String> {
        match self {
            Self::OpenAi(p) => p.complete(system, prompt, cancel).await,
            Self::Gemini(p) => p.complete(system, prompt, cancel).await,
        }
    }

    /// Forward each non-empty text fragment to `chunk_tx` as it arrives.
    pub async fn stream(
        &self,
        system: &str,
        prompt: &str,
        chunk_tx: mpsc::Sender<String>,
        cancel: CancellationToken,
    ) -> Result<()> {
        match self {
            Self::OpenAi(p) => p.stream(system, prompt, chunk_tx, cancel).await,
            Self::Gemini(p) => p.stream(system, prompt, chunk_tx, cancel).await,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::OpenAi(p) => p.name(),
            Self::Gemini(p) => p.name(),
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Self::OpenAi(p) => p.model(),
            Self::Gemini(p) => p.model(),
        }
    }
}

pub fn create_provider(config: &Config, settings: &Settings) -> Result<LlmProvider> {
    if config.effective_api_key().is_none() {
        return Err(Error::MissingApiKey {
            provider: config.provider.to_string(),
            env_var: config.provider.api_key_env().into(),
        });
    }

    Ok(match config.provider {
        Provider::OpenAi => LlmProvider::OpenAi(openai::OpenAiProvider::new(config, settings)),
        Provider::Gemini => LlmProvider::Gemini(gemini::GeminiProvider::new(config, settings)),
    })
}

#[derive(Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Deserialize)]
pub(crate) struct ErrorBody {
    pub message: String,
}

/// Human-readable detail from an error body: `error.message` if present, else the raw text.
pub(crate) fn error_detail(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

pub(crate) fn provider_error(provider: &str, message: impl Into<String>) -> Error {
    Error::Provider {
        provider: provider.into(),
        message: message.into(),
    }
}

/// Send a request and turn transport failures and non-2xx statuses into
/// [`Error::Provider`].
pub(crate) async fn send_checked(provider: &str, request: RequestBuilder) -> Result<Response> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            provider_error(provider, "request timed out")
        } else {
            provider_error(provider, e.to_string())
        }
    })?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(provider_error(
            provider,
            format!("HTTP {status}: {}", error_detail(&body)),
        ));
    }

    Ok(response)
}

/// Split buffered SSE bytes into complete lines, returning the payload of
/// each `data:` line. Incomplete trailing input stays in `buffer`, so a
/// multibyte character split across reads is decoded once it is whole.
pub(crate) fn drain_sse_data(provider: &str, buffer: &mut Vec<u8>) -> Result<Vec<String>> {
    let mut payloads = Vec::new();

    while let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
        let raw: Vec<u8> = buffer.drain(..=newline_pos).collect();
        let line = String::from_utf8(raw)
            .map_err(|e| provider_error(provider, format!("stream is not valid UTF-8: {e}")))?;
        let line = line.trim();

        if line.is_empty() || line.starts_with(':') || line.starts_with("event:") {
            continue;
        }

        if let Some(data) = line.strip_prefix("data:") {
            payloads.push(data.trim_start().to_string());
        }
    }

    Ok(payloads)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sse_lines_split_across_chunks() {
        let mut buffer = b"data: {\"a\":1}\n\ndata: {\"b\"".to_vec();
        assert_eq!(drain_sse_data("t", &mut buffer).unwrap(), vec![r#"{"a":1}"#]);
        assert_eq!(buffer, b"data: {\"b\"");

        buffer.extend_from_slice(b":2}\n");
        assert_eq!(drain_sse_data("t", &mut buffer).unwrap(), vec![r#"{"b":2}"#]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn multibyte_char_split_across_chunks_is_kept_whole() {
        let line = "data: não\n".as_bytes();
        let split = line.iter().position(|&b| b == 0xC3).unwrap() + 1;

        let mut buffer = line[..split].to_vec();
        assert!(drain_sse_data("t", &mut buffer).unwrap().is_empty());

        buffer.extend_from_slice(&line[split..]);
        assert_eq!(drain_sse_data("t", &mut buffer).unwrap(), vec!["não"]);
    }

    #[test]
    fn invalid_utf8_line_is_provider_error() {
        let mut buffer = b"data: \xff\xfe\n".to_vec();
        let err = drain_sse_data("t", &mut buffer).unwrap_err();
        assert!(matches!(err, Error::Provider { ref message, .. } if message.contains("UTF-8")));
    }

    #[test]
    fn error_detail_prefers_json_message() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        assert_eq!(error_detail(body), "Incorrect API key provided");
        assert_eq!(error_detail("  gateway down \n"), "gateway down");
    }
}
