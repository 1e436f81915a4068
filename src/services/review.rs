// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::{Config, Settings};
use crate::domain::FileUpload;
use crate::error::{Error, Result};
use crate::services::llm::{self, LlmProvider};
use crate::services::prompt::PromptBuilder;

/// Sends template and submission files to a provider, one review at a time.
pub struct ReviewPipeline {
    provider: LlmProvider,
    system_prompt: String,
    in_flight: Mutex<()>,
}

impl ReviewPipeline {
    pub fn new(provider: LlmProvider, system_prompt: impl Into<String>) -> Self {
        Self {
            provider,
            system_prompt: system_prompt.into(),
            in_flight: Mutex::new(()),
        }
    }

    /// Build the provider selected by `config`.
    pub fn from_config(config: &Config, settings: &Settings) -> Result<Self> {
        let provider = llm::create_provider(config, settings)?;
        Ok(Self::new(provider, config.system_prompt.clone()))
    }

    pub fn provider(&self) -> &LlmProvider {
        &self.provider
    }

    /// Whole-response review. Fails with [`Error::ReviewInProgress`] if
    /// another review on this pipeline has not finished.
    pub async fn review(
        &self,
        templates: &[FileUpload],
        submissions: &[FileUpload],
        cancel: CancellationToken,
    ) -> Result<String> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| Error::ReviewInProgress)?;

        let prompt = PromptBuilder::build(templates, submissions);
        debug!(
            provider = self.provider.name(),
            prompt_chars = prompt.len(),
            "requesting review"
        );

        self.provider
            .complete(&self.system_prompt, &prompt, cancel)
            .await
    }

    /// Streaming review: chunks go to `chunk_tx` in arrival order and
    /// nothing is returned on success.
    pub async fn review_stream(
        &self,
        templates: &[FileUpload],
        submissions: &[FileUpload],
        chunk_tx: mpsc::Sender<String>,
        cancel: CancellationToken,
    ) -> Result<()> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| Error::ReviewInProgress)?;

        let prompt = PromptBuilder::build(templates, submissions);
        debug!(
            provider = self.provider.name(),
            prompt_chars = prompt.len(),
            "requesting streamed review"
        );

        self.provider
            .stream(&self.system_prompt, &prompt, chunk_tx, cancel)
            .await
    }
}
