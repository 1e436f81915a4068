// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cli::{Cli, Commands};
use crate::config::{Config, Provider, Settings};
use crate::domain::{FileRole, FileUpload, Workspace};
use crate::error::{Error, Result};
use crate::services::{
    ingest::Ingestor,
    prompt::PromptBuilder,
    review::ReviewPipeline,
    store::{ConfigStore, JsonFileStore},
};

pub struct App {
    cli: Cli,
    settings: Settings,
    cancel_token: CancellationToken,
}

impl App {
    pub fn new(cli: Cli) -> Result<Self> {
        let settings = Settings::load(&cli)?;
        debug!(
            timeout_secs = settings.timeout_secs,
            stream = settings.stream,
            "settings loaded"
        );
        let cancel_token = CancellationToken::new();
        Ok(Self {
            cli,
            settings,
            cancel_token,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        // Setup Ctrl+C handler with CancellationToken
        let cancel = self.cancel_token.clone();
        tokio::spawn(async move {
            signal::ctrl_c().await.ok();
            cancel.cancel();
        });

        if let Some(ref cmd) = self.cli.command {
            return self.handle_command(cmd).await;
        }

        self.run_review().await
    }

    fn open_store(&self) -> Result<ConfigStore<JsonFileStore>> {
        let Some(path) = self.settings.resolved_store_path() else {
            return Err(Error::Config("Cannot determine data directory".into()));
        };
        ConfigStore::open(JsonFileStore::open(path)?)
    }

    async fn run_review(&mut self) -> Result<()> {
        let config = self.open_store()?.snapshot();

        // Input checks happen here, before anything is sent
        if config.effective_api_key().is_none() {
            return Err(Error::MissingApiKey {
                provider: config.provider.to_string(),
                env_var: config.provider.api_key_env().into(),
            });
        }

        if let Some(ref model) = self.cli.model {
            self.settings.set_model(config.provider, model.clone());
        }

        self.print_status("Reading files...");
        let workspace = self.collect_files().await?;
        workspace.check_ready()?;

        for role in [FileRole::Template, FileRole::Submission] {
            let set = workspace.set(role);
            self.print_info(&format!(
                "{}: {} files ({} bytes)",
                role.heading(),
                set.len(),
                set.total_bytes()
            ));
            debug!(files = ?set.names(), "{}", role.heading());
        }

        if self.cli.show_prompt {
            let prompt = PromptBuilder::build(
                workspace.templates.as_slice(),
                workspace.submissions.as_slice(),
            );
            eprintln!("{}", style("--- SYSTEM PROMPT ---").dim());
            eprintln!("{}", config.system_prompt);
            eprintln!("{}", style("--- PROMPT ---").dim());
            eprintln!("{}", prompt);
            eprintln!("{}", style("--- END PROMPT ---").dim());
        }

        if self.cancel_token.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let pipeline = ReviewPipeline::from_config(&config, &self.settings)?;
        self.print_status(&format!(
            "Contacting {} ({})...",
            pipeline.provider().name(),
            pipeline.provider().model()
        ));

        if self.settings.stream {
            self.stream_review(&pipeline, &workspace).await
        } else {
            self.wait_for_review(&pipeline, &workspace).await
        }
    }

    async fn collect_files(&self) -> Result<Workspace> {
        let ingestor = Ingestor::new(&self.cli.excludes)?;
        let mut workspace = Workspace::new();

        for (role, paths) in [
            (FileRole::Template, &self.cli.templates),
            (FileRole::Submission, &self.cli.submissions),
        ] {
            let uploads = self.read_paths(&ingestor, paths).await?;
            workspace.set_mut(role).extend(uploads);
        }

        Ok(workspace)
    }

    async fn read_paths(&self, ingestor: &Ingestor, paths: &[PathBuf]) -> Result<Vec<FileUpload>> {
        if self.cli.flat {
            ingestor.read_picked(paths).await
        } else {
            ingestor.read_dropped(paths).await
        }
    }

    async fn stream_review(&self, pipeline: &ReviewPipeline, workspace: &Workspace) -> Result<()> {
        let (tx, mut rx) = mpsc::channel::<String>(64);

        let cancel_for_printer = self.cancel_token.clone();
        let print_handle = tokio::spawn(async move {
            let mut stdout = std::io::stdout();
            loop {
                tokio::select! {
                    _ = cancel_for_printer.cancelled() => break,
                    chunk = rx.recv() => {
                        match chunk {
                            Some(text) => {
                                let _ = write!(stdout, "{text}");
                                let _ = stdout.flush();
                            }
                            None => break,
                        }
                    }
                }
            }
        });

        let result = pipeline
            .review_stream(
                workspace.templates.as_slice(),
                workspace.submissions.as_slice(),
                tx,
                self.cancel_token.clone(),
            )
            .await;

        let _ = print_handle.await;
        println!();

        result?;
        eprintln!("{} Review complete", style("✓").green().bold());
        Ok(())
    }

    async fn wait_for_review(
        &self,
        pipeline: &ReviewPipeline,
        workspace: &Workspace,
    ) -> Result<()> {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message("Waiting for review");
        spinner.enable_steady_tick(Duration::from_millis(120));

        let result = pipeline
            .review(
                workspace.templates.as_slice(),
                workspace.submissions.as_slice(),
                self.cancel_token.clone(),
            )
            .await;

        spinner.finish_and_clear();

        let review = result?;
        println!("{review}");
        Ok(())
    }

    async fn handle_command(&self, cmd: &Commands) -> Result<()> {
        match cmd {
            Commands::Init => {
                let path = Settings::create_default()?;
                println!("Created config: {}", path.display());
                Ok(())
            }
            Commands::Config => self.show_config(),
            Commands::SetProvider { provider } => {
                let provider: Provider = provider.parse()?;
                let mut store = self.open_store()?;
                store.set_provider(provider)?;
                eprintln!(
                    "{} Provider set to {} (API key cleared)",
                    style("✓").green().bold(),
                    provider
                );
                Ok(())
            }
            Commands::SetKey { key } => self.set_api_key(key.as_deref()),
            Commands::SetPrompt { text, file, reset } => {
                self.set_prompt(text.as_deref(), file.as_ref(), *reset)
            }
            Commands::Completions { shell } => {
                let mut cmd = <Cli as clap::CommandFactory>::command();
                clap_complete::generate(*shell, &mut cmd, "gradebee", &mut std::io::stdout());
                Ok(())
            }
        }
    }

    fn show_config(&self) -> Result<()> {
        let store = self.open_store()?;
        let config: &Config = store.config();

        println!("Provider: {}", config.provider);
        println!("API key: {}", config.masked_api_key());
        println!("Model: {}", self.settings.model_for(config.provider));
        println!("Base URL: {}", self.settings.base_url_for(config.provider));
        println!("Timeout: {}s", self.settings.timeout_secs);
        println!("Stream: {}", self.settings.stream);
        if let Some(path) = self.settings.resolved_store_path() {
            println!("Store: {}", path.display());
        }
        println!();
        println!("[system prompt]");
        println!("{}", config.system_prompt);
        Ok(())
    }

    fn set_api_key(&self, key: Option<&str>) -> Result<()> {
        let mut store = self.open_store()?;
        let provider = store.config().provider;

        let key = match key {
            Some(k) => k.to_string(),
            None => {
                eprintln!(
                    "Enter API key for {} (input will be hidden):",
                    style(provider).bold()
                );
                dialoguer::Password::new()
                    .with_prompt("API key")
                    .interact()?
            }
        };

        if key.trim().is_empty() {
            return Err(Error::Config("API key cannot be empty".into()));
        }

        store.set_api_key(key.trim())?;
        eprintln!(
            "{} API key stored for {}",
            style("✓").green().bold(),
            provider
        );
        Ok(())
    }

    fn set_prompt(&self, text: Option<&str>, file: Option<&PathBuf>, reset: bool) -> Result<()> {
        let mut store = self.open_store()?;

        if reset {
            store.reset_system_prompt()?;
            eprintln!("{} Restored default prompt", style("✓").green().bold());
            return Ok(());
        }

        let prompt = match (text, file) {
            (Some(t), _) => t.to_string(),
            (None, Some(path)) => std::fs::read_to_string(path)?,
            (None, None) => {
                return Err(Error::Config(
                    "set-prompt needs prompt text, --file <PATH> or --reset".into(),
                ));
            }
        };

        if prompt.trim().is_empty() {
            return Err(Error::Config("System prompt cannot be empty".into()));
        }

        store.set_system_prompt(prompt)?;
        eprintln!("{} System prompt updated", style("✓").green().bold());
        Ok(())
    }

    // ─── Output Helpers ───

    fn print_status(&self, msg: &str) {
        eprintln!("{} {}", style("→").cyan(), msg);
    }

    fn print_info(&self, msg: &str) {
        eprintln!("{} {}", style("info:").cyan(), msg);
    }
}
