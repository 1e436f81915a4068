// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use directories::ProjectDirs;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use crate::cli::Cli;
use crate::error::{Error, Result};

/// Grading instruction used until the user stores their own prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str = "Consider the provided files as templates and student submissions for an assignment. Analyze the code and give each file a grade from 0 to 10. If the code is not perfect but works, just give a 10. If there are critical flaws, reduce the grade according to the severity. For each submission, just give an overall grade and output a brief summary of issues only when the grade is deducted. Do not output positive feedback. Disregard anything related to comments or documentation. In the end, output the total grade for the submission, which is the average of the grades for each file. If there are submissions unrelated to an assignment, simply ignore them.";

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    OpenAi,
    Gemini,
}

impl Provider {
    /// Environment variable consulted when no key is stored.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Gemini => "GEMINI_API_KEY",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::Gemini => write!(f, "gemini"),
        }
    }
}

impl FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "gemini" => Ok(Self::Gemini),
            other => Err(Error::Config(format!(
                "unknown provider '{other}', expected openai or gemini"
            ))),
        }
    }
}

/// Persisted reviewer configuration.
///
/// Serialized with camelCase keys so the stored blob reads
/// `{"provider":"openai","apiKey":"...","systemPrompt":"..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub provider: Provider,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            api_key: String::new(),
            system_prompt: default_system_prompt(),
        }
    }
}

impl Config {
    /// Stored key, or the provider's environment variable when none is stored.
    pub fn effective_api_key(&self) -> Option<String> {
        if !self.api_key.trim().is_empty() {
            return Some(self.api_key.clone());
        }
        std::env::var(self.provider.api_key_env())
            .ok()
            .filter(|k| !k.trim().is_empty())
    }

    /// Key with everything but the last four characters hidden.
    pub fn masked_api_key(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        if chars.is_empty() {
            return "(not set)".into();
        }
        if chars.len() <= 4 {
            return "****".into();
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("****{tail}")
    }
}

/// Runtime settings layered from defaults, TOML files, environment and CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Request timeout in seconds (default 300)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_openai_model")]
    pub openai_model: String,

    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    /// Base URL for OpenAI-compatible APIs (default: https://api.openai.com/v1)
    #[serde(default)]
    pub openai_base_url: Option<String>,

    #[serde(default)]
    pub gemini_base_url: Option<String>,

    /// Stream review text as it is generated (default: true)
    #[serde(default = "default_true")]
    pub stream: bool,

    /// Location of the persisted key-value store
    #[serde(default)]
    pub store_path: Option<PathBuf>,
}

fn default_timeout_secs() -> u64 {
    300
}
fn default_openai_model() -> String {
    "gpt-4".into()
}
fn default_gemini_model() -> String {
    "gemini-1.5-pro".into()
}
fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            openai_model: default_openai_model(),
            gemini_model: default_gemini_model(),
            openai_base_url: None,
            gemini_base_url: None,
            stream: default_true(),
            store_path: None,
        }
    }
}

impl Settings {
    /// Load with priority: CLI > ENV > user config > project config > defaults
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Settings::default()));

        // Project-level config (.gradebee.toml in the working directory)
        if let Ok(cwd) = std::env::current_dir() {
            let project_config = cwd.join(".gradebee.toml");
            if project_config.exists() {
                figment = figment.merge(Toml::file(&project_config));
            }
        }

        if let Some(path) = Self::config_path()
            && path.exists()
        {
            figment = figment.merge(Toml::file(&path));
        }

        // GRADEBEE_TIMEOUT_SECS, GRADEBEE_OPENAI_MODEL, GRADEBEE_STORE_PATH, ...
        figment = figment.merge(Env::prefixed("GRADEBEE_"));

        let mut settings: Settings = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        settings.apply_cli(cli);
        settings.validate()?;
        Ok(settings)
    }

    pub fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "gradebee").map(|dirs| dirs.config_dir().to_path_buf())
    }

    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("config.toml"))
    }

    /// Where the key-value store lives: the configured path, else the data dir.
    pub fn resolved_store_path(&self) -> Option<PathBuf> {
        if let Some(ref path) = self.store_path {
            return Some(path.clone());
        }
        ProjectDirs::from("", "", "gradebee").map(|dirs| dirs.data_dir().join("store.json"))
    }

    pub fn model_for(&self, provider: Provider) -> &str {
        match provider {
            Provider::OpenAi => &self.openai_model,
            Provider::Gemini => &self.gemini_model,
        }
    }

    pub fn set_model(&mut self, provider: Provider, model: String) {
        match provider {
            Provider::OpenAi => self.openai_model = model,
            Provider::Gemini => self.gemini_model = model,
        }
    }

    pub fn base_url_for(&self, provider: Provider) -> String {
        let configured = match provider {
            Provider::OpenAi => self.openai_base_url.as_deref(),
            Provider::Gemini => self.gemini_base_url.as_deref(),
        };
        let fallback = match provider {
            Provider::OpenAi => DEFAULT_OPENAI_BASE_URL,
            Provider::Gemini => DEFAULT_GEMINI_BASE_URL,
        };
        configured
            .unwrap_or(fallback)
            .trim_end_matches('/')
            .to_string()
    }

    fn apply_cli(&mut self, cli: &Cli) {
        if cli.no_stream {
            self.stream = false;
        }
        if let Some(ref path) = cli.store {
            self.store_path = Some(path.clone());
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=3600).contains(&self.timeout_secs) {
            return Err(Error::Config(format!(
                "timeout_secs must be 1–3600, got {}",
                self.timeout_secs
            )));
        }

        if self.openai_model.trim().is_empty() || self.gemini_model.trim().is_empty() {
            return Err(Error::Config("model names cannot be empty".into()));
        }

        for (field, value) in [
            ("openai_base_url", &self.openai_base_url),
            ("gemini_base_url", &self.gemini_base_url),
        ] {
            let Some(raw) = value else { continue };
            let parsed = url::Url::parse(raw)
                .map_err(|e| Error::Config(format!("{field} is not a valid URL: {e}")))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(Error::Config(format!(
                    "{field} must start with http:// or https://, got '{raw}'"
                )));
            }
        }

        Ok(())
    }

    /// Create default config file with secure permissions
    pub fn create_default() -> Result<PathBuf> {
        let Some(dir) = Self::config_dir() else {
            return Err(Error::Config("Cannot determine config directory".into()));
        };

        fs::create_dir_all(&dir)?;

        let path = dir.join("config.toml");
        let content = r#"# GradeBee Configuration
#
# Provider, API key and grading prompt are stored separately; change them
# with `gradebee set-provider`, `gradebee set-key` and `gradebee set-prompt`.

# Request timeout in seconds
timeout_secs = 300

# Model identifiers
openai_model = "gpt-4"
gemini_model = "gemini-1.5-pro"

# Base URLs for OpenAI- or Gemini-compatible endpoints
# openai_base_url = "https://api.openai.com/v1"
# gemini_base_url = "https://generativelanguage.googleapis.com/v1beta"

# Print the review as it is generated
stream = true

# Location of the persisted settings store
# store_path = "/path/to/store.json"
"#;

        fs::write(&path, content)?;

        // Set secure permissions (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&path, perms)?;
        }

        Ok(path)
    }
}
