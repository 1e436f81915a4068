// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

// miette's Diagnostic derive generates code that triggers this false positive
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    #[error("No API key configured for {provider}")]
    #[diagnostic(
        code(gradebee::input::no_api_key),
        help("Store one with: gradebee set-key, or export {env_var}")
    )]
    MissingApiKey { provider: String, env_var: String },

    #[error("No template files to review against")]
    #[diagnostic(
        code(gradebee::input::no_templates),
        help("Pass template files or folders with: --template <PATH>")
    )]
    NoTemplateFiles,

    #[error("No submission files to review")]
    #[diagnostic(
        code(gradebee::input::no_submissions),
        help("Pass submission files or folders with: --submission <PATH>")
    )]
    NoSubmissionFiles,

    #[error("A review is already in progress")]
    #[diagnostic(
        code(gradebee::review::in_progress),
        help("Wait for the current review to finish before starting another")
    )]
    ReviewInProgress,

    #[error("Operation cancelled by user")]
    Cancelled,

    #[error("Provider '{provider}' error: {message}")]
    #[diagnostic(code(gradebee::provider::error))]
    Provider { provider: String, message: String },

    #[error("Configuration error: {0}")]
    #[diagnostic(code(gradebee::config::error))]
    Config(String),

    #[error("Cannot read {path}: {message}")]
    #[diagnostic(
        code(gradebee::ingest::unreadable),
        help("Check that the path exists and is readable")
    )]
    Ingest { path: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("Dialog error: {0}")]
    Dialog(String),
}

impl From<dialoguer::Error> for Error {
    fn from(e: dialoguer::Error) -> Self {
        Error::Dialog(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
