// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Default)]
#[command(name = "gradebee")]
#[command(version)]
#[command(about = "AI-assisted grading of student submissions", long_about = None)]
pub struct Cli {
    /// Template files or folders (repeatable)
    #[arg(short, long = "template", value_name = "PATH")]
    pub templates: Vec<PathBuf>,

    /// Submission files or folders (repeatable)
    #[arg(short, long = "submission", value_name = "PATH")]
    pub submissions: Vec<PathBuf>,

    /// Skip files and folders whose name matches this glob (repeatable)
    #[arg(short = 'x', long = "exclude", value_name = "GLOB")]
    pub excludes: Vec<String>,

    /// Name files by their bare file name and reject folders
    #[arg(long)]
    pub flat: bool,

    /// Model name for the active provider
    #[arg(short, long, env = "GRADEBEE_MODEL")]
    pub model: Option<String>,

    /// Wait for the complete review instead of streaming it
    #[arg(long)]
    pub no_stream: bool,

    /// Path of the settings store
    #[arg(long, value_name = "PATH", env = "GRADEBEE_STORE")]
    pub store: Option<PathBuf>,

    /// Show the prompt sent to the provider
    #[arg(long)]
    pub show_prompt: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Initialize config file
    Init,
    /// Show current configuration
    Config,
    /// Switch provider (openai, gemini); clears the stored API key
    SetProvider { provider: String },
    /// Store the API key for the active provider
    SetKey {
        /// Key value; prompted for (hidden) when omitted
        key: Option<String>,
    },
    /// Change the grading prompt
    SetPrompt {
        /// New prompt text
        #[arg(conflicts_with_all = ["file", "reset"])]
        text: Option<String>,
        /// Read the prompt from a file
        #[arg(long, value_name = "PATH", conflicts_with = "reset")]
        file: Option<PathBuf>,
        /// Restore the built-in grading prompt
        #[arg(long)]
        reset: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}
