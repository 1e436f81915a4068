// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use std::fs;
use std::path::Path;

use gradebee::config::{Config, Provider, Settings};
use gradebee::domain::FileUpload;

/// Create a FileUpload for testing
#[allow(dead_code)]
pub fn make_upload(name: &str, content: &str) -> FileUpload {
    FileUpload::new(name, content)
}

/// Stored config for `provider` with a fixed test key
#[allow(dead_code)]
pub fn make_config(provider: Provider) -> Config {
    Config {
        provider,
        api_key: "test-key".into(),
        system_prompt: "Grade strictly.".into(),
    }
}

/// Settings pointing both providers at a mock server
#[allow(dead_code)]
pub fn mock_settings(server_url: &str) -> Settings {
    Settings {
        timeout_secs: 5,
        openai_base_url: Some(server_url.to_string()),
        gemini_base_url: Some(server_url.to_string()),
        ..Settings::default()
    }
}

/// Write `content` to `root/rel`, creating parent directories
#[allow(dead_code)]
pub fn write_file(root: &Path, rel: &str, content: &[u8]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// Sorted upload names, for comparisons that should not depend on order
#[allow(dead_code)]
pub fn sorted_names(uploads: &[FileUpload]) -> Vec<String> {
    let mut names: Vec<String> = uploads.iter().map(|u| u.name.clone()).collect();
    names.sort();
    names
}
