// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use crate::domain::{FileRole, FileUpload};

pub struct PromptBuilder;

impl PromptBuilder {
    /// Single user message: every template file, then every submission file,
    /// each fenced under its name. Fence characters inside content are not escaped.
    pub fn build(templates: &[FileUpload], submissions: &[FileUpload]) -> String {
        format!(
            "{}:\n{}\n\n{}:\n{}",
            FileRole::Template.heading(),
            Self::format_files(templates),
            FileRole::Submission.heading(),
            Self::format_files(submissions),
        )
    }

    fn format_files(files: &[FileUpload]) -> String {
        files
            .iter()
            .map(|f| format!("{}:\n```{}```", f.name, f.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
