// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use super::{FileRole, FileSet};
use crate::error::{Error, Result};

/// Template and submission sets collected for one grading run.
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    pub templates: FileSet,
    pub submissions: FileSet,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, role: FileRole) -> &FileSet {
        match role {
            FileRole::Template => &self.templates,
            FileRole::Submission => &self.submissions,
        }
    }

    pub fn set_mut(&mut self, role: FileRole) -> &mut FileSet {
        match role {
            FileRole::Template => &mut self.templates,
            FileRole::Submission => &mut self.submissions,
        }
    }

    /// Input checks that must pass before a review is triggered.
    pub fn check_ready(&self) -> Result<()> {
        if self.templates.is_empty() {
            return Err(Error::NoTemplateFiles);
        }
        if self.submissions.is_empty() {
            return Err(Error::NoSubmissionFiles);
        }
        Ok(())
    }
}
