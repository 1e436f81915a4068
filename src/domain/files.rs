// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

/// A decoded text file, named by its path relative to where it was picked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub name: String,
    pub content: String,
}

impl FileUpload {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Which side of the review a set of files belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRole {
    Template,
    Submission,
}

impl FileRole {
    pub fn heading(&self) -> &'static str {
        match self {
            Self::Template => "Template Files",
            Self::Submission => "Submission Files",
        }
    }
}

/// Ordered collection of uploads. Names are not deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    files: Vec<FileUpload>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append uploads in the order given.
    pub fn extend(&mut self, uploads: impl IntoIterator<Item = FileUpload>) {
        self.files.extend(uploads);
    }

    /// Remove every entry named exactly `name`, keeping the rest in order.
    /// Returns how many entries were dropped.
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.files.len();
        self.files.retain(|f| f.name != name);
        before - self.files.len()
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FileUpload> {
        self.files.iter()
    }

    pub fn as_slice(&self) -> &[FileUpload] {
        &self.files
    }

    pub fn names(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn total_bytes(&self) -> usize {
        self.files.iter().map(|f| f.content.len()).sum()
    }
}

impl From<Vec<FileUpload>> for FileSet {
    fn from(files: Vec<FileUpload>) -> Self {
        Self { files }
    }
}

impl FromIterator<FileUpload> for FileSet {
    fn from_iter<I: IntoIterator<Item = FileUpload>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a FileSet {
    type Item = &'a FileUpload;
    type IntoIter = std::slice::Iter<'a, FileUpload>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}
