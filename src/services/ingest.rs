// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::domain::FileUpload;
use crate::error::{Error, Result};

/// A node found while walking dropped paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    File { path: PathBuf, name: String },
    Directory { path: PathBuf, name: String },
}

impl Entry {
    pub fn name(&self) -> &str {
        match self {
            Self::File { name, .. } | Self::Directory { name, .. } => name,
        }
    }
}

/// Reads picked files and dropped files/folders into uploads.
pub struct Ingestor {
    excludes: Option<GlobSet>,
}

impl Ingestor {
    pub fn new(exclude_patterns: &[String]) -> Result<Self> {
        if exclude_patterns.is_empty() {
            return Ok(Self { excludes: None });
        }

        let mut builder = GlobSetBuilder::new();
        for pattern in exclude_patterns {
            let glob = Glob::new(pattern)
                .map_err(|e| Error::Config(format!("invalid exclude pattern '{pattern}': {e}")))?;
            builder.add(glob);
        }
        let set = builder
            .build()
            .map_err(|e| Error::Config(format!("invalid exclude patterns: {e}")))?;

        Ok(Self {
            excludes: Some(set),
        })
    }

    fn is_excluded(&self, name: &str) -> bool {
        self.excludes.as_ref().is_some_and(|set| set.is_match(name))
    }

    /// Flat file list; each upload is named by its bare file name.
    pub async fn read_picked(&self, paths: &[PathBuf]) -> Result<Vec<FileUpload>> {
        let mut files = Vec::with_capacity(paths.len());

        for path in paths {
            let meta = tokio::fs::metadata(path).await.map_err(|e| ingest_error(path, e))?;
            if meta.is_dir() {
                return Err(Error::Ingest {
                    path: path.display().to_string(),
                    message: "is a directory; only files can be picked".into(),
                });
            }

            let name = root_name(path);
            if self.is_excluded(&name) {
                debug!(name = %name, "excluded");
                continue;
            }
            files.push((path.clone(), name));
        }

        Ok(read_all(files).await)
    }

    /// Mixed files and folders. Folders are walked depth-first without a
    /// depth limit; each upload is named by its path relative to the parent
    /// of the dropped entry, e.g. dropping `proj/` yields `proj/src/main.py`.
    pub async fn read_dropped(&self, paths: &[PathBuf]) -> Result<Vec<FileUpload>> {
        let mut roots = Vec::with_capacity(paths.len());

        for path in paths {
            let meta = tokio::fs::metadata(path).await.map_err(|e| ingest_error(path, e))?;
            let name = root_name(path);
            roots.push(if meta.is_dir() {
                Entry::Directory {
                    path: path.clone(),
                    name,
                }
            } else {
                Entry::File {
                    path: path.clone(),
                    name,
                }
            });
        }

        let files = self.walk(roots).await;
        debug!(count = files.len(), "files found");
        Ok(read_all(files).await)
    }

    /// Flatten entries into (path, name) pairs for every leaf file.
    pub async fn walk(&self, roots: Vec<Entry>) -> Vec<(PathBuf, String)> {
        let mut files = Vec::new();
        let mut stack: Vec<Entry> = roots.into_iter().rev().collect();

        while let Some(entry) = stack.pop() {
            if self.is_excluded(entry.name()) {
                debug!(name = %entry.name(), "excluded");
                continue;
            }

            match entry {
                Entry::File { path, name } => files.push((path, name)),
                Entry::Directory { path, name } => {
                    let children = list_dir(&path, &name).await;
                    stack.extend(children.into_iter().rev());
                }
            }
        }

        files
    }
}

async fn list_dir(path: &Path, name: &str) -> Vec<Entry> {
    let mut reader = match tokio::fs::read_dir(path).await {
        Ok(reader) => reader,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "skipping unreadable directory");
            return Vec::new();
        }
    };

    let mut children = Vec::new();
    loop {
        let child = match reader.next_entry().await {
            Ok(Some(child)) => child,
            Ok(None) => break,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "directory listing interrupted");
                break;
            }
        };

        let child_path = child.path();
        let child_name = join_name(name, &child.file_name().to_string_lossy());

        // Follows symlinks, unlike DirEntry::file_type
        let is_dir = match tokio::fs::metadata(&child_path).await {
            Ok(meta) => meta.is_dir(),
            Err(e) => {
                warn!(path = %child_path.display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };

        children.push(if is_dir {
            Entry::Directory {
                path: child_path,
                name: child_name,
            }
        } else {
            Entry::File {
                path: child_path,
                name: child_name,
            }
        });
    }

    // read_dir order is platform-dependent
    children.sort_by(|a, b| a.name().cmp(b.name()));
    children
}

/// Read every file concurrently. Results keep the input order; files that
/// cannot be read or are not UTF-8 text are skipped with a warning.
async fn read_all(files: Vec<(PathBuf, String)>) -> Vec<FileUpload> {
    let mut tasks = JoinSet::new();
    for (idx, (path, name)) in files.into_iter().enumerate() {
        tasks.spawn(async move { (idx, read_text(&path, name).await) });
    }

    let mut slots: Vec<Option<FileUpload>> = vec![None; tasks.len()];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((idx, upload)) => slots[idx] = upload,
            Err(e) => warn!(error = %e, "file read task failed"),
        }
    }

    slots.into_iter().flatten().collect()
}

async fn read_text(path: &Path, name: String) -> Option<FileUpload> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(file = %name, error = %e, "skipping unreadable file");
            return None;
        }
    };

    match String::from_utf8(bytes) {
        Ok(content) => Some(FileUpload { name, content }),
        Err(_) => {
            warn!(file = %name, "skipping file that is not valid UTF-8 text");
            None
        }
    }
}

fn root_name(path: &Path) -> String {
    if let Some(name) = path.file_name() {
        return name.to_string_lossy().into_owned();
    }
    // `.` or `..` have no file name of their own
    std::fs::canonicalize(path)
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_default()
}

fn join_name(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{parent}/{child}")
    }
}

fn ingest_error(path: &Path, e: std::io::Error) -> Error {
    Error::Ingest {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_name_skips_empty_parent() {
        assert_eq!(join_name("", "a.py"), "a.py");
        assert_eq!(join_name("proj", "a.py"), "proj/a.py");
    }

    #[test]
    fn root_name_is_last_component() {
        assert_eq!(root_name(Path::new("some/dir/proj")), "proj");
        assert_eq!(root_name(Path::new("a.py")), "a.py");
    }

    #[test]
    fn invalid_exclude_pattern_is_config_error() {
        let result = Ingestor::new(&["a[".to_string()]);
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
