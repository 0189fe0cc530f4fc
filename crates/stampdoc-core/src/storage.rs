// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Publishing capability for finished documents.

use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use crate::error::{Result, StampdocError};

/// Somewhere a finished document can be published to obtain a link.
///
/// Implementations must leave `local_path` in place: a failed upload never
/// destroys the artifact that was already produced.
pub trait BlobStore: Send + Sync {
    /// Publish the file at `local_path` under `name` and return its URL.
    fn store(&self, local_path: &Path, name: &str) -> Result<String>;
}

/// A `BlobStore` backed by a directory, e.g. one served by a static web server.
#[derive(Debug, Clone)]
pub struct LocalDirectoryStore {
    root: PathBuf,
    base_url: String,
}

impl LocalDirectoryStore {
    /// Files are copied into `root` and advertised as `{base_url}/{name}`.
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl BlobStore for LocalDirectoryStore {
    #[instrument(skip(self, local_path))]
    fn store(&self, local_path: &Path, name: &str) -> Result<String> {
        if name.is_empty() || name.contains(['/', '\\']) || name == ".." {
            return Err(StampdocError::StorageError(format!(
                "invalid object name {name:?}"
            )));
        }

        std::fs::create_dir_all(&self.root)
            .map_err(|err| StampdocError::StorageError(format!("cannot create store: {err}")))?;
        let target = self.root.join(name);
        let bytes = std::fs::copy(local_path, &target)
            .map_err(|err| StampdocError::StorageError(format!("copy failed: {err}")))?;

        info!(bytes, "Document published");
        Ok(format!("{}/{}", self.base_url, name))
    }
}
