// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Request-scoped scratch space.
//
// All intermediates of one request live in a private directory under the
// configured work root. Names inside it carry the input index, so two
// uploads called `scan.jpg` in the same request do not collide either.

use std::path::{Path, PathBuf};

use stampdoc_core::RequestId;
use stampdoc_core::error::Result;
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::paths;

/// Scratch directory owned by a single request. Removed on drop.
pub struct RequestWorkspace {
    id: RequestId,
    dir: TempDir,
}

impl RequestWorkspace {
    /// Create `<root>/request-<id>…/`, creating `root` if needed.
    pub fn create(root: &Path, id: RequestId) -> Result<Self> {
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("request-{id}-"))
            .tempdir_in(root)?;
        debug!(request = %id, dir = %dir.path().display(), "Workspace created");
        Ok(Self { id, dir })
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Path for an intermediate derived from input number `index`.
    pub fn artifact(&self, index: usize, name: &str) -> PathBuf {
        self.dir.path().join(format!("{index:03}_{name}"))
    }

    /// Private subdirectory for input number `index`, e.g. as a converter
    /// output directory.
    pub fn subdir(&self, index: usize, purpose: &str) -> Result<PathBuf> {
        let path = self.dir.path().join(format!("{index:03}_{purpose}"));
        std::fs::create_dir_all(&path)?;
        Ok(path)
    }

    /// Delete the given artifacts, then the directory itself.
    pub fn cleanup(self, artifacts: &[PathBuf]) -> Result<()> {
        for artifact in artifacts {
            paths::delete(artifact)?;
        }
        let path = self.dir.path().to_path_buf();
        if let Err(err) = self.dir.close() {
            warn!(dir = %path.display(), %err, "Workspace directory not fully removed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspaces_do_not_share_directories() {
        let root = tempfile::tempdir().unwrap();
        let a = RequestWorkspace::create(root.path(), RequestId::new()).unwrap();
        let b = RequestWorkspace::create(root.path(), RequestId::new()).unwrap();
        assert_ne!(a.dir(), b.dir());
        assert_ne!(a.artifact(0, "x.pdf"), b.artifact(0, "x.pdf"));
    }

    #[test]
    fn artifacts_are_indexed() {
        let root = tempfile::tempdir().unwrap();
        let ws = RequestWorkspace::create(root.path(), RequestId::new()).unwrap();
        assert_ne!(ws.artifact(0, "scan.pdf"), ws.artifact(1, "scan.pdf"));
        assert!(ws.artifact(7, "scan.pdf").ends_with("007_scan.pdf"));
    }

    #[test]
    fn cleanup_removes_files_and_directory() {
        let root = tempfile::tempdir().unwrap();
        let ws = RequestWorkspace::create(root.path(), RequestId::new()).unwrap();
        let artifact = ws.artifact(0, "a.pdf");
        std::fs::write(&artifact, b"x").unwrap();
        let dir = ws.dir().to_path_buf();

        ws.cleanup(&[artifact.clone()]).unwrap();
        assert!(!artifact.exists());
        assert!(!dir.exists());
    }

    #[test]
    fn dropping_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = {
            let ws = RequestWorkspace::create(root.path(), RequestId::new()).unwrap();
            std::fs::write(ws.artifact(0, "left.pdf"), b"x").unwrap();
            ws.dir().to_path_buf()
        };
        assert!(!dir.exists());
    }
}
