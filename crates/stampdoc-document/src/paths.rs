// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Filename helpers shared by every stage of the pipeline.

use std::path::{Path, PathBuf};

use stampdoc_core::error::Result;
use tracing::debug;
use uuid::Uuid;

/// Stem of every final document name.
pub const FINAL_DOCUMENT_STEM: &str = "document";

/// Extension of `path` including the leading dot, case preserved.
/// Returns an empty string when there is none.
pub fn extension(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

/// Name of the file without its directory.
pub fn filename(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Name of the file without its directory or extension.
pub fn filename_no_ext(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Insert `"{prefix}_"` in front of the file name, keeping the directory.
pub fn with_prefix(path: &Path, prefix: &str) -> PathBuf {
    let renamed = format!("{prefix}_{}", filename(path));
    match path.parent() {
        Some(parent) => parent.join(renamed),
        None => PathBuf::from(renamed),
    }
}

/// Replace the extension of `path`. `new_ext` may be given with or without
/// the leading dot.
pub fn with_extension(path: &Path, new_ext: &str) -> PathBuf {
    path.with_extension(new_ext.trim_start_matches('.'))
}

/// A fresh `document.<token>.pdf` name. The token is a random UUID, so names
/// never collide across concurrent requests.
pub fn unique_document_name() -> String {
    format!("{FINAL_DOCUMENT_STEM}.{}.pdf", Uuid::new_v4().simple())
}

/// Remove a file. A missing file is reported as an error.
pub fn delete(path: &Path) -> Result<()> {
    std::fs::remove_file(path)?;
    debug!(path = %path.display(), "Deleted artifact");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stampdoc_core::StampdocError;

    #[test]
    fn extension_keeps_dot_and_case() {
        assert_eq!(extension(Path::new("uploads/three.JPEG")), ".JPEG");
        assert_eq!(extension(Path::new("a.tar.gz")), ".gz");
        assert_eq!(extension(Path::new("README")), "");
        assert_eq!(extension(Path::new(".bashrc")), "");
    }

    #[test]
    fn filename_helpers_strip_directories() {
        let path = Path::new("/srv/in/report.final.pdf");
        assert_eq!(filename(path), "report.final.pdf");
        assert_eq!(filename_no_ext(path), "report.final");
    }

    #[test]
    fn prefix_preserves_directory() {
        assert_eq!(
            with_prefix(Path::new("/tmp/req/a.pdf"), "watermark"),
            PathBuf::from("/tmp/req/watermark_a.pdf")
        );
        assert_eq!(with_prefix(Path::new("a.pdf"), "watermark"), PathBuf::from("watermark_a.pdf"));
    }

    #[test]
    fn extension_swaps_compose() {
        for name in ["a", "b.png", "dir/c.tar.gz", "x.y.z"] {
            let once = with_extension(Path::new(name), "x");
            let twice = with_extension(&once, ".y");
            assert_eq!(extension(&twice), ".y", "{name}");
            assert_eq!(filename_no_ext(&twice), filename_no_ext(&once), "{name}");
        }
    }

    #[test]
    fn unique_names_follow_pattern_and_differ() {
        let a = unique_document_name();
        let b = unique_document_name();
        assert!(a.starts_with("document.") && a.ends_with(".pdf"));
        assert_ne!(a, b);
    }

    #[test]
    fn deleting_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = delete(&dir.path().join("nope.pdf"));
        assert!(matches!(result, Err(StampdocError::Io(_))));
    }
}
