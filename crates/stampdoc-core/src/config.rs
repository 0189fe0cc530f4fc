// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StampdocError};
use crate::{ImageFit, PaperSize};

/// Settings for the external office converter used for DOCX input.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Explicit converter executable. When unset the platform default is used.
    pub program: Option<PathBuf>,
    /// Upper bound on a single conversion, in seconds.
    pub timeout_secs: u64,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            program: None,
            timeout_secs: 10,
        }
    }
}

/// Settings for a `DocumentPipeline`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root under which each request creates its own scratch directory.
    pub work_dir: PathBuf,
    /// Directory receiving the final `document.<token>.pdf` files.
    pub output_dir: PathBuf,
    /// Bold TrueType face for the watermark. Located on the system if unset.
    pub font_path: Option<PathBuf>,
    /// Page size for embedded images.
    pub paper_size: PaperSize,
    /// Placement of embedded images.
    pub image_fit: ImageFit,
    pub converter: ConverterConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir().join("stampdoc"),
            output_dir: PathBuf::from("."),
            font_path: None,
            paper_size: PaperSize::A4,
            image_fit: ImageFit::Stretch,
            converter: ConverterConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load settings from a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.converter.timeout_secs == 0 {
            return Err(StampdocError::Config(
                "converter.timeout_secs must be at least 1".into(),
            ));
        }
        let (width_mm, height_mm) = self.paper_size.dimensions_mm();
        if width_mm == 0 || height_mm == 0 {
            return Err(StampdocError::Config(
                "custom paper size must have non-zero sides".into(),
            ));
        }
        Ok(())
    }
}
