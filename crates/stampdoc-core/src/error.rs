// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Stampdoc.

use thiserror::Error;

/// Top-level error type for all Stampdoc operations.
///
/// Every variant is fatal to the request that produced it. Nothing inside the
/// pipeline retries automatically.
#[derive(Debug, Error)]
pub enum StampdocError {
    // -- Intake --
    #[error("{0} is not a valid format")]
    UnsupportedFormat(String),

    #[error("no input files were supplied")]
    NoInputs,

    // -- Conversion --
    #[error("document conversion timed out after {secs}s")]
    ConversionTimeout { secs: u64 },

    #[error("document conversion failed: {0}")]
    ConversionError(String),

    // -- Rendering --
    #[error("watermark rendering failed: {0}")]
    RenderError(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- PDF assembly --
    #[error("PDF merge failed: {0}")]
    MergeError(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    // -- Boundary --
    #[error("storage failed: {0}")]
    StorageError(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("processing was cancelled")]
    Cancelled,

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, StampdocError>;
