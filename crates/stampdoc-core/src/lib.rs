// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stampdoc — Core types, errors, and configuration shared across all crates.

pub mod config;
pub mod error;
pub mod human_errors;
pub mod storage;
pub mod types;

pub use config::{ConverterConfig, PipelineConfig};
pub use error::StampdocError;
pub use storage::{BlobStore, LocalDirectoryStore};
pub use types::*;
