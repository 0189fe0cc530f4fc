// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// stampdoc-document — Document processing for the Stampdoc pipeline.
//
// Turns a batch of PDFs, Word documents and images into one watermarked,
// password-protected PDF: format conversion, watermark rendering, per-page
// compositing, merging, and encryption, orchestrated by `DocumentPipeline`.

pub mod convert;
pub mod paths;
pub mod pdf;
pub mod pipeline;
pub mod watermark;
pub mod workspace;

// Re-export the primary structs so callers can use `stampdoc_document::DocumentPipeline` etc.
pub use convert::{DocumentConverter, FormatConverter, OfficeConverter};
pub use pdf::{PageCompositor, PdfReader};
pub use pipeline::{DocumentPipeline, DocumentRequest};
pub use watermark::{WatermarkFont, WatermarkRenderer};
pub use workspace::RequestWorkspace;
