// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — reading, per-page watermark compositing, merging, and
// password protection.

pub mod compositor;
pub mod encrypt;
pub mod merge;
pub mod reader;

pub use compositor::{CompositedDocument, PageCompositor};
pub use encrypt::{encrypt_in_place, open_protected};
pub use merge::{PdfMerger, merge_files};
pub use reader::PdfReader;
