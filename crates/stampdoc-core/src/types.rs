// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Stampdoc pipeline.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one `process()` call.
///
/// Every intermediate artifact of a request lives under a directory named
/// after this id, which is what keeps concurrent requests apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Input categories the pipeline knows how to normalise into PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentCategory {
    Pdf,
    Docx,
    Image,
}

impl DocumentCategory {
    /// Extensions accepted by validation, lowercase and without the dot.
    ///
    /// `doc`, `bmp` and `tiff` are deliberately absent.
    pub const ACCEPTED_EXTENSIONS: [&'static str; 5] = ["pdf", "docx", "png", "jpg", "jpeg"];

    /// Infer the category from a file extension (with or without the leading
    /// dot, case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "png" | "jpg" | "jpeg" => Some(Self::Image),
            _ => None,
        }
    }
}

/// A validated input file. The path stays owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub category: DocumentCategory,
}

/// Target surface for a rendered watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Canvas {
    /// Raster image dimensions in pixels.
    Pixels { width: u32, height: u32 },
    /// PDF page dimensions in points, ceiling-rounded from the media box.
    Points { width: u32, height: u32 },
}

impl Canvas {
    pub fn width(&self) -> u32 {
        match self {
            Self::Pixels { width, .. } | Self::Points { width, .. } => *width,
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            Self::Pixels { height, .. } | Self::Points { height, .. } => *height,
        }
    }

    /// Build a point canvas from a media box size, rounding each side up.
    pub fn from_media_box(width: f32, height: f32) -> Self {
        Self::Points {
            width: width.max(0.0).ceil() as u32,
            height: height.max(0.0).ceil() as u32,
        }
    }
}

/// What to render and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatermarkSpec {
    pub text: String,
    pub canvas: Canvas,
}

impl WatermarkSpec {
    pub fn new(text: impl Into<String>, canvas: Canvas) -> Self {
        Self {
            text: text.into(),
            canvas,
        }
    }
}

/// How a watermark is stacked relative to an existing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompositeMode {
    /// Watermark drawn above the page content (scans, image-only pages).
    Stamp,
    /// Watermark drawn beneath the page content (born-digital text pages).
    Underlay,
}

impl CompositeMode {
    /// Pick the stacking order from the length of the text extracted from a
    /// page. Any extractable text means there is a text layer to sit beneath.
    pub fn for_extracted_text(len: usize) -> Self {
        if len > 0 { Self::Underlay } else { Self::Stamp }
    }
}

/// Lifecycle of a single pipeline request. `Failed` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    Created,
    Validating,
    Converting,
    Watermarking,
    Merging,
    Encrypting,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// One fully processed input, ready to be merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageArtifact {
    /// Position of the originating input in the request.
    pub index: usize,
    pub path: PathBuf,
    pub page_count: usize,
}

/// The merged, password-protected output handed back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalDocument {
    pub path: PathBuf,
    /// `document.<token>.pdf`, the name exposed to the storage layer.
    pub file_name: String,
    pub page_count: usize,
    /// SHA-256 of the encrypted file bytes.
    pub sha256: String,
    pub created_at: DateTime<Utc>,
}

/// Standard paper sizes used when embedding images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperSize {
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Custom { width_mm: u32, height_mm: u32 },
}

impl PaperSize {
    /// Dimensions in millimetres (width, height).
    pub fn dimensions_mm(&self) -> (u32, u32) {
        match self {
            Self::A4 => (210, 297),
            Self::A3 => (297, 420),
            Self::A5 => (148, 210),
            Self::Letter => (216, 279),
            Self::Legal => (216, 356),
            Self::Custom {
                width_mm,
                height_mm,
            } => (*width_mm, *height_mm),
        }
    }

    /// Dimensions in PDF points (1/72 inch).
    pub fn dimensions_pt(&self) -> (f32, f32) {
        let (w, h) = self.dimensions_mm();
        (w as f32 * 72.0 / 25.4, h as f32 * 72.0 / 25.4)
    }
}

/// How a raster image is placed on its PDF page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageFit {
    /// Fill the whole page, ignoring aspect ratio.
    #[default]
    Stretch,
    /// Scale to fit inside the page, preserving aspect ratio, centred.
    Contain,
}
