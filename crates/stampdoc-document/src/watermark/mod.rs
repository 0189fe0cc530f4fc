// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Watermark module — shrink-to-fit bold text, drawn three times (top,
// middle, bottom) and centred horizontally, as a raster layer or a PDF page.

pub mod font;
pub mod layout;
pub mod pdf;
pub mod raster;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use stampdoc_core::error::{Result, StampdocError};
use stampdoc_core::{Canvas, WatermarkSpec};
use tracing::instrument;

pub use font::{KernedMetrics, WatermarkFont};
pub use layout::{InkExtent, TextMetrics, WatermarkLayout, fit_font_size};

use crate::paths;

/// Font size the fitting starts from.
pub const FONT_START_SIZE: u32 = 200;
/// Margin from the canvas edges, and the font size decrement.
pub const PADDING: u32 = 20;
/// Smallest font size tried before giving up.
pub const MIN_FONT_SIZE: u32 = PADDING;
/// Gray level of the watermark text.
pub const WATERMARK_GRAY: u8 = 128;
/// Opacity of the watermark text, out of 255.
pub const WATERMARK_ALPHA: u8 = 100;

/// A rendered watermark artifact on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedWatermark {
    pub path: PathBuf,
    pub canvas: Canvas,
}

/// Renders watermark artifacts with a shared font.
#[derive(Debug, Clone)]
pub struct WatermarkRenderer {
    font: Arc<WatermarkFont>,
}

impl WatermarkRenderer {
    pub fn new(font: Arc<WatermarkFont>) -> Self {
        Self { font }
    }

    pub fn font(&self) -> &WatermarkFont {
        &self.font
    }

    /// Fitted size and placement for `text` on `canvas`.
    pub fn layout(&self, text: &str, canvas: Canvas) -> Result<WatermarkLayout> {
        match canvas {
            Canvas::Pixels { .. } => WatermarkLayout::compute(&KernedMetrics(self.font.as_ref()), text, canvas),
            Canvas::Points { .. } => WatermarkLayout::compute(self.font.as_ref(), text, canvas),
        }
    }

    /// Render `spec` next to `target`.
    ///
    /// Pixel canvases produce a translucent PNG layer, point canvases a
    /// single-page PDF; the extension of `target` is adjusted to match.
    #[instrument(skip(self, spec), fields(canvas = ?spec.canvas))]
    pub fn render(&self, spec: &WatermarkSpec, target: &Path) -> Result<RenderedWatermark> {
        let path = match spec.canvas {
            Canvas::Pixels { width, height } => {
                let path = paths::with_extension(target, "png");
                let layer = raster::render_layer(&self.font, &spec.text, width, height)?;
                layer.save(&path).map_err(|err| {
                    StampdocError::RenderError(format!("cannot write {}: {}", path.display(), err))
                })?;
                path
            }
            Canvas::Points { width, height } => {
                let path = paths::with_extension(target, "pdf");
                pdf::write_watermark_pdf(&self.font, &spec.text, width, height, &path)?;
                path
            }
        };
        Ok(RenderedWatermark {
            path,
            canvas: spec.canvas,
        })
    }

    /// Watermark a raster image, writing a JPEG to `output`.
    pub fn watermark_image(&self, text: &str, source: &Path, output: &Path) -> Result<PathBuf> {
        raster::watermark_image(&self.font, text, source, output)?;
        Ok(output.to_path_buf())
    }
}
