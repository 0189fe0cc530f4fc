// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Font fitting and three-row placement of the watermark text.
//
// Coordinates here are top-down (row 0 is the top edge of the canvas), the
// convention of raster images. The PDF writer flips them.

use stampdoc_core::Canvas;
use stampdoc_core::error::{Result, StampdocError};
use tracing::debug;

use super::{FONT_START_SIZE, MIN_FONT_SIZE, PADDING};

/// Measurement capability the layout maths needs from a font.
pub trait TextMetrics {
    /// Sum of glyph advances for `text` at `size`, in canvas units.
    fn text_width(&self, text: &str, size: f32) -> f32;

    /// Ink bounding box of `text` at `size`, relative to the baseline.
    fn ink_extent(&self, text: &str, size: f32) -> InkExtent;
}

/// Vertical extent of the inked glyphs around the baseline.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InkExtent {
    /// Distance from the baseline up to the highest ink.
    pub above_baseline: f32,
    /// Distance from the baseline down to the lowest ink.
    pub below_baseline: f32,
}

impl InkExtent {
    /// Glyph bounding-box height, rounded up.
    pub fn height(&self) -> u32 {
        (self.above_baseline + self.below_baseline).max(0.0).ceil() as u32
    }
}

/// Largest font size, stepping down from `FONT_START_SIZE` by `PADDING`, at
/// which `text` fits `canvas_width` minus padding on both sides.
///
/// Sizes below `MIN_FONT_SIZE` are never tried; text that does not fit at the
/// floor is a `RenderError`.
pub fn fit_font_size(metrics: &impl TextMetrics, text: &str, canvas_width: u32) -> Result<u32> {
    let available = canvas_width as f32 - 2.0 * PADDING as f32;
    let mut size = FONT_START_SIZE;

    loop {
        let width = metrics.text_width(text, size as f32);
        if width <= available {
            debug!(size, width, available, "Font size fitted");
            return Ok(size);
        }
        if size < MIN_FONT_SIZE + PADDING {
            return Err(StampdocError::RenderError(format!(
                "watermark of {} characters does not fit a canvas {} units wide at size {}",
                text.chars().count(),
                canvas_width,
                MIN_FONT_SIZE
            )));
        }
        size -= PADDING;
    }
}

/// Where the three copies of the watermark go on a canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkLayout {
    pub font_size: u32,
    pub text_width: f32,
    pub ink: InkExtent,
    /// Left edge shared by all rows.
    pub x: i64,
    /// Top edge of the ink box for the top, middle and bottom rows.
    pub rows: [i64; 3],
}

impl WatermarkLayout {
    pub fn compute(metrics: &impl TextMetrics, text: &str, canvas: Canvas) -> Result<Self> {
        let width = canvas.width() as f64;
        let height = canvas.height() as f64;

        let font_size = fit_font_size(metrics, text, canvas.width())?;
        let text_width = metrics.text_width(text, font_size as f32);
        let ink = metrics.ink_extent(text, font_size as f32);
        let text_height = ink.height() as f64;

        let x = (width / 2.0 - text_width as f64 / 2.0).floor() as i64;
        let top = PADDING as i64;
        let middle = (height / 2.0 - text_height / 2.0).ceil() as i64;
        let bottom = canvas.height() as i64 - PADDING as i64 - text_height as i64;

        Ok(Self {
            font_size,
            text_width,
            ink,
            x,
            rows: [top, middle, bottom],
        })
    }

    pub fn text_height(&self) -> u32 {
        self.ink.height()
    }

    /// Top-down baseline position of the given row.
    pub fn baseline_from_top(&self, row: i64) -> f32 {
        row as f32 + self.ink.above_baseline
    }
}
