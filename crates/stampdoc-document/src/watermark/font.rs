// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The single bold TrueType face used for every watermark.
//
// Sizes are em sizes: at size 200 one em is 200 canvas units (pixels for
// images, points for PDF pages), matching how the PDF text operator
// interprets a font size.

use std::path::{Path, PathBuf};

use ab_glyph::{Font, FontVec, GlyphId, PxScale, ScaleFont, point};
use stampdoc_core::error::{Result, StampdocError};
use tracing::{debug, info, instrument};

use super::layout::{InkExtent, TextMetrics};

/// Well-known locations of a bold sans face, tried in order when no font is
/// configured.
const SYSTEM_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/roboto/unhinted/RobotoTTF/Roboto-Bold.ttf",
    "/usr/share/fonts/truetype/roboto/Roboto-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "/Library/Fonts/Arial Bold.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
];

/// A parsed font plus the raw bytes needed to embed it into PDFs.
pub struct WatermarkFont {
    face: FontVec,
    data: Vec<u8>,
    source: Option<PathBuf>,
}

impl std::fmt::Debug for WatermarkFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatermarkFont")
            .field("source", &self.source)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl WatermarkFont {
    /// Load a TrueType/OpenType file.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|err| {
            StampdocError::RenderError(format!("font asset {} cannot be loaded: {}", path.display(), err))
        })?;
        let mut font = Self::from_bytes(data)?;
        font.source = Some(path.to_path_buf());
        info!("Watermark font loaded");
        Ok(font)
    }

    /// Parse a font already in memory.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let face = FontVec::try_from_vec(data.clone())
            .map_err(|err| StampdocError::RenderError(format!("font asset is not a valid font: {err}")))?;
        Ok(Self {
            face,
            data,
            source: None,
        })
    }

    /// Load `configured` if given, otherwise the first bold face found among
    /// the well-known system locations.
    pub fn locate(configured: Option<&Path>) -> Result<Self> {
        if let Some(path) = configured {
            return Self::load(path);
        }
        let found = SYSTEM_CANDIDATES
            .iter()
            .map(Path::new)
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| {
                StampdocError::RenderError(
                    "no bold font configured and none found in the usual system locations".into(),
                )
            })?;
        debug!(path = %found.display(), "Using system font");
        Self::load(found)
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Raw font file bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The parsed face, for drawing.
    pub fn face(&self) -> &FontVec {
        &self.face
    }

    fn units_per_em(&self) -> f32 {
        self.face.units_per_em().unwrap_or(1000.0)
    }

    /// ab_glyph scales by ascent-to-descent height; convert from an em size.
    pub fn px_scale(&self, size: f32) -> PxScale {
        PxScale::from(size * self.face.height_unscaled() / self.units_per_em())
    }

    /// Font ascent at `size` (not the ink of any particular string).
    pub fn line_ascent(&self, size: f32) -> f32 {
        self.face.ascent_unscaled() * size / self.units_per_em()
    }

    /// Advance of `ch` in thousandths of an em, as PDF width arrays expect.
    pub fn advance_per_mille(&self, ch: char) -> f32 {
        let id = self.face.glyph_id(ch);
        self.face.h_advance_unscaled(id) * 1000.0 / self.units_per_em()
    }

    /// Ascent and descent in thousandths of an em.
    pub fn vertical_metrics_per_mille(&self) -> (f32, f32) {
        let upem = self.units_per_em();
        (
            self.face.ascent_unscaled() * 1000.0 / upem,
            self.face.descent_unscaled() * 1000.0 / upem,
        )
    }
}

impl TextMetrics for WatermarkFont {
    fn text_width(&self, text: &str, size: f32) -> f32 {
        let scale = size / self.units_per_em();
        text.chars()
            .map(|ch| self.face.h_advance_unscaled(self.face.glyph_id(ch)) * scale)
            .sum()
    }

    fn ink_extent(&self, text: &str, size: f32) -> InkExtent {
        let scale = self.px_scale(size);
        let per_unit = size / self.units_per_em();
        let mut caret = 0.0f32;
        let mut top = f32::INFINITY;
        let mut bottom = f32::NEG_INFINITY;

        for ch in text.chars() {
            let id = self.face.glyph_id(ch);
            let glyph = id.with_scale_and_position(scale, point(caret, 0.0));
            caret += self.face.h_advance_unscaled(id) * per_unit;
            if let Some(outlined) = self.face.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                top = top.min(bounds.min.y);
                bottom = bottom.max(bounds.max.y);
            }
        }

        if top.is_finite() && bottom.is_finite() {
            // y grows downwards with the baseline at 0.
            InkExtent {
                above_baseline: -top,
                below_baseline: bottom,
            }
        } else {
            InkExtent::default()
        }
    }
}

/// Metrics of text as `imageproc` draws it: advances plus pair kerning
/// between outlined glyphs. PDF pages draw with `Tj`, which applies no
/// kerning, and measure with `WatermarkFont` directly.
#[derive(Debug, Clone, Copy)]
pub struct KernedMetrics<'a>(pub &'a WatermarkFont);

impl TextMetrics for KernedMetrics<'_> {
    fn text_width(&self, text: &str, size: f32) -> f32 {
        let scale = self.0.px_scale(size);
        let scaled = self.0.face.as_scaled(scale);
        let mut width = 0.0f32;
        let mut previous: Option<GlyphId> = None;

        for ch in text.chars() {
            let id = scaled.glyph_id(ch);
            width += scaled.h_advance(id);
            if self.0.face.outline_glyph(id.with_scale(scale)).is_some() {
                // Same pairing as `draw_text_mut`.
                if let Some(previous) = previous {
                    width += scaled.kern(id, previous);
                }
                previous = Some(id);
            }
        }
        width
    }

    fn ink_extent(&self, text: &str, size: f32) -> InkExtent {
        self.0.ink_extent(text, size)
    }
}
