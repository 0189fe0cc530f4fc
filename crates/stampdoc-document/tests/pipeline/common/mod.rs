// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared fixtures. Every input is synthesised on the fly.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::{Rgb, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use stampdoc_core::PipelineConfig;
use stampdoc_core::error::Result;
use stampdoc_document::{DocumentConverter, DocumentPipeline, WatermarkFont};

/// Path of the checked-in watermark font.
pub fn font_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/Roboto-Medium.ttf")
}

pub fn test_font() -> Arc<WatermarkFont> {
    Arc::new(WatermarkFont::load(font_path()).unwrap())
}

/// Build an A4 PDF whose pages show `"{label} {n}"`.
pub fn text_pdf(pages: usize, label: &str) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let kids: Vec<Object> = (0..pages)
        .map(|n| {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 18.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(format!("{label} {n}"))]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            })
            .into()
        })
        .collect();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

pub fn write_text_pdf(dir: &Path, name: &str, pages: usize, label: &str) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    text_pdf(pages, label).save(&path).unwrap();
    path
}

/// A photo-like JPEG with a gradient.
pub fn write_jpeg(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 180]))
        .save(&path)
        .unwrap();
    path
}

/// Pipeline rooted at `root/work` and `root/out`.
pub fn config(root: &Path) -> PipelineConfig {
    PipelineConfig {
        work_dir: root.join("work"),
        output_dir: root.join("out"),
        font_path: Some(font_path()),
        ..PipelineConfig::default()
    }
}

pub fn pipeline(root: &Path, font: Arc<WatermarkFont>) -> DocumentPipeline {
    DocumentPipeline::with_parts(config(root), font, Arc::new(FakeConverter::new(1)))
}

/// Files left directly inside `dir` (none if it does not exist).
pub fn entries(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(read) => read.map(|entry| entry.unwrap().path()).collect(),
        Err(_) => Vec::new(),
    }
}

/// Stands in for the office suite: writes a text PDF named after the input.
pub struct FakeConverter {
    pages: usize,
    calls: AtomicUsize,
}

impl FakeConverter {
    pub fn new(pages: usize) -> Self {
        Self {
            pages,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DocumentConverter for FakeConverter {
    fn convert(&self, input: &Path, out_dir: &Path) -> Result<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let stem = input.file_stem().unwrap().to_string_lossy().into_owned();
        Ok(write_text_pdf(out_dir, &format!("{stem}.pdf"), self.pages, &stem))
    }
}
