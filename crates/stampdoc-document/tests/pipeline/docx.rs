// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Word documents go through the injected converter.

use std::path::Path;
use std::sync::Arc;

use stampdoc_core::StampdocError;
use stampdoc_core::error::Result;
use stampdoc_document::pdf::open_protected;
use stampdoc_document::{DocumentConverter, DocumentPipeline, DocumentRequest};

use crate::common::{self, FakeConverter};

struct FailingConverter;

impl DocumentConverter for FailingConverter {
    fn convert(&self, _input: &Path, _out_dir: &Path) -> Result<std::path::PathBuf> {
        Err(StampdocError::ConversionTimeout { secs: 10 })
    }
}

#[test]
fn converted_pages_are_watermarked_and_merged() {
    let font = common::test_font();
    let root = tempfile::tempdir().unwrap();
    let uploads = root.path().join("uploads");
    std::fs::create_dir_all(&uploads).unwrap();
    let letter = uploads.join("letter.docx");
    std::fs::write(&letter, b"PK\x03\x04").unwrap();
    let appendix = common::write_text_pdf(&uploads, "appendix.pdf", 1, "appendix");

    let converter = Arc::new(FakeConverter::new(2));
    let pipeline = DocumentPipeline::with_parts(common::config(root.path()), font, converter.clone());
    let document = pipeline
        .process(&DocumentRequest::new(vec![letter.clone(), appendix], "pw", "INTERNAL"))
        .unwrap();

    assert_eq!(converter.calls(), 1);
    assert_eq!(document.page_count, 3);
    assert_eq!(open_protected(&document.path, "pw").unwrap().get_pages().len(), 3);
    assert!(letter.exists());
    assert!(common::entries(&root.path().join("work")).is_empty());
}

#[test]
fn converter_timeout_fails_the_request() {
    let font = common::test_font();
    let root = tempfile::tempdir().unwrap();
    let uploads = root.path().join("uploads");
    std::fs::create_dir_all(&uploads).unwrap();
    let letter = uploads.join("letter.docx");
    std::fs::write(&letter, b"PK\x03\x04").unwrap();

    let pipeline = DocumentPipeline::with_parts(common::config(root.path()), font, Arc::new(FailingConverter));
    let err = pipeline
        .process(&DocumentRequest::new(vec![letter], "pw", "X"))
        .unwrap_err();
    assert!(matches!(err, StampdocError::ConversionTimeout { secs: 10 }));
    assert!(common::entries(&root.path().join("out")).is_empty());
}
