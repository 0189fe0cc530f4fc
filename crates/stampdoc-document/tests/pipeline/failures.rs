// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Requests that fail, and what they leave behind.

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use stampdoc_core::{PipelineStage, StampdocError};
use stampdoc_document::DocumentRequest;

use crate::common;

#[test]
fn legacy_word_format_is_rejected_before_any_work() {
    let font = common::test_font();
    let root = tempfile::tempdir().unwrap();
    let uploads = root.path().join("uploads");
    let good = common::write_text_pdf(&uploads, "good.pdf", 1, "good");
    let legacy = uploads.join("old.doc");
    std::fs::write(&legacy, b"\xd0\xcf\x11\xe0").unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let pipeline = common::pipeline(root.path(), font).on_stage(move |_, stage| sink.lock().unwrap().push(stage));

    let err = pipeline
        .process(&DocumentRequest::new(vec![good, legacy], "pw", "X"))
        .unwrap_err();
    assert!(matches!(err, StampdocError::UnsupportedFormat(ref ext) if ext == ".doc"));
    assert_eq!(err.to_string(), ".doc is not a valid format");

    assert!(!root.path().join("work").exists());
    assert!(common::entries(&root.path().join("out")).is_empty());
    assert_eq!(seen.lock().unwrap().last(), Some(&PipelineStage::Failed));
}

#[test]
fn empty_request_is_rejected() {
    let font = common::test_font();
    let root = tempfile::tempdir().unwrap();
    let pipeline = common::pipeline(root.path(), font);
    let err = pipeline
        .process(&DocumentRequest::new(Vec::<PathBuf>::new(), "pw", "X"))
        .unwrap_err();
    assert!(matches!(err, StampdocError::NoInputs));
}

#[test]
fn damaged_pdf_fails_and_leaves_nothing_behind() {
    let font = common::test_font();
    let root = tempfile::tempdir().unwrap();
    let uploads = root.path().join("uploads");
    let good = common::write_jpeg(&uploads, "good.jpg", 100, 100);
    let damaged = uploads.join("damaged.pdf");
    std::fs::write(&damaged, b"%PDF-1.7\nthis is not really a pdf").unwrap();

    let pipeline = common::pipeline(root.path(), font);
    let err = pipeline
        .process(&DocumentRequest::new(vec![good.clone(), damaged], "pw", "X"))
        .unwrap_err();
    assert!(matches!(err, StampdocError::MergeError(_)));

    assert!(good.exists());
    assert!(common::entries(&root.path().join("work")).is_empty());
    assert!(common::entries(&root.path().join("out")).is_empty());
}

#[test]
fn watermark_too_long_for_the_page_is_a_render_error() {
    let font = common::test_font();
    let root = tempfile::tempdir().unwrap();
    let small = common::write_jpeg(&root.path().join("uploads"), "thumb.jpg", 60, 60);

    let pipeline = common::pipeline(root.path(), font);
    let err = pipeline
        .process(&DocumentRequest::new(vec![small], "pw", "THIS WATERMARK IS FAR TOO LONG"))
        .unwrap_err();
    assert!(matches!(err, StampdocError::RenderError(_)));
    assert!(common::entries(&root.path().join("work")).is_empty());
}

#[test]
fn cancelled_request_stops_at_the_first_file() {
    let font = common::test_font();
    let root = tempfile::tempdir().unwrap();
    let a = common::write_text_pdf(&root.path().join("uploads"), "a.pdf", 1, "a");

    let pipeline = common::pipeline(root.path(), font);
    let request = DocumentRequest::new(vec![a], "pw", "X");
    request.cancellation_flag().store(true, Ordering::Relaxed);

    let err = pipeline.process(&request).unwrap_err();
    assert!(matches!(err, StampdocError::Cancelled));
    assert!(common::entries(&root.path().join("work")).is_empty());
    assert!(common::entries(&root.path().join("out")).is_empty());
}

#[test]
fn cancelling_one_request_leaves_later_ones_alone() {
    let font = common::test_font();
    let root = tempfile::tempdir().unwrap();
    let a = common::write_text_pdf(&root.path().join("uploads"), "a.pdf", 1, "a");
    let pipeline = common::pipeline(root.path(), font);

    let cancelled = DocumentRequest::new(vec![a.clone()], "pw", "X");
    cancelled.cancellation_flag().store(true, Ordering::Relaxed);
    assert!(matches!(pipeline.process(&cancelled), Err(StampdocError::Cancelled)));

    let document = pipeline
        .process(&DocumentRequest::new(vec![a], "pw", "X"))
        .unwrap();
    assert_eq!(document.page_count, 1);
}
