// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Successful requests.

use std::sync::{Arc, Mutex};

use stampdoc_core::PipelineStage;
use stampdoc_document::DocumentRequest;
use stampdoc_document::pdf::open_protected;
use stampdoc_document::pipeline::hash_bytes;

use crate::common;

#[test]
fn pdf_and_photo_become_one_protected_document() {
    let font = common::test_font();
    let root = tempfile::tempdir().unwrap();
    let uploads = root.path().join("uploads");
    let a = common::write_text_pdf(&uploads, "a.pdf", 2, "alpha");
    let b = common::write_jpeg(&uploads, "b.jpg", 640, 480);

    let pipeline = common::pipeline(root.path(), font);
    let request = DocumentRequest::new(vec![a.clone(), b.clone()], "secret", "CONFIDENTIAL");
    let document = pipeline.process(&request).unwrap();

    assert_eq!(document.page_count, 3);
    assert!(document.file_name.starts_with("document.") && document.file_name.ends_with(".pdf"));
    assert_eq!(document.path, root.path().join("out").join(&document.file_name));

    let opened = open_protected(&document.path, "secret").unwrap();
    assert_eq!(opened.get_pages().len(), 3);
    assert!(open_protected(&document.path, "not-the-password").is_err());

    let bytes = std::fs::read(&document.path).unwrap();
    assert_eq!(document.sha256, hash_bytes(&bytes));

    // Inputs belong to the caller; intermediates are gone.
    assert!(a.exists() && b.exists());
    assert!(common::entries(&root.path().join("work")).is_empty());
    assert_eq!(common::entries(&root.path().join("out")), vec![document.path.clone()]);
}

#[test]
fn pages_keep_input_order() {
    let font = common::test_font();
    let root = tempfile::tempdir().unwrap();
    let uploads = root.path().join("uploads");
    let first = common::write_text_pdf(&uploads, "first.pdf", 1, "first");
    let photo = common::write_jpeg(&uploads, "photo.png", 200, 300);
    let last = common::write_text_pdf(&uploads, "last.pdf", 1, "last");

    let pipeline = common::pipeline(root.path(), font);
    let document = pipeline
        .process(&DocumentRequest::new(vec![first, photo, last], "pw", "DRAFT"))
        .unwrap();

    let opened = open_protected(&document.path, "pw").unwrap();
    assert_eq!(opened.get_pages().len(), 3);
    assert!(opened.extract_text(&[1]).unwrap().contains("first 0"));
    assert!(opened.extract_text(&[3]).unwrap().contains("last 0"));
}

#[test]
fn same_named_inputs_do_not_collide() {
    let font = common::test_font();
    let root = tempfile::tempdir().unwrap();
    let one = common::write_jpeg(&root.path().join("u1"), "scan.jpg", 120, 160);
    let two = common::write_jpeg(&root.path().join("u2"), "scan.jpg", 160, 120);

    let pipeline = common::pipeline(root.path(), font);
    let document = pipeline
        .process(&DocumentRequest::new(vec![one, two], "pw", "COPY"))
        .unwrap();
    assert_eq!(document.page_count, 2);
}

#[test]
fn observer_sees_every_stage_in_order() {
    let font = common::test_font();
    let root = tempfile::tempdir().unwrap();
    let a = common::write_text_pdf(&root.path().join("uploads"), "a.pdf", 1, "a");

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let pipeline = common::pipeline(root.path(), font).on_stage(move |_, stage| sink.lock().unwrap().push(stage));

    pipeline.process(&DocumentRequest::new(vec![a], "pw", "X")).unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            PipelineStage::Created,
            PipelineStage::Validating,
            PipelineStage::Converting,
            PipelineStage::Watermarking,
            PipelineStage::Merging,
            PipelineStage::Encrypting,
            PipelineStage::Done,
        ]
    );
}
