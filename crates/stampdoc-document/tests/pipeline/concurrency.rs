// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Requests sharing one pipeline from several threads.

use std::collections::HashSet;

use stampdoc_document::DocumentRequest;
use stampdoc_document::pdf::open_protected;

use crate::common;

#[test]
fn parallel_requests_with_identical_inputs_stay_apart() {
    let font = common::test_font();
    let root = tempfile::tempdir().unwrap();
    let pipeline = common::pipeline(root.path(), font);
    let pipeline = &pipeline;

    let requests: Vec<DocumentRequest> = (0..4)
        .map(|n| {
            let uploads = root.path().join(format!("uploads-{n}"));
            let pdf = common::write_text_pdf(&uploads, "report.pdf", 1, &format!("request {n}"));
            let photo = common::write_jpeg(&uploads, "photo.jpg", 640, 480);
            DocumentRequest::new(vec![pdf, photo], format!("pw-{n}"), "SHARED")
        })
        .collect();

    let documents: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = requests
            .iter()
            .map(|request| scope.spawn(move || pipeline.process(request)))
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap().unwrap()).collect()
    });

    let names: HashSet<_> = documents.iter().map(|doc| doc.file_name.clone()).collect();
    assert_eq!(names.len(), 4);
    for (n, document) in documents.iter().enumerate() {
        assert_eq!(document.page_count, 2);
        let opened = open_protected(&document.path, &format!("pw-{n}")).unwrap();
        assert!(opened.extract_text(&[1]).unwrap().contains(&format!("request {n}")));
    }
    assert!(common::entries(&root.path().join("work")).is_empty());
}
