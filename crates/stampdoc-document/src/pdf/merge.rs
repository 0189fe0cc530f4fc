// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Concatenate PDFs into a fresh document, preserving input order.

use std::path::Path;

use lopdf::{Document, Object, dictionary};
use stampdoc_core::error::{Result, StampdocError};
use tracing::{debug, info, instrument};

use super::reader::{ObjectImporter, PdfReader};

/// PDF version written for merged documents.
const MERGED_VERSION: &str = "1.7";

/// Accumulates pages from several documents into one.
pub struct PdfMerger {
    target: Document,
    pages_id: lopdf::ObjectId,
    kids: Vec<Object>,
}

impl Default for PdfMerger {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfMerger {
    pub fn new() -> Self {
        let mut target = Document::with_version(MERGED_VERSION);
        let pages_id = target.new_object_id();
        Self {
            target,
            pages_id,
            kids: Vec::new(),
        }
    }

    /// Pages appended so far.
    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Append every page of `source`, in order.
    pub fn append(&mut self, source: &Document) -> Result<usize> {
        let mut importer = ObjectImporter::new(source);
        let pages = source.get_pages();
        for page_id in pages.values() {
            let copied = importer.import_page(&mut self.target, *page_id, self.pages_id)?;
            self.kids.push(Object::Reference(copied));
        }
        debug!(
            pages = pages.len(),
            objects = importer.imported_count(),
            "Document appended"
        );
        Ok(pages.len())
    }

    /// Close the page tree and hand back the merged document.
    pub fn finish(mut self) -> Result<Document> {
        if self.kids.is_empty() {
            return Err(StampdocError::MergeError("nothing to merge".into()));
        }
        let count = self.kids.len() as i64;
        self.target.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => self.kids,
                "Count" => count,
            }),
        );
        let catalog_id = self.target.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.target.trailer.set("Root", catalog_id);
        Ok(self.target)
    }
}

/// Merge the PDFs at `inputs`, in order, into `output`. Returns the number of
/// pages written.
#[instrument(skip_all, fields(inputs = inputs.len(), output = %output.display()))]
pub fn merge_files<P: AsRef<Path>>(inputs: &[P], output: &Path) -> Result<usize> {
    info!("Merging PDFs");
    let mut merger = PdfMerger::new();
    for input in inputs {
        let reader = PdfReader::open(input)?;
        merger.append(reader.document())?;
    }

    let page_count = merger.page_count();
    let mut merged = merger.finish()?;
    merged.save(output).map_err(|err| {
        StampdocError::MergeError(format!("failed to write {}: {}", output.display(), err))
    })?;

    info!(page_count, "Merge complete");
    Ok(page_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::reader::tests::{sample_document, save_sample};

    #[test]
    fn pages_follow_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = save_sample(sample_document(2, 595, 842, Some("alpha")), dir.path(), "a.pdf");
        let b = save_sample(sample_document(1, 612, 792, Some("beta")), dir.path(), "b.pdf");
        let output = dir.path().join("merged.pdf");

        let count = merge_files(&[&a, &b], &output).unwrap();
        assert_eq!(count, 3);

        let merged = Document::load(&output).unwrap();
        assert_eq!(merged.get_pages().len(), 3);
        let text = |n| merged.extract_text(&[n]).unwrap();
        assert!(text(1).contains("alpha 0"));
        assert!(text(2).contains("alpha 1"));
        assert!(text(3).contains("beta 0"));
    }

    #[test]
    fn inherited_page_sizes_survive_merge() {
        let dir = tempfile::tempdir().unwrap();
        let a = save_sample(sample_document(1, 300, 400, None), dir.path(), "a.pdf");
        let b = save_sample(sample_document(1, 500, 200, None), dir.path(), "b.pdf");
        let output = dir.path().join("merged.pdf");
        merge_files(&[a, b], &output).unwrap();

        let reader = PdfReader::open(&output).unwrap();
        let sizes: Vec<_> = reader.page_ids().into_iter().map(|id| reader.page_size(id)).collect();
        assert_eq!(sizes, vec![(300.0, 400.0), (500.0, 200.0)]);
    }

    #[test]
    fn malformed_input_is_a_merge_error() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.pdf");
        std::fs::write(&bad, b"%PDF-1.4 truncated").unwrap();
        let result = merge_files(&[bad], &dir.path().join("out.pdf"));
        assert!(matches!(result, Err(StampdocError::MergeError(_))));
    }

    #[test]
    fn empty_merge_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let none: [&Path; 0] = [];
        let result = merge_files(&none, &dir.path().join("out.pdf"));
        assert!(matches!(result, Err(StampdocError::MergeError(_))));
    }
}
