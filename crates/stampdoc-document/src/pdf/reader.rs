// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — open and inspect existing PDFs, and copy object graphs
// between documents, using the `lopdf` crate.

use std::collections::BTreeMap;
use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId};
use stampdoc_core::error::{Result, StampdocError};
use tracing::{debug, info, instrument, warn};

/// Page attributes a page may inherit from its ancestors in the page tree.
pub const INHERITABLE_ATTRIBUTES: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Page size assumed when neither the page nor its ancestors carry a media box.
pub const FALLBACK_PAGE_SIZE: (f32, f32) = (612.0, 792.0);

/// Upper bound on page tree depth, guarding against /Parent cycles.
const MAX_TREE_DEPTH: usize = 64;

/// Reads an existing PDF file.
pub struct PdfReader {
    document: Document,
    /// Source path, if opened from a file (useful for diagnostics).
    source_path: Option<String>,
}

impl PdfReader {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        info!("Opening PDF: {}", path_ref.display());

        let document = Document::load(path_ref).map_err(|err| {
            StampdocError::MergeError(format!("failed to open {}: {}", path_ref.display(), err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded");

        Ok(Self {
            document,
            source_path: Some(path_ref.display().to_string()),
        })
    }

    /// Create a reader from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            StampdocError::MergeError(format!("failed to load PDF from memory: {}", err))
        })?;

        Ok(Self {
            document,
            source_path: None,
        })
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Return the source path if the reader was created via [`PdfReader::open`].
    pub fn source_path(&self) -> Option<&str> {
        self.source_path.as_deref()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    /// Page object ids in reading order.
    pub fn page_ids(&self) -> Vec<ObjectId> {
        self.document.get_pages().into_values().collect()
    }

    /// Width and height of a page in points, from its (possibly inherited)
    /// media box.
    pub fn page_size(&self, page_id: ObjectId) -> (f32, f32) {
        media_box(&self.document, page_id)
            .map(|[x1, y1, x2, y2]| ((x2 - x1).abs(), (y2 - y1).abs()))
            .unwrap_or_else(|| {
                warn!(?page_id, "Page has no usable media box, assuming Letter");
                FALLBACK_PAGE_SIZE
            })
    }

    /// Length of the text extractable from page `page_number` (1-indexed),
    /// ignoring surrounding whitespace. Pages whose text cannot be extracted
    /// count as having none.
    pub fn page_text_len(&self, page_number: u32) -> usize {
        match self.document.extract_text(&[page_number]) {
            Ok(text) => text.trim().len(),
            Err(err) => {
                warn!(page_number, %err, "Text probe failed, treating page as image-only");
                0
            }
        }
    }
}

/// Follow one level of indirection.
pub fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        other => other,
    }
}

/// Look `key` up on the page, then on each ancestor in turn.
pub fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// The page's media box as `[x1, y1, x2, y2]`.
pub fn media_box(doc: &Document, page_id: ObjectId) -> Option<[f32; 4]> {
    let value = inherited_attribute(doc, page_id, b"MediaBox")?;
    let items = resolve(doc, &value).as_array().ok()?;
    if items.len() != 4 {
        return None;
    }
    let mut corners = [0.0f32; 4];
    for (slot, item) in corners.iter_mut().zip(items) {
        *slot = resolve(doc, item).as_float().ok()?;
    }
    Some(corners)
}

/// Copies objects from one document into another.
///
/// Every source object is copied at most once; later references to it reuse
/// the copy. Ids are reserved before the object's children are visited, so
/// reference cycles terminate. `/Parent` entries are dropped; the caller
/// links copied pages into its own page tree.
pub struct ObjectImporter<'a> {
    source: &'a Document,
    imported: BTreeMap<ObjectId, ObjectId>,
}

impl<'a> ObjectImporter<'a> {
    pub fn new(source: &'a Document) -> Self {
        Self {
            source,
            imported: BTreeMap::new(),
        }
    }

    /// Number of distinct source objects copied so far.
    pub fn imported_count(&self) -> usize {
        self.imported.len()
    }

    /// Where `source_id` ended up in the target, if it was copied.
    pub fn imported_id(&self, source_id: ObjectId) -> Option<ObjectId> {
        self.imported.get(&source_id).copied()
    }

    /// Treat `source_id` as already present in the target under `target_id`.
    pub fn alias(&mut self, source_id: ObjectId, target_id: ObjectId) {
        self.imported.insert(source_id, target_id);
    }

    /// Copy the object `id` and everything it references into `target`.
    pub fn import_id(&mut self, target: &mut Document, id: ObjectId) -> ObjectId {
        if let Some(&existing) = self.imported.get(&id) {
            return existing;
        }
        let new_id = target.new_object_id();
        self.imported.insert(id, new_id);

        let copy = match self.source.get_object(id) {
            Ok(object) => self.import_object(target, object),
            Err(err) => {
                warn!(?id, %err, "Cannot resolve reference, using Null");
                Object::Null
            }
        };
        target.objects.insert(new_id, copy);
        new_id
    }

    /// Copy an inline object, importing whatever it references.
    pub fn import_object(&mut self, target: &mut Document, object: &Object) -> Object {
        match object {
            Object::Reference(id) => Object::Reference(self.import_id(target, *id)),
            Object::Dictionary(dict) => Object::Dictionary(self.import_dictionary(target, dict)),
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.import_object(target, item))
                    .collect(),
            ),
            Object::Stream(stream) => {
                // Content bytes stay encoded; the copied dictionary keeps the
                // filters that describe them.
                let mut copy = stream.clone();
                copy.dict = self.import_dictionary(target, &stream.dict);
                Object::Stream(copy)
            }
            other => other.clone(),
        }
    }

    pub fn import_dictionary(&mut self, target: &mut Document, dict: &Dictionary) -> Dictionary {
        let mut copy = Dictionary::new();
        for (key, value) in dict.iter() {
            if key.as_slice() == b"Parent" {
                continue;
            }
            copy.set(key.clone(), self.import_object(target, value));
        }
        copy
    }

    /// Copy a page into `target` under `parent`, flattening inherited
    /// attributes onto the copy.
    pub fn import_page(&mut self, target: &mut Document, page_id: ObjectId, parent: ObjectId) -> Result<ObjectId> {
        let page = self.source.get_dictionary(page_id).map_err(|err| {
            StampdocError::MergeError(format!("cannot read page object {:?}: {}", page_id, err))
        })?;

        // Reserve first: annotations point back at their page.
        let new_id = match self.imported.get(&page_id) {
            Some(&existing) => existing,
            None => {
                let id = target.new_object_id();
                self.imported.insert(page_id, id);
                id
            }
        };

        let mut copy = self.import_dictionary(target, page);
        for key in INHERITABLE_ATTRIBUTES {
            if copy.has(key) {
                continue;
            }
            if let Some(value) = inherited_attribute(self.source, page_id, key) {
                let imported = self.import_object(target, &value);
                copy.set(key.to_vec(), imported);
            }
        }
        copy.set("Parent", Object::Reference(parent));
        target.objects.insert(new_id, Object::Dictionary(copy));
        Ok(new_id)
    }
}
