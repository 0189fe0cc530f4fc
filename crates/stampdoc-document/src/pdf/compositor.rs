// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page compositing — lay a watermark page over (or under) every page of a PDF.
//
// Each page gets its own watermark, rendered at the page's media box size,
// imported as a Form XObject and drawn either after the page content
// (`Stamp`) or before it (`Underlay`). Pages with a text layer get the
// underlay so the watermark does not cover selectable text.

use std::path::{Path, PathBuf};

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use stampdoc_core::error::{Result, StampdocError};
use stampdoc_core::{Canvas, CompositeMode, WatermarkSpec};
use tracing::{debug, info, instrument, warn};

use super::reader::{ObjectImporter, PdfReader, inherited_attribute, media_box, resolve};
use crate::paths;
use crate::watermark::WatermarkRenderer;
use crate::watermark::pdf::FONT_RESOURCE;

/// Base name of the watermark form inside a page's XObject resources.
const FORM_NAME: &str = "StampdocWm";

/// Result of compositing one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositedDocument {
    pub path: PathBuf,
    pub page_count: usize,
    /// Stacking order chosen for each page, in page order.
    pub modes: Vec<CompositeMode>,
}

/// Everything needed about a source page before the document is modified.
struct PagePlan {
    number: u32,
    id: ObjectId,
    origin: (f32, f32),
    canvas: Canvas,
    mode: CompositeMode,
}

/// Applies per-page watermarks to existing PDFs.
#[derive(Debug, Clone)]
pub struct PageCompositor {
    renderer: WatermarkRenderer,
}

impl PageCompositor {
    pub fn new(renderer: WatermarkRenderer) -> Self {
        Self { renderer }
    }

    /// Watermark every page of `source` and save the result to `output`.
    /// Per-page watermark files are written to `scratch_dir` and removed as
    /// soon as they are merged.
    #[instrument(skip(self, text), fields(source = %source.display()))]
    pub fn composite(&self, source: &Path, text: &str, scratch_dir: &Path, output: &Path) -> Result<CompositedDocument> {
        let reader = PdfReader::open(source)?;
        let plans = plan_pages(&reader);
        let mut doc = reader.into_document();
        info!(pages = plans.len(), "Compositing watermark");

        // The watermark font is identical for every page: import it once.
        let mut shared_font: Option<ObjectId> = None;

        for plan in &plans {
            let target = scratch_dir.join(format!("watermark_page_{:04}", plan.number));
            let rendered = self
                .renderer
                .render(&WatermarkSpec::new(text, plan.canvas), &target)?;

            let watermark = Document::load(&rendered.path).map_err(|err| {
                StampdocError::RenderError(format!("cannot reopen watermark page: {err}"))
            })?;
            let form_id = import_as_form(&watermark, &mut doc, plan, &mut shared_font)?;
            attach_form(&mut doc, plan, form_id)?;
            paths::delete(&rendered.path)?;

            debug!(page = plan.number, mode = ?plan.mode, canvas = ?plan.canvas, "Page watermarked");
        }

        doc.save(output).map_err(|err| {
            StampdocError::MergeError(format!("failed to write {}: {}", output.display(), err))
        })?;

        Ok(CompositedDocument {
            path: output.to_path_buf(),
            page_count: plans.len(),
            modes: plans.iter().map(|plan| plan.mode).collect(),
        })
    }
}

fn plan_pages(reader: &PdfReader) -> Vec<PagePlan> {
    reader
        .document()
        .get_pages()
        .into_iter()
        .map(|(number, id)| {
            let (width, height) = reader.page_size(id);
            let origin = media_box(reader.document(), id)
                .map(|[x1, y1, x2, y2]| (x1.min(x2), y1.min(y2)))
                .unwrap_or((0.0, 0.0));
            PagePlan {
                number,
                id,
                origin,
                canvas: Canvas::from_media_box(width, height),
                mode: CompositeMode::for_extracted_text(reader.page_text_len(number)),
            }
        })
        .collect()
}

/// Id of the embedded font inside a rendered watermark page.
fn watermark_font_id(watermark: &Document, page_id: ObjectId) -> Option<ObjectId> {
    let resources = watermark.get_dictionary(page_id).ok()?.get(b"Resources").ok()?;
    let fonts = resolve(watermark, resources).as_dict().ok()?.get(b"Font").ok()?;
    resolve(watermark, fonts)
        .as_dict()
        .ok()?
        .get(FONT_RESOURCE.as_bytes())
        .and_then(Object::as_reference)
        .ok()
}

/// Copy the single page of `watermark` into `doc` as a Form XObject.
fn import_as_form(
    watermark: &Document,
    doc: &mut Document,
    plan: &PagePlan,
    shared_font: &mut Option<ObjectId>,
) -> Result<ObjectId> {
    let page_id = watermark
        .get_pages()
        .into_values()
        .next()
        .ok_or_else(|| StampdocError::RenderError("watermark has no page".into()))?;
    let content = watermark
        .get_page_content(page_id)
        .map_err(|err| StampdocError::RenderError(format!("cannot read watermark content: {err}")))?;

    let mut importer = ObjectImporter::new(watermark);
    let font_id = watermark_font_id(watermark, page_id);
    if let (Some(source_font), Some(existing)) = (font_id, *shared_font) {
        importer.alias(source_font, existing);
    }

    let resources = inherited_attribute(watermark, page_id, b"Resources")
        .map(|value| importer.import_object(doc, &value))
        .unwrap_or_else(|| Object::Dictionary(Dictionary::new()));

    if shared_font.is_none() {
        *shared_font = font_id.and_then(|id| importer.imported_id(id));
    }

    let (width, height) = (plan.canvas.width() as i64, plan.canvas.height() as i64);
    let mut form = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Form",
        "BBox" => vec![0.into(), 0.into(), width.into(), height.into()],
        "Resources" => resources,
    };
    // Watermarks are drawn from (0, 0); follow pages whose box starts elsewhere.
    if plan.origin != (0.0, 0.0) {
        form.set(
            "Matrix",
            vec![
                1.into(),
                0.into(),
                0.into(),
                1.into(),
                plan.origin.0.into(),
                plan.origin.1.into(),
            ],
        );
    }

    let mut stream = Stream::new(form, content);
    if let Err(err) = stream.compress() {
        warn!(%err, "Watermark form left uncompressed");
    }
    Ok(doc.add_object(stream))
}

/// Resources dictionary owned by this page alone, resolving inheritance and
/// indirection, so later edits do not leak into pages that shared it.
fn page_local_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    inherited_attribute(doc, page_id, b"Resources")
        .and_then(|value| resolve(doc, &value).as_dict().ok().cloned())
        .unwrap_or_else(Dictionary::new)
}

/// A name for the form not already used by the page's XObjects.
fn free_form_name(xobjects: &Dictionary) -> String {
    let mut name = FORM_NAME.to_string();
    let mut suffix = 1;
    while xobjects.has(name.as_bytes()) {
        suffix += 1;
        name = format!("{FORM_NAME}{suffix}");
    }
    name
}

/// The page's existing content streams, as a list of objects.
fn content_streams(doc: &Document, page: &Dictionary) -> Vec<Object> {
    match page.get(b"Contents") {
        Ok(Object::Array(items)) => items.clone(),
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(other) => {
            warn!("Unexpected /Contents entry, keeping it as is");
            vec![other.clone()]
        }
        Err(_) => Vec::new(),
    }
}

/// Add a content stream holding `operations`. Readers concatenate a page's
/// streams byte for byte, so the stream is padded with newlines to keep its
/// first and last tokens apart from its neighbours.
fn operations_stream(doc: &mut Document, operations: Vec<Operation>) -> Result<Object> {
    let encoded = Content { operations }
        .encode()
        .map_err(|err| StampdocError::RenderError(format!("cannot encode page content: {err}")))?;
    let mut bytes = Vec::with_capacity(encoded.len() + 2);
    bytes.push(b'\n');
    bytes.extend_from_slice(&encoded);
    bytes.push(b'\n');
    Ok(Object::Reference(doc.add_object(Stream::new(dictionary! {}, bytes))))
}

fn draw_form(name: &str) -> Vec<Operation> {
    vec![
        Operation::new("q", vec![]),
        Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]),
        Operation::new("Q", vec![]),
    ]
}

/// Reference the form from the page's resources and draw it in the order the
/// plan asks for. The media box is left untouched.
fn attach_form(doc: &mut Document, plan: &PagePlan, form_id: ObjectId) -> Result<()> {
    let page = doc
        .get_dictionary(plan.id)
        .map_err(|err| StampdocError::MergeError(format!("cannot read page {}: {}", plan.number, err)))?
        .clone();

    let mut resources = page_local_resources(doc, plan.id);
    let mut xobjects = resources
        .get(b"XObject")
        .ok()
        .and_then(|value| resolve(doc, value).as_dict().ok().cloned())
        .unwrap_or_else(Dictionary::new);
    let name = free_form_name(&xobjects);
    xobjects.set(name.clone(), Object::Reference(form_id));
    resources.set("XObject", Object::Dictionary(xobjects));

    let original = content_streams(doc, &page);
    let contents = match plan.mode {
        CompositeMode::Stamp => {
            // Isolate the page's graphics state from the watermark.
            let open = operations_stream(doc, vec![Operation::new("q", vec![])])?;
            let mut close = vec![Operation::new("Q", vec![])];
            close.extend(draw_form(&name));
            let close = operations_stream(doc, close)?;

            let mut contents = Vec::with_capacity(original.len() + 2);
            contents.push(open);
            contents.extend(original);
            contents.push(close);
            contents
        }
        CompositeMode::Underlay => {
            let under = operations_stream(doc, draw_form(&name))?;
            let mut contents = Vec::with_capacity(original.len() + 1);
            contents.push(under);
            contents.extend(original);
            contents
        }
    };

    let page = doc
        .get_dictionary_mut(plan.id)
        .map_err(|err| StampdocError::MergeError(format!("cannot update page {}: {}", plan.number, err)))?;
    page.set("Resources", Object::Dictionary(resources));
    page.set("Contents", Object::Array(contents));
    Ok(())
}
