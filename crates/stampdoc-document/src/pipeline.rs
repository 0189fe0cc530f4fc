// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document pipeline — validate, normalise, watermark, merge, encrypt.
//
// One `process()` call handles one request from start to finish on the
// calling thread. Every intermediate lives in a request-scoped workspace that
// is removed when the call returns, successful or not; only the encrypted
// final document survives.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use sha2::{Digest, Sha256};
use stampdoc_core::error::{Result, StampdocError};
use stampdoc_core::{
    DocumentCategory, FinalDocument, PageArtifact, PipelineConfig, PipelineStage, RequestId, SourceFile,
};
use tracing::{debug, info, info_span, instrument, warn};

use crate::convert::{DocumentConverter, FormatConverter, OfficeConverter};
use crate::paths;
use crate::pdf::{self, PageCompositor};
use crate::watermark::{WatermarkFont, WatermarkRenderer};
use crate::workspace::RequestWorkspace;

/// Callback notified of every stage transition of a request.
pub type StageObserver = Arc<dyn Fn(RequestId, PipelineStage) + Send + Sync>;

/// One batch of uploads to turn into a single protected PDF.
///
/// Clones share the cancellation flag.
#[derive(Clone)]
pub struct DocumentRequest {
    /// Staged input files, in the order their pages should appear.
    pub files: Vec<PathBuf>,
    pub password: String,
    pub watermark: String,
    cancelled: Arc<AtomicBool>,
}

impl DocumentRequest {
    pub fn new(files: Vec<PathBuf>, password: impl Into<String>, watermark: impl Into<String>) -> Self {
        Self {
            files,
            password: password.into(),
            watermark: watermark.into(),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that, once set, stops this request at the next file boundary
    /// with `Cancelled`. Other requests are unaffected.
    pub fn cancellation_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for DocumentRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentRequest")
            .field("files", &self.files)
            .field("password", &"<redacted>")
            .field("watermark", &self.watermark)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// An input after format normalisation.
enum Normalised {
    /// A PDF ready for per-page compositing.
    Pdf { index: usize, path: PathBuf, converted: bool },
    /// A raster image, watermarked before it is embedded.
    Image { index: usize, path: PathBuf },
}

/// Lowercase SHA-256 hex digest of `data`.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Orchestrates a request through every stage.
pub struct DocumentPipeline {
    config: PipelineConfig,
    renderer: WatermarkRenderer,
    converter: FormatConverter,
    compositor: PageCompositor,
    observer: Option<StageObserver>,
}

impl DocumentPipeline {
    /// Build a pipeline with the configured (or a system) font and the office
    /// suite as the DOCX converter.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let font = WatermarkFont::locate(config.font_path.as_deref())?;
        let office = OfficeConverter::from_config(&config.converter);
        info!(program = %office.program().display(), "Pipeline ready");
        Ok(Self::with_parts(config, Arc::new(font), Arc::new(office)))
    }

    /// Build a pipeline from explicit parts.
    pub fn with_parts(config: PipelineConfig, font: Arc<WatermarkFont>, documents: Arc<dyn DocumentConverter>) -> Self {
        let renderer = WatermarkRenderer::new(font);
        Self {
            converter: FormatConverter::new(config.paper_size, config.image_fit, documents),
            compositor: PageCompositor::new(renderer.clone()),
            renderer,
            config,
            observer: None,
        }
    }

    /// Register a stage observer.
    pub fn on_stage(mut self, observer: impl Fn(RequestId, PipelineStage) + Send + Sync + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Check every file's extension. The first unsupported one fails the
    /// whole batch.
    pub fn validate_all(files: &[PathBuf]) -> Result<Vec<SourceFile>> {
        if files.is_empty() {
            return Err(StampdocError::NoInputs);
        }
        files
            .iter()
            .map(|path| {
                let extension = paths::extension(path).to_lowercase();
                DocumentCategory::from_extension(&extension)
                    .map(|category| SourceFile {
                        path: path.clone(),
                        category,
                    })
                    .ok_or(StampdocError::UnsupportedFormat(extension))
            })
            .collect()
    }

    /// Run `request` to completion and return the protected document.
    pub fn process(&self, request: &DocumentRequest) -> Result<FinalDocument> {
        let id = RequestId::new();
        let span = info_span!("process", request = %id, files = request.files.len());
        let _entered = span.enter();

        self.report(id, PipelineStage::Created);
        let output = self.config.output_dir.join(paths::unique_document_name());

        match self.run(id, request, &output) {
            Ok(document) => {
                self.report(id, PipelineStage::Done);
                info!(file = %document.file_name, pages = document.page_count, "Request complete");
                Ok(document)
            }
            Err(err) => {
                // Never leave an unencrypted or half-written result behind.
                if output.exists()
                    && let Err(cleanup_err) = paths::delete(&output)
                {
                    warn!(%cleanup_err, "Could not remove partial output");
                }
                self.report(id, PipelineStage::Failed);
                warn!(%err, "Request failed");
                Err(err)
            }
        }
    }

    fn run(&self, id: RequestId, request: &DocumentRequest, output: &Path) -> Result<FinalDocument> {
        self.report(id, PipelineStage::Validating);
        let sources = Self::validate_all(&request.files)?;
        if request.password.is_empty() {
            warn!("Empty password: the document will open without one");
        }
        std::fs::create_dir_all(&self.config.output_dir)?;
        let workspace = RequestWorkspace::create(&self.config.work_dir, id)?;

        self.report(id, PipelineStage::Converting);
        let normalised = sources
            .iter()
            .enumerate()
            .map(|(index, source)| {
                Self::check_cancelled(request)?;
                self.normalise(&workspace, index, source)
            })
            .collect::<Result<Vec<_>>>()?;

        self.report(id, PipelineStage::Watermarking);
        let artifacts = normalised
            .iter()
            .map(|item| {
                Self::check_cancelled(request)?;
                self.watermark(&workspace, &request.watermark, item)
            })
            .collect::<Result<Vec<PageArtifact>>>()?;
        debug_assert_eq!(artifacts.len(), request.files.len());

        Self::check_cancelled(request)?;
        self.report(id, PipelineStage::Merging);
        let page_count = self.merge_pages(&artifacts, output)?;

        self.report(id, PipelineStage::Encrypting);
        self.encrypt(output, &request.password)?;

        let mut intermediates: Vec<PathBuf> = artifacts.iter().map(|artifact| artifact.path.clone()).collect();
        intermediates.extend(normalised.iter().filter_map(|item| match item {
            Normalised::Pdf {
                path, converted: true, ..
            } => Some(path.clone()),
            _ => None,
        }));
        workspace.cleanup(&intermediates)?;

        let bytes = std::fs::read(output)?;
        Ok(FinalDocument {
            path: output.to_path_buf(),
            file_name: paths::filename(output),
            page_count,
            sha256: hash_bytes(&bytes),
            created_at: Utc::now(),
        })
    }

    /// Bring one input into a form the watermark stage understands.
    #[instrument(skip(self, workspace, source), fields(file = %paths::filename(&source.path)))]
    fn normalise(&self, workspace: &RequestWorkspace, index: usize, source: &SourceFile) -> Result<Normalised> {
        Ok(match source.category {
            DocumentCategory::Pdf => Normalised::Pdf {
                index,
                path: source.path.clone(),
                converted: false,
            },
            DocumentCategory::Docx => {
                let out_dir = workspace.subdir(index, "convert")?;
                let path = self.converter.docx_to_pdf(&source.path, &out_dir)?;
                Normalised::Pdf {
                    index,
                    path,
                    converted: true,
                }
            }
            DocumentCategory::Image => Normalised::Image {
                index,
                path: source.path.clone(),
            },
        })
    }

    /// Produce the watermarked PDF for one normalised input.
    fn watermark(&self, workspace: &RequestWorkspace, text: &str, item: &Normalised) -> Result<PageArtifact> {
        match item {
            Normalised::Image { index, path } => {
                let stem = paths::filename_no_ext(path);
                let stamped = workspace.artifact(*index, &format!("watermark_{stem}.jpeg"));
                self.renderer.watermark_image(text, path, &stamped)?;

                let pdf_path = workspace.artifact(*index, &format!("{stem}.pdf"));
                self.converter.image_to_pdf(&stamped, &pdf_path)?;
                paths::delete(&stamped)?;
                Ok(PageArtifact {
                    index: *index,
                    path: pdf_path,
                    page_count: 1,
                })
            }
            Normalised::Pdf {
                index,
                path,
                converted,
            } => {
                let output = if *converted {
                    paths::with_prefix(path, "watermark")
                } else {
                    workspace.artifact(*index, &format!("watermark_{}", paths::filename(path)))
                };
                let scratch = workspace.subdir(*index, "pages")?;
                let composited = self.compositor.composite(path, text, &scratch, &output)?;
                Ok(PageArtifact {
                    index: *index,
                    path: composited.path,
                    page_count: composited.page_count,
                })
            }
        }
    }

    /// Concatenate the artifacts, in order, into `output`.
    pub fn merge_pages(&self, artifacts: &[PageArtifact], output: &Path) -> Result<usize> {
        let inputs: Vec<&Path> = artifacts.iter().map(|artifact| artifact.path.as_path()).collect();
        let page_count = pdf::merge_files(&inputs, output)?;
        let expected: usize = artifacts.iter().map(|artifact| artifact.page_count).sum();
        if page_count != expected {
            warn!(page_count, expected, "Merged page count differs from artifacts");
        }
        Ok(page_count)
    }

    /// Protect `path` with `password`, in place.
    pub fn encrypt(&self, path: &Path, password: &str) -> Result<()> {
        pdf::encrypt_in_place(path, password)
    }

    fn check_cancelled(request: &DocumentRequest) -> Result<()> {
        if request.is_cancelled() {
            return Err(StampdocError::Cancelled);
        }
        Ok(())
    }

    fn report(&self, id: RequestId, stage: PipelineStage) {
        debug!(request = %id, ?stage, "Stage");
        if let Some(observer) = &self.observer {
            observer(id, stage);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn accepts_known_extensions_in_any_case() {
        let sources = DocumentPipeline::validate_all(&files(&["one.pdf", "two.docx", "three.JPEG", "four.png"])).unwrap();
        let categories: Vec<_> = sources.iter().map(|s| s.category).collect();
        assert_eq!(
            categories,
            vec![
                DocumentCategory::Pdf,
                DocumentCategory::Docx,
                DocumentCategory::Image,
                DocumentCategory::Image
            ]
        );
    }

    #[test]
    fn first_unsupported_extension_fails_the_batch() {
        let err = DocumentPipeline::validate_all(&files(&["ok.pdf", "old.DOC", "x.bmp"])).unwrap_err();
        match err {
            StampdocError::UnsupportedFormat(ext) => assert_eq!(ext, ".doc"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            DocumentPipeline::validate_all(&files(&["noext"])).unwrap_err().to_string(),
            " is not a valid format"
        );
    }

    #[test]
    fn empty_batch_is_rejected() {
        assert!(matches!(DocumentPipeline::validate_all(&[]), Err(StampdocError::NoInputs)));
    }

    #[test]
    fn request_debug_hides_password() {
        let request = DocumentRequest::new(files(&["a.pdf"]), "hunter2", "DRAFT");
        let printed = format!("{request:?}");
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("DRAFT"));
    }

    #[test]
    fn clones_share_the_cancellation_flag() {
        let request = DocumentRequest::new(files(&["a.pdf"]), "pw", "X");
        let clone = request.clone();
        let fresh = DocumentRequest::new(files(&["a.pdf"]), "pw", "X");

        request.cancellation_flag().store(true, Ordering::Relaxed);
        assert!(clone.is_cancelled());
        assert!(!fresh.is_cancelled());
        assert!(matches!(
            DocumentPipeline::check_cancelled(&clone),
            Err(StampdocError::Cancelled)
        ));
        assert!(DocumentPipeline::check_cancelled(&fresh).is_ok());
    }

    #[test]
    fn hash_is_lowercase_hex_sha256() {
        assert_eq!(
            hash_bytes(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
