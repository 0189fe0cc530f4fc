// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Format normalisation — everything becomes PDF before watermarking and
// merging.
//
// Raster images are embedded as a single page with `printpdf`. Word
// documents are handed to an external office suite through the
// `DocumentConverter` seam, so tests (and other deployments) can swap the
// subprocess for something else.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Arc, mpsc};
use std::time::{Duration, Instant};

use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use stampdoc_core::error::{Result, StampdocError};
use stampdoc_core::{ConverterConfig, ImageFit, PaperSize};
use tracing::{debug, info, instrument, warn};

use crate::paths;

/// How often a running conversion is polled for completion.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Converts a word-processor document into PDF.
pub trait DocumentConverter: Send + Sync {
    /// Convert `input` and return the path of the PDF written into `out_dir`.
    fn convert(&self, input: &Path, out_dir: &Path) -> Result<PathBuf>;
}

/// `DocumentConverter` backed by a LibreOffice (`soffice`) subprocess.
#[derive(Debug, Clone)]
pub struct OfficeConverter {
    program: PathBuf,
    timeout: Duration,
}

impl OfficeConverter {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn from_config(config: &ConverterConfig) -> Self {
        let program = config
            .program
            .clone()
            .unwrap_or_else(Self::default_program);
        Self::new(program, Duration::from_secs(config.timeout_secs))
    }

    /// Where the office suite usually lives on this platform.
    pub fn default_program() -> PathBuf {
        if cfg!(target_os = "macos") {
            PathBuf::from("/Applications/LibreOffice.app/Contents/MacOS/soffice")
        } else if cfg!(target_os = "linux") {
            PathBuf::from("libreoffice")
        } else {
            PathBuf::from("soffice")
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// The converter prints nothing useful; the output location follows from
    /// the input name.
    pub fn expected_output(input: &Path, out_dir: &Path) -> PathBuf {
        out_dir.join(format!("{}.pdf", paths::filename_no_ext(input)))
    }
}

/// Wait for `child` until `deadline`. `None` means it is still running.
fn wait_until(child: &mut Child, deadline: Instant) -> Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// Start the converter in a process group of its own, so a timeout can take
/// down the helpers it forks (`oosplash` and `soffice.bin`) with it.
fn spawn_in_own_group(command: &mut Command) -> std::io::Result<Child> {
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    command.spawn()
}

/// Kill `child` and everything in its process group, then reap it.
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        let group = format!("-{}", child.id());
        match Command::new("kill")
            .args(["-KILL", "--", group.as_str()])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(status) if status.success() => {}
            Ok(status) => debug!(%status, "Group kill failed, killing the converter alone"),
            Err(err) => debug!(%err, "Group kill unavailable, killing the converter alone"),
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

impl DocumentConverter for OfficeConverter {
    #[instrument(skip(self), fields(program = %self.program.display()))]
    fn convert(&self, input: &Path, out_dir: &Path) -> Result<PathBuf> {
        // A private profile per output directory; concurrent soffice
        // instances sharing one profile block each other.
        let profile = std::path::absolute(out_dir.join("office-profile"))?;

        info!(input = %input.display(), "Converting document to PDF");
        let deadline = Instant::now() + self.timeout;
        let mut command = Command::new(&self.program);
        command
            .arg(format!("-env:UserInstallation=file://{}", profile.display()))
            .args(["--headless", "--convert-to", "pdf", "--outdir"])
            .arg(out_dir)
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        let mut child = spawn_in_own_group(&mut command).map_err(|err| {
            StampdocError::ConversionError(format!("cannot start {}: {}", self.program.display(), err))
        })?;

        // Drain stderr on its own thread so a chatty converter cannot fill the
        // pipe. The pipe stays open while any forked helper lives, so the
        // result is collected with a deadline instead of a join.
        let stderr = child.stderr.take();
        let (sender, receiver) = mpsc::channel();
        std::thread::spawn(move || {
            let mut captured = String::new();
            if let Some(mut pipe) = stderr {
                let _ = pipe.read_to_string(&mut captured);
            }
            let _ = sender.send(captured);
        });

        let Some(status) = wait_until(&mut child, deadline)? else {
            warn!(timeout = ?self.timeout, "Converter timed out, killing it");
            terminate(&mut child);
            return Err(StampdocError::ConversionTimeout {
                secs: self.timeout.as_secs().max(1),
            });
        };

        let remaining = deadline.saturating_duration_since(Instant::now()).max(POLL_INTERVAL);
        let errors = receiver.recv_timeout(remaining).unwrap_or_else(|_| {
            warn!("Converter helpers still hold stderr open, ignoring their output");
            String::new()
        });
        if !errors.trim().is_empty() {
            return Err(StampdocError::ConversionError(errors.trim().to_string()));
        }
        if !status.success() {
            return Err(StampdocError::ConversionError(format!(
                "converter exited with {status}"
            )));
        }

        let output = Self::expected_output(input, out_dir);
        if !output.is_file() {
            return Err(StampdocError::ConversionError(format!(
                "converter produced no {}",
                paths::filename(&output)
            )));
        }
        debug!(output = %output.display(), "Conversion complete");
        Ok(output)
    }
}

/// Placement of an image on a page, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePlacement {
    pub translate_x: f32,
    pub translate_y: f32,
    pub scale_x: f32,
    pub scale_y: f32,
}

/// Scale factors and offsets that put an image of `image_pt` size onto a
/// page of `page_pt` size.
pub fn image_placement(fit: ImageFit, image_pt: (f32, f32), page_pt: (f32, f32)) -> ImagePlacement {
    let (img_w, img_h) = (image_pt.0.max(1.0), image_pt.1.max(1.0));
    let (page_w, page_h) = page_pt;
    let scale_x = page_w / img_w;
    let scale_y = page_h / img_h;

    match fit {
        ImageFit::Stretch => ImagePlacement {
            translate_x: 0.0,
            translate_y: 0.0,
            scale_x,
            scale_y,
        },
        ImageFit::Contain => {
            let scale = scale_x.min(scale_y);
            ImagePlacement {
                translate_x: (page_w - img_w * scale) / 2.0,
                translate_y: (page_h - img_h * scale) / 2.0,
                scale_x: scale,
                scale_y: scale,
            }
        }
    }
}

/// Normalises supported inputs into PDF files.
#[derive(Clone)]
pub struct FormatConverter {
    paper_size: PaperSize,
    image_fit: ImageFit,
    documents: Arc<dyn DocumentConverter>,
}

impl FormatConverter {
    pub fn new(paper_size: PaperSize, image_fit: ImageFit, documents: Arc<dyn DocumentConverter>) -> Self {
        Self {
            paper_size,
            image_fit,
            documents,
        }
    }

    /// Paper dimensions in printpdf's Mm units.
    fn page_dimensions(&self) -> (Mm, Mm) {
        let (w_mm, h_mm) = self.paper_size.dimensions_mm();
        (Mm(w_mm as f32), Mm(h_mm as f32))
    }

    /// Embed the image at `image_path` as the only page of a new PDF.
    #[instrument(skip(self), fields(image = %image_path.display()))]
    pub fn image_to_pdf(&self, image_path: &Path, output: &Path) -> Result<PathBuf> {
        let (page_w, page_h) = self.page_dimensions();
        info!(paper = ?self.paper_size, fit = ?self.image_fit, "Converting image to PDF");

        let dynamic_image = image::open(image_path).map_err(|err| {
            StampdocError::ImageError(format!("failed to decode {}: {}", image_path.display(), err))
        })?;
        let img_width = dynamic_image.width() as usize;
        let img_height = dynamic_image.height() as usize;

        let rgb_image = dynamic_image.to_rgb8();
        let raw = RawImage {
            pixels: RawImageData::U8(rgb_image.into_raw()),
            width: img_width,
            height: img_height,
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        };

        let title = paths::filename_no_ext(image_path);
        let mut doc = PdfDocument::new(&title);
        let xobject_id = doc.add_image(&raw);

        // At 72 dpi one pixel is one point.
        let dpi: f32 = 72.0;
        let placement = image_placement(
            self.image_fit,
            (img_width as f32, img_height as f32),
            (page_w.into_pt().0, page_h.into_pt().0),
        );

        let ops = vec![Op::UseXobject {
            id: xobject_id,
            transform: XObjectTransform {
                translate_x: Some(Pt(placement.translate_x)),
                translate_y: Some(Pt(placement.translate_y)),
                scale_x: Some(placement.scale_x),
                scale_y: Some(placement.scale_y),
                dpi: Some(dpi),
                rotate: None,
            },
        }];
        doc.with_pages(vec![PdfPage::new(page_w, page_h, ops)]);

        debug!(?placement, "Image placed on page");

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
        std::fs::write(output, &bytes)?;
        Ok(output.to_path_buf())
    }

    /// Convert a word-processor document, writing into `out_dir`.
    pub fn docx_to_pdf(&self, input: &Path, out_dir: &Path) -> Result<PathBuf> {
        self.documents.convert(input, out_dir)
    }
}
