// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stampdoc — watermark, merge, and password-protect a batch of documents.
//
// Entry point. Initialises logging, builds the pipeline from the config file
// and flags, runs one request, and prints the result as JSON on stdout.
// Failures are printed as a humanised JSON error on stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tracing::info;

use stampdoc_core::human_errors::{ErrorPayload, humanize_error};
use stampdoc_core::{BlobStore, LocalDirectoryStore, PipelineConfig, StampdocError};
use stampdoc_document::pdf::open_protected;
use stampdoc_document::{DocumentPipeline, DocumentRequest};

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "stampdoc", version, about)]
struct Cli {
    /// Input files (pdf, docx, png, jpg, jpeg) in the order their pages should appear.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Password protecting the finished document.
    #[arg(short, long, env = "STAMPDOC_PASSWORD", hide_env_values = true)]
    password: String,

    /// Text stamped on every page.
    #[arg(short, long)]
    watermark: String,

    /// JSON configuration file. Flags below override it.
    #[arg(short, long, env = "STAMPDOC_CONFIG")]
    config: Option<PathBuf>,

    /// Directory receiving the finished document.
    #[arg(short, long, env = "STAMPDOC_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Root for per-request scratch directories.
    #[arg(long, env = "STAMPDOC_WORK_DIR")]
    work_dir: Option<PathBuf>,

    /// Bold TrueType font for the watermark.
    #[arg(long, env = "STAMPDOC_FONT")]
    font: Option<PathBuf>,

    /// Office suite executable used for DOCX conversion.
    #[arg(long, env = "STAMPDOC_CONVERTER")]
    converter: Option<PathBuf>,

    /// Copy the finished document here and print its link.
    #[arg(long)]
    publish_dir: Option<PathBuf>,

    /// Base of the printed link when publishing.
    #[arg(long, default_value = "file://", requires = "publish_dir")]
    base_url: String,

    /// Reopen the result with the password before reporting success.
    #[arg(long)]
    verify: bool,
}

impl Cli {
    /// Settings from the config file (or defaults), overridden by flags.
    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => PipelineConfig::default(),
        };
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(dir) = &self.work_dir {
            config.work_dir = dir.clone();
        }
        if let Some(font) = &self.font {
            config.font_path = Some(font.clone());
        }
        if let Some(program) = &self.converter {
            config.converter.program = Some(program.clone());
        }
        config.validate()?;
        Ok(config)
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.pipeline_config()?;
    let pipeline = DocumentPipeline::new(config)?;

    let request = DocumentRequest::new(cli.files.clone(), cli.password.clone(), cli.watermark.clone());
    let document = pipeline.process(&request)?;

    if cli.verify {
        let opened = open_protected(&document.path, &cli.password)?;
        anyhow::ensure!(
            opened.get_pages().len() == document.page_count,
            "verification found {} pages, expected {}",
            opened.get_pages().len(),
            document.page_count
        );
        info!("Verified");
    }

    let url = match &cli.publish_dir {
        Some(dir) => {
            let store = LocalDirectoryStore::new(dir, cli.base_url.clone());
            Some(store.store(&document.path, &document.file_name)?)
        }
        None => None,
    };

    println!("{}", json!({ "document": document, "url": url }));
    Ok(())
}

/// Print `err` for the person at the terminal: the humanised payload for
/// pipeline errors, the full chain otherwise.
fn report(err: &anyhow::Error) {
    tracing::debug!("{err:#}");
    match err.downcast_ref::<StampdocError>() {
        Some(domain) => {
            let payload: ErrorPayload = humanize_error(domain).into();
            match payload.to_json() {
                Ok(body) => eprintln!("{body}"),
                Err(_) => eprintln!("{}", payload.message),
            }
        }
        None => eprintln!("error: {err:#}"),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}
