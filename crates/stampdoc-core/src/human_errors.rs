// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the boundary layer.
//
// Every pipeline error is mapped to plain English with a clear suggestion.
// Messages are fixed strings: file paths and tool output never reach the
// person who uploaded the documents.

use serde::Serialize;

use crate::error::StampdocError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Something on our side hiccupped; submitting again may work.
    Transient,
    /// The user must change what they submitted.
    ActionRequired,
    /// Cannot be fixed by retrying or by the user.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Stable machine-readable code.
    pub code: &'static str,
    /// Plain English summary.
    pub message: String,
    /// What the user should try.
    pub suggestion: String,
    /// Whether resubmitting the same request might succeed.
    pub retriable: bool,
    pub severity: Severity,
}

/// Structured error body returned to callers of the boundary layer.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub code: &'static str,
    pub message: String,
    pub suggestion: String,
    pub retriable: bool,
    pub severity: Severity,
}

impl From<HumanError> for ErrorPayload {
    fn from(human: HumanError) -> Self {
        Self {
            code: human.code,
            message: human.message,
            suggestion: human.suggestion,
            retriable: human.retriable,
            severity: human.severity,
        }
    }
}

impl ErrorPayload {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Convert a `StampdocError` into a `HumanError`.
pub fn humanize_error(err: &StampdocError) -> HumanError {
    match err {
        StampdocError::UnsupportedFormat(ext) => HumanError {
            code: "unsupported_format",
            message: "One of the files has a format we can't process.".into(),
            suggestion: format!(
                "Upload PDF, DOCX, PNG or JPEG files only. (File type: {})",
                sanitize_extension(ext)
            ),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        StampdocError::NoInputs => HumanError {
            code: "no_inputs",
            message: "No files were uploaded.".into(),
            suggestion: "Choose at least one document, then try again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        StampdocError::ConversionTimeout { .. } => HumanError {
            code: "conversion_timeout",
            message: "Converting a Word document took too long.".into(),
            suggestion: "Try again in a moment, or save the document as PDF and upload that instead.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        StampdocError::ConversionError(_) => HumanError {
            code: "conversion_failed",
            message: "A Word document couldn't be converted.".into(),
            suggestion: "The file may be damaged. Try saving it as PDF and uploading that instead.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        StampdocError::RenderError(_) => HumanError {
            code: "watermark_failed",
            message: "The watermark couldn't be drawn.".into(),
            suggestion: "Try a shorter watermark text.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        StampdocError::ImageError(_) => HumanError {
            code: "image_failed",
            message: "There's a problem with one of the images.".into(),
            suggestion: "The image may be damaged. Try saving it as a JPEG or PNG first.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        StampdocError::MergeError(_) => HumanError {
            code: "pdf_failed",
            message: "There's a problem with one of the PDF files.".into(),
            suggestion: "The file may be damaged or already password protected. Try opening it on a computer first.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        StampdocError::Encryption(_) => HumanError {
            code: "encryption_failed",
            message: "The finished document couldn't be password protected.".into(),
            suggestion: "Try again. If this keeps happening, please report it.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        StampdocError::StorageError(_) => HumanError {
            code: "storage_failed",
            message: "The document was created but couldn't be uploaded.".into(),
            suggestion: "Try again in a moment.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        StampdocError::Config(_) => HumanError {
            code: "misconfigured",
            message: "The service is not set up correctly.".into(),
            suggestion: "Please report this to the administrator.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        StampdocError::Cancelled => HumanError {
            code: "cancelled",
            message: "Processing was cancelled.".into(),
            suggestion: "Submit the documents again if you still need them.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        StampdocError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    code: "file_missing",
                    message: "An uploaded file went missing during processing.".into(),
                    suggestion: "Upload the documents again.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            } else {
                HumanError {
                    code: "io_failed",
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Try again. If this keeps happening, the server's storage may be full.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }

        StampdocError::Serialization(_) => HumanError {
            code: "internal",
            message: "The service had an internal data problem.".into(),
            suggestion: "Try again. If this keeps happening, please report it.".into(),
            retriable: true,
            severity: Severity::Transient,
        },
    }
}

/// Keep only what looks like an extension, so a crafted "extension" cannot
/// smuggle a path or markup into the payload.
fn sanitize_extension(ext: &str) -> String {
    let cleaned: String = ext
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.')
        .take(16)
        .collect();
    if cleaned.is_empty() {
        "none".into()
    } else {
        cleaned
    }
}
