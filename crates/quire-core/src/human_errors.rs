// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages.
//
// Every technical error is mapped to plain English with a clear suggestion, so
// a front end can show something better than the raw `Display` text.

use crate::error::QuireError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Asking again may succeed (password prompts).
    Retry,
    /// The user must change what they typed or picked.
    ActionRequired,
    /// The input itself is unusable.
    Permanent,
    /// Something inside the engine went wrong.
    Internal,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether asking again can help.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `QuireError` into a `HumanError`.
pub fn humanize_error(err: &QuireError) -> HumanError {
    match err {
        QuireError::Load(detail) => HumanError {
            message: "This file could not be opened as a PDF.".into(),
            suggestion: format!("Check that the file is a PDF and is not damaged. ({detail})"),
            retriable: false,
            severity: Severity::Permanent,
        },

        QuireError::PasswordRequired { document } => HumanError {
            message: format!("\"{document}\" is password protected."),
            suggestion: "Enter the document password to open it.".into(),
            retriable: true,
            severity: Severity::Retry,
        },

        QuireError::PasswordIncorrect { document } => HumanError {
            message: format!("That password did not open \"{document}\"."),
            suggestion: "Check the password and try again.".into(),
            retriable: true,
            severity: Severity::Retry,
        },

        QuireError::Assembly(detail) => HumanError {
            message: "The pages could not be put together.".into(),
            suggestion: format!("Make sure at least one page is selected. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        QuireError::Range { segment, reason } => HumanError {
            message: format!("The page range \"{segment}\" does not fit this document."),
            suggestion: format!("Use page numbers inside the document, lowest first ({reason})."),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        QuireError::Parse { segment, reason } => HumanError {
            message: format!("\"{segment}\" is not a page range."),
            suggestion: format!(
                "Write ranges like 1-3,5 or * for every page on its own ({reason})."
            ),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        QuireError::Render(detail) | QuireError::Ocr(detail) => HumanError {
            message: "A page could not be drawn.".into(),
            suggestion: format!("Try again, or pick a different compression setting. ({detail})"),
            retriable: false,
            severity: Severity::Internal,
        },

        QuireError::Serialization(detail) => HumanError {
            message: "The finished PDF could not be written.".into(),
            suggestion: format!("Nothing was saved. Try again with fewer pages. ({detail})"),
            retriable: false,
            severity: Severity::Internal,
        },

        QuireError::Workspace(detail) => HumanError {
            message: "The page list is out of step with the loaded files.".into(),
            suggestion: format!("Undo the last change or reload the files. ({detail})"),
            retriable: false,
            severity: Severity::Internal,
        },

        QuireError::Config(_) | QuireError::Json(_) => HumanError {
            message: "The settings file is not valid.".into(),
            suggestion: format!("Fix or remove the settings file. ({err})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        QuireError::Io(io) => HumanError {
            message: "A file could not be read or written.".into(),
            suggestion: format!("Check the path and its permissions. ({io})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },
    }
}
