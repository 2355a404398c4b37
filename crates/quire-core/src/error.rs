// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Quire.

use thiserror::Error;

/// Top-level error type for all Quire operations.
#[derive(Debug, Error)]
pub enum QuireError {
    // -- Loading --
    #[error("cannot load document: {0}")]
    Load(String),

    #[error("document \"{document}\" is encrypted and needs a password")]
    PasswordRequired { document: String },

    #[error("wrong password for document \"{document}\"")]
    PasswordIncorrect { document: String },

    // -- Assembly / splitting --
    #[error("assembly failed: {0}")]
    Assembly(String),

    #[error("invalid page range \"{segment}\": {reason}")]
    Range { segment: String, reason: String },

    #[error("cannot parse page range \"{segment}\": {reason}")]
    Parse { segment: String, reason: String },

    #[error("page rendering failed: {0}")]
    Render(String),

    #[error("PDF serialization failed: {0}")]
    Serialization(String),

    // -- Text location --
    #[error("OCR failed: {0}")]
    Ocr(String),

    // -- Workspace --
    #[error("workspace invariant violated: {0}")]
    Workspace(String),

    // -- Configuration / persistence --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl QuireError {
    /// Password errors are the only ones a caller is expected to retry, and
    /// only for a bounded number of attempts.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::PasswordRequired { .. } | Self::PasswordIncorrect { .. }
        )
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, QuireError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_errors_are_retryable() {
        let required = QuireError::PasswordRequired {
            document: "scan.pdf".into(),
        };
        let wrong = QuireError::PasswordIncorrect {
            document: "scan.pdf".into(),
        };
        assert!(required.is_retryable());
        assert!(wrong.is_retryable());
        assert!(!QuireError::Assembly("no pages".into()).is_retryable());
    }

    #[test]
    fn range_error_names_the_segment() {
        let err = QuireError::Range {
            segment: "2-1".into(),
            reason: "start is after end".into(),
        };
        let message = err.to_string();
        assert!(message.contains("2-1"), "got {message}");
        assert!(message.contains("start is after end"), "got {message}");
    }

    #[test]
    fn kinds_have_distinct_messages() {
        let load = QuireError::Load("not a PDF".into()).to_string();
        let render = QuireError::Render("timeout".into()).to_string();
        let serialize = QuireError::Serialization("xref".into()).to_string();
        assert!(load.starts_with("cannot load"));
        assert!(render.starts_with("page rendering"));
        assert!(serialize.starts_with("PDF serialization"));
    }
}
