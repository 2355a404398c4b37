// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-page text acquisition and normalisation.

use quire_core::types::TextSource;

/// Collapse every whitespace run to one space and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Classify natively extracted text: searchable if anything but whitespace
/// remains.
pub fn native_text_source(extracted: &str) -> TextSource {
    let text = normalize_whitespace(extracted);
    if text.is_empty() {
        TextSource::None
    } else {
        TextSource::Native { text }
    }
}

/// Lowercase letters and digits only; used to compare OCR words.
pub fn normalize_token(token: &str) -> String {
    token
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}
