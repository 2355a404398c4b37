// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text location — page text acquisition, search, and highlight geometry.

pub mod geometry;
pub mod highlight;
pub mod index;
pub mod search;

pub use geometry::rotate_rect;
pub use highlight::{HighlightGroup, HighlightSet, HighlightSpace, native_highlights, ocr_highlights};
pub use index::{native_text_source, normalize_whitespace};
pub use search::{EmptyReason, SearchMatch, SearchOutcome, search};
