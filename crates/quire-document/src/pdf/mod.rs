// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — reading, writing, assembling, and splitting PDFs.

pub mod assemble;
pub mod reader;
pub mod split;
pub mod writer;

pub use assemble::{
    AssemblyEngine, AssemblyOutput, AssemblyRequest, PageMode, PageOutcome, RasterReason,
    effective_dpi,
};
pub use reader::PdfReader;
pub use split::{parse_ranges, split};
pub use writer::PdfWriter;
