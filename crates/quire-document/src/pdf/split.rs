// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Range splitter — parse page-range text and carve an assembled document
// into one output per range.

use quire_core::error::{QuireError, Result};
use quire_core::types::PageRange;
use tracing::{debug, info, instrument};

use super::reader::PdfReader;

/// Sentinel meaning "every page as its own output".
const EVERY_PAGE: &str = "*";

/// Parse range text such as `1-3, 5,7-9` against a `total`-page document.
///
/// Whitespace is ignored everywhere and empty tokens (a trailing comma) are
/// skipped. `*` expands to one single-page range per page. Non-numeric
/// tokens and pages outside `1..=total` are `Parse` errors; a reversed range
/// is a `Range` error. Both name the offending segment.
pub fn parse_ranges(text: &str, total: u32) -> Result<Vec<PageRange>> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if compact == EVERY_PAGE {
        if total == 0 {
            return Err(QuireError::Range {
                segment: compact,
                reason: "document has no pages".into(),
            });
        }
        return Ok((1..=total).map(PageRange::single).collect());
    }

    let mut ranges = Vec::new();
    for segment in compact.split(',').filter(|segment| !segment.is_empty()) {
        let range = match segment.split_once('-') {
            Some((start, end)) => {
                PageRange::new(parse_page(segment, start)?, parse_page(segment, end)?)
            }
            None => PageRange::single(parse_page(segment, segment)?),
        };
        if range.end < range.start {
            return Err(QuireError::Range {
                segment: segment.to_string(),
                reason: "start is after end".into(),
            });
        }
        if range.start < 1 || range.end > total {
            return Err(QuireError::Parse {
                segment: segment.to_string(),
                reason: format!("pages run from 1 to {total}"),
            });
        }
        ranges.push(range);
    }

    if ranges.is_empty() {
        return Err(QuireError::Range {
            segment: text.to_string(),
            reason: "no page ranges given".into(),
        });
    }
    Ok(ranges)
}

fn parse_page(segment: &str, number: &str) -> Result<u32> {
    number.parse::<u32>().map_err(|err| QuireError::Parse {
        segment: segment.to_string(),
        reason: err.to_string(),
    })
}

fn check_range(range: PageRange, total: u32) -> Result<()> {
    let reason = if range.start < 1 {
        "pages are numbered from 1".to_string()
    } else if range.end < range.start {
        "start is after end".to_string()
    } else if range.end > total {
        format!("document has {} pages", total)
    } else {
        return Ok(());
    };
    Err(QuireError::Range {
        segment: format!("{}-{}", range.start, range.end),
        reason,
    })
}

/// Split `assembled` into one compacted document per range, in range order.
#[instrument(skip_all, fields(bytes_len = assembled.len(), ranges = ranges.len()))]
pub fn split(assembled: &[u8], ranges: &[PageRange]) -> Result<Vec<Vec<u8>>> {
    if ranges.is_empty() {
        return Err(QuireError::Range {
            segment: String::new(),
            reason: "no page ranges given".into(),
        });
    }

    let reader = PdfReader::from_bytes(assembled)?;
    let total = u32::try_from(reader.page_count()).unwrap_or(u32::MAX);
    for range in ranges {
        check_range(*range, total)?;
    }

    info!(total, parts = ranges.len(), "Splitting PDF");
    ranges
        .iter()
        .map(|range| {
            let part = reader.extract_page_range(
                range.start as usize - 1,
                range.end as usize - 1,
                true,
            )?;
            debug!(start = range.start, end = range.end, bytes = part.len(), "Part written");
            Ok(part)
        })
        .collect()
}
