// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the text-location and raster hot paths in the
// quire-document crate.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{Rgba, RgbaImage};

use quire_core::types::{DocumentId, PageSize, Rotation, TextSource};
use quire_document::ImageProcessor;
use quire_document::raster::{PageTextContent, TextItem};
use quire_document::text::{native_highlights, search};
use quire_document::workspace::PageInstance;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

const LINE: &str = "Invoice 2041 total due within thirty days of receipt";

/// 200 pages of 40 repeated lines each.
fn working_set() -> Vec<PageInstance> {
    let text = vec![LINE; 40].join(" ");
    (0..200)
        .map(|index| {
            PageInstance::new(
                DocumentId::default(),
                index,
                TextSource::Native { text: text.clone() },
            )
        })
        .collect()
}

/// One text item per line, laid out top to bottom on a Letter page.
fn page_items() -> PageTextContent {
    let items = (0..40)
        .map(|line| TextItem {
            text: LINE.to_string(),
            transform: [1.0, 0.0, 0.0, 1.0, 72.0, 740.0 - line as f32 * 16.0],
            width: 380.0,
            height: 11.0,
            font_name: None,
        })
        .collect();
    PageTextContent {
        items,
        viewport: Some(PageSize::LETTER),
    }
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_search(c: &mut Criterion) {
    let pages = working_set();
    c.bench_function("search (200 pages, 2 words)", |b| {
        b.iter(|| black_box(search(black_box(&pages), "total due", 40)));
    });
}

fn bench_native_highlights(c: &mut Criterion) {
    let content = page_items();
    c.bench_function("native_highlights (40 items, rotated 90)", |b| {
        b.iter(|| {
            black_box(native_highlights(
                black_box(&content),
                PageSize::LETTER,
                Rotation::Deg90,
                "thirty days",
                None,
            ))
        });
    });
}

/// The validation probe: ink coverage of a 40 px wide render.
fn bench_ink_coverage(c: &mut Criterion) {
    let mut image = RgbaImage::from_pixel(40, 52, Rgba([255, 255, 255, 255]));
    for x in 10..30 {
        image.put_pixel(x, 26, Rgba([0, 0, 0, 255]));
    }
    let processor = ImageProcessor::from_rgba(image);
    c.bench_function("ink_coverage (40x52)", |b| {
        b.iter(|| black_box(processor.ink_coverage(250)));
    });
}

criterion_group!(benches, bench_search, bench_native_highlights, bench_ink_coverage);
criterion_main!(benches);
