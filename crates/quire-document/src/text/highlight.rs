// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Highlight rectangles for a query on one page, from OCR word boxes or from
// positioned native text items.

use quire_core::types::{OcrWord, PageSize, PixelSize, Rect, Rotation};
use serde::Serialize;

use super::geometry::rotate_rect;
use super::index::normalize_token;
use super::search::find_occurrences;
use crate::raster::{PageTextContent, TextItem, TextMeasurer};

/// Coordinate space the rectangles of a [`HighlightSet`] are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum HighlightSpace {
    /// PDF points, top-left origin, on the page as displayed.
    Points { page: PageSize },
    /// Pixels of the image OCR ran on.
    ImagePixels { image: PixelSize },
}

/// The rectangles covering one occurrence. Callers anchor scrolling on the
/// first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighlightGroup {
    pub rects: Vec<Rect>,
}

impl HighlightGroup {
    pub fn first(&self) -> Option<&Rect> {
        self.rects.first()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighlightSet {
    pub space: HighlightSpace,
    pub groups: Vec<HighlightGroup>,
}

impl HighlightSet {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn rects(&self) -> impl Iterator<Item = &Rect> {
        self.groups.iter().flat_map(|group| group.rects.iter())
    }
}

/// Runs of consecutive OCR words matching the query's tokens, each as one
/// union rectangle.
///
/// Matches whole words only: a phrase OCR merged into a single word is not
/// found.
pub fn ocr_highlights(words: &[OcrWord], image_size: PixelSize, query: &str) -> HighlightSet {
    let tokens: Vec<String> = query
        .split_whitespace()
        .map(normalize_token)
        .filter(|token| !token.is_empty())
        .collect();
    let normalized: Vec<String> = words.iter().map(|word| normalize_token(&word.text)).collect();

    let mut groups = Vec::new();
    if !tokens.is_empty() && tokens.len() <= words.len() {
        let mut at = 0;
        while at + tokens.len() <= words.len() {
            if normalized[at..at + tokens.len()] == tokens[..] {
                let run = &words[at..at + tokens.len()];
                let union = run[1..]
                    .iter()
                    .fold(run[0].bounds(), |acc, word| acc.union(&word.bounds()));
                groups.push(HighlightGroup { rects: vec![union] });
                at += tokens.len();
            } else {
                at += 1;
            }
        }
    }

    HighlightSet {
        space: HighlightSpace::ImagePixels { image: image_size },
        groups,
    }
}

/// Rectangles for every occurrence of `query` in the page's text items.
///
/// Items are joined with a single space so a match may span two items.
/// Rectangles are computed on the unrotated page (the content's viewport, or
/// `page_size` without one) and then mapped into `rotation`.
pub fn native_highlights(
    content: &PageTextContent,
    page_size: PageSize,
    rotation: Rotation,
    query: &str,
    measurer: Option<&dyn TextMeasurer>,
) -> HighlightSet {
    let viewport = content.viewport.unwrap_or(page_size);
    let needle: Vec<char> = query.trim().chars().flat_map(char::to_lowercase).collect();

    // Char span of each item within the joined page string.
    let mut page_text = String::new();
    let mut spans = Vec::with_capacity(content.items.len());
    let mut cursor = 0;
    for (index, item) in content.items.iter().enumerate() {
        if index > 0 {
            page_text.push(' ');
            cursor += 1;
        }
        let len = item.text.chars().count();
        page_text.push_str(&item.text);
        spans.push((cursor, cursor + len));
        cursor += len;
    }

    let groups = find_occurrences(&page_text, &needle)
        .into_iter()
        .filter_map(|(start, end)| {
            let rects: Vec<Rect> = content
                .items
                .iter()
                .zip(&spans)
                .filter_map(|(item, &(item_start, item_end))| {
                    let local_start = start.max(item_start);
                    let local_end = end.min(item_end);
                    (local_start < local_end).then(|| {
                        item_rect(
                            item,
                            local_start - item_start,
                            local_end - item_start,
                            viewport,
                            measurer,
                        )
                    })
                })
                .map(|rect| rotate_rect(rect, rotation, viewport))
                .collect();
            (!rects.is_empty()).then_some(HighlightGroup { rects })
        })
        .collect();

    HighlightSet {
        space: HighlightSpace::Points {
            page: viewport.rotated(rotation),
        },
        groups,
    }
}

/// Rectangle covering chars `[from, to)` of `item`, top-left origin.
fn item_rect(
    item: &TextItem,
    from: usize,
    to: usize,
    viewport: PageSize,
    measurer: Option<&dyn TextMeasurer>,
) -> Rect {
    let chars: Vec<char> = item.text.chars().collect();
    let prefix: String = chars[..from].iter().collect();
    let matched: String = chars[from..to].iter().collect();

    let measured = measurer.and_then(|measurer| {
        let full = measurer.measure(item, &item.text)?;
        if full <= 0.0 {
            return None;
        }
        let prefix_width = measurer.measure(item, &prefix)?;
        let matched_width = measurer.measure(item, &matched)?;
        Some((
            item.width * prefix_width / full,
            item.width * matched_width / full,
        ))
    });
    let (offset, width) = measured.unwrap_or_else(|| {
        let per_char = item.width / chars.len().max(1) as f32;
        (per_char * from as f32, per_char * (to - from) as f32)
    });

    let [_, _, _, _, e, f] = item.transform;
    let glyph_height = item.glyph_height();
    Rect::new(e + offset, viewport.height_pt - (f + glyph_height), width, glyph_height)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(x: f32, text: &str) -> OcrWord {
        OcrWord {
            x,
            y: 100.0,
            width: 40.0,
            height: 12.0,
            text: text.into(),
        }
    }

    fn item(text: &str, x: f32, y: f32, width: f32) -> TextItem {
        TextItem {
            text: text.into(),
            transform: [10.0, 0.0, 0.0, 10.0, x, y],
            width,
            height: 10.0,
            font_name: None,
        }
    }

    const PAGE: PageSize = PageSize {
        width_pt: 600.0,
        height_pt: 800.0,
    };
    const IMAGE: PixelSize = PixelSize {
        width: 1000,
        height: 1400,
    };

    #[test]
    fn ocr_phrase_unions_consecutive_words() {
        let words = [word(0.0, "Total:"), word(50.0, "Amount"), word(100.0, "due")];
        let set = ocr_highlights(&words, IMAGE, "amount DUE");
        assert_eq!(set.groups.len(), 1);
        assert_eq!(set.groups[0].rects, vec![Rect::new(50.0, 100.0, 90.0, 12.0)]);
        assert_eq!(set.space, HighlightSpace::ImagePixels { image: IMAGE });
    }

    #[test]
    fn ocr_ignores_punctuation_on_words() {
        let words = [word(0.0, "“total,”"), word(50.0, "total")];
        assert_eq!(ocr_highlights(&words, IMAGE, "Total").groups.len(), 2);
    }

    #[test]
    fn ocr_does_not_find_substrings_inside_words() {
        let words = [word(0.0, "subtotal")];
        assert!(ocr_highlights(&words, IMAGE, "total").is_empty());
    }

    #[test]
    fn native_uniform_split_without_measurer() {
        let content = PageTextContent {
            items: vec![item("hello world", 100.0, 700.0, 110.0)],
            viewport: None,
        };
        let set = native_highlights(&content, PAGE, Rotation::Deg0, "world", None);
        assert_eq!(
            set.groups[0].rects,
            vec![Rect::new(160.0, 800.0 - 710.0, 50.0, 10.0)]
        );
    }

    struct DoubleWidthVowels;

    impl TextMeasurer for DoubleWidthVowels {
        fn measure(&self, _item: &TextItem, text: &str) -> Option<f32> {
            Some(
                text.chars()
                    .map(|c| if "aeiou".contains(c) { 2.0 } else { 1.0 })
                    .sum(),
            )
        }
    }

    #[test]
    fn native_widths_follow_measured_ratio() {
        // "abcd" measures 5 units: "ab" is 3 of them, "cd" 2.
        let content = PageTextContent {
            items: vec![item("abcd", 0.0, 0.0, 40.0)],
            viewport: Some(PAGE),
        };
        let set = native_highlights(&content, PAGE, Rotation::Deg0, "cd", Some(&DoubleWidthVowels));
        let rect = set.groups[0].rects[0];
        assert!((rect.x - 24.0).abs() < 1e-4, "x = {}", rect.x);
        assert!((rect.width - 16.0).abs() < 1e-4, "width = {}", rect.width);

        let set = native_highlights(&content, PAGE, Rotation::Deg0, "ab", Some(&DoubleWidthVowels));
        assert!((set.groups[0].rects[0].width - 24.0).abs() < 1e-4);
    }

    #[test]
    fn match_spanning_items_groups_their_rects() {
        let content = PageTextContent {
            items: vec![item("quarterly", 0.0, 500.0, 90.0), item("report", 100.0, 500.0, 60.0)],
            viewport: Some(PAGE),
        };
        let set = native_highlights(&content, PAGE, Rotation::Deg0, "terly rep", None);
        assert_eq!(set.groups.len(), 1);
        let rects = &set.groups[0].rects;
        assert_eq!(rects.len(), 2);
        assert_eq!(rects[0], Rect::new(40.0, 290.0, 50.0, 10.0));
        assert_eq!(rects[1], Rect::new(100.0, 290.0, 30.0, 10.0));
    }

    #[test]
    fn rotated_page_maps_rects() {
        let content = PageTextContent {
            items: vec![item("target", 100.0, 700.0, 60.0)],
            viewport: Some(PAGE),
        };
        let upright = native_highlights(&content, PAGE, Rotation::Deg0, "target", None);
        let turned = native_highlights(&content, PAGE, Rotation::Deg90, "target", None);

        let r = upright.groups[0].rects[0];
        let expected = Rect::new(PAGE.height_pt - (r.y + r.height), r.x, r.height, r.width);
        assert_eq!(turned.groups[0].rects[0], expected);
        assert_eq!(
            turned.space,
            HighlightSpace::Points {
                page: PageSize::new(800.0, 600.0)
            }
        );
    }

    #[test]
    fn empty_query_highlights_nothing() {
        let content = PageTextContent {
            items: vec![item("text", 0.0, 0.0, 40.0)],
            viewport: Some(PAGE),
        };
        assert!(native_highlights(&content, PAGE, Rotation::Deg0, "  ", None).is_empty());
        assert!(ocr_highlights(&[word(0.0, "text")], IMAGE, "").is_empty());
    }
}
