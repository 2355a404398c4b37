// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR results — recognised words with their boxes, imported from Tesseract
// TSV output or (with the `ocr` feature) produced by the `ocrs` engine.

#[cfg(feature = "ocr")]
pub mod engine;

use quire_core::error::{QuireError, Result};
use quire_core::types::{OcrWord, PixelSize, TextSource};
use tracing::debug;

/// Tesseract's TSV level for single words.
const WORD_LEVEL: &str = "5";
/// The page row, whose box is the whole image.
const PAGE_LEVEL: &str = "1";

/// Words recognised on one page image, in reading order.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrResult {
    pub words: Vec<OcrWord>,
    /// Size of the image the word boxes refer to.
    pub image_size: PixelSize,
}

impl OcrResult {
    /// Recognised words joined with single spaces.
    pub fn text(&self) -> String {
        self.words
            .iter()
            .map(|word| word.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn into_text_source(self) -> TextSource {
        TextSource::Ocr {
            text: self.text(),
            words: self.words,
            image_size: self.image_size,
        }
    }
}

/// Parse Tesseract `tsv` output.
///
/// Keeps word-level rows with non-empty text and a non-negative confidence.
/// The header row is optional; any other malformed row is an error.
pub fn parse_tesseract_tsv(tsv: &str, image_size: PixelSize) -> Result<OcrResult> {
    let mut words = Vec::new();
    for (line_number, line) in tsv.lines().enumerate() {
        if line.trim().is_empty() || line.starts_with("level") {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 11 {
            return Err(QuireError::Ocr(format!(
                "TSV line {} has {} fields, expected 12",
                line_number + 1,
                fields.len()
            )));
        }
        if fields[0] != WORD_LEVEL {
            continue;
        }
        let text = fields.get(11).map(|text| text.trim()).unwrap_or_default();
        let number = |index: usize| -> Result<f32> {
            fields[index].trim().parse::<f32>().map_err(|err| {
                QuireError::Ocr(format!(
                    "TSV line {} field {}: {}",
                    line_number + 1,
                    index + 1,
                    err
                ))
            })
        };
        if text.is_empty() || number(10)? < 0.0 {
            continue;
        }
        words.push(OcrWord {
            x: number(6)?,
            y: number(7)?,
            width: number(8)?,
            height: number(9)?,
            text: text.to_string(),
        });
    }
    debug!(words = words.len(), "Tesseract TSV parsed");
    Ok(OcrResult { words, image_size })
}

/// Image size from the page row of Tesseract `tsv` output, if it has one.
pub fn tesseract_image_size(tsv: &str) -> Option<PixelSize> {
    tsv.lines()
        .map(|line| line.split('\t').collect::<Vec<_>>())
        .find(|fields| fields.first() == Some(&PAGE_LEVEL) && fields.len() >= 10)
        .and_then(|fields| {
            Some(PixelSize {
                width: fields[8].trim().parse().ok()?,
                height: fields[9].trim().parse().ok()?,
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMAGE: PixelSize = PixelSize {
        width: 2550,
        height: 3300,
    };

    const TSV: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext
1\t1\t0\t0\t0\t0\t0\t0\t2550\t3300\t-1\t
4\t1\t1\t1\t1\t0\t100\t200\t400\t40\t-1\t
5\t1\t1\t1\t1\t1\t100\t200\t180\t40\t96.5\tInvoice
5\t1\t1\t1\t1\t2\t300\t200\t200\t40\t91.0\tNumber
5\t1\t1\t1\t1\t3\t520\t200\t10\t40\t-1\t
5\t1\t1\t1\t1\t4\t540\t200\t60\t40\t88\t42
";

    #[test]
    fn keeps_confident_word_rows() {
        let result = parse_tesseract_tsv(TSV, IMAGE).expect("parse");
        let texts: Vec<_> = result.words.iter().map(|word| word.text.as_str()).collect();
        assert_eq!(texts, vec!["Invoice", "Number", "42"]);
        assert_eq!(result.words[1].x, 300.0);
        assert_eq!(result.words[1].width, 200.0);
        assert_eq!(result.text(), "Invoice Number 42");
    }

    #[test]
    fn result_becomes_ocr_text_source() {
        let source = parse_tesseract_tsv(TSV, IMAGE).expect("parse").into_text_source();
        let TextSource::Ocr {
            text,
            words,
            image_size,
        } = source
        else {
            panic!("expected OCR text source");
        };
        assert_eq!(text, "Invoice Number 42");
        assert_eq!(words.len(), 3);
        assert_eq!(image_size, IMAGE);
    }

    #[test]
    fn image_size_comes_from_the_page_row() {
        assert_eq!(tesseract_image_size(TSV), Some(IMAGE));
        let words_only = TSV.lines().filter(|line| !line.starts_with("1\t")).collect::<Vec<_>>();
        assert_eq!(tesseract_image_size(&words_only.join("\n")), None);
    }

    #[test]
    fn malformed_numbers_are_reported() {
        let tsv = "5\t1\t1\t1\t1\t1\tleft\t200\t180\t40\t96\tword\n";
        let err = parse_tesseract_tsv(tsv, IMAGE).expect_err("bad number");
        assert!(matches!(err, QuireError::Ocr(_)));
    }

    #[test]
    fn short_rows_are_reported() {
        let err = parse_tesseract_tsv("5\t1\t1\n", IMAGE).expect_err("short row");
        assert!(err.to_string().contains("line 1"));
    }
}
