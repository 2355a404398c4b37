// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR engine backed by the `ocrs` crate, a pure-Rust OCR engine running
// neural network models through `rten`.
//
// # Feature Gate
//
// Only available with the `ocr` feature:
//
// ```toml
// quire-document = { path = "crates/quire-document", features = ["ocr"] }
// ```
//
// # Model Setup
//
// Two model files are required: `text-detection.rten` (locates words) and
// `text-recognition.rten` (decodes characters). Running `ocrs-cli` once
// downloads both to `$XDG_CACHE_HOME/ocrs` (typically `~/.cache/ocrs`).

use std::path::{Path, PathBuf};

use image::DynamicImage;
use ocrs::{ImageSource, OcrEngine as OcrsEngine, OcrEngineParams, TextItem};
use quire_core::error::{QuireError, Result};
use quire_core::types::{OcrWord, PixelSize};
use rten::Model;
use rten_imageproc::RectF;
use tracing::{debug, info, instrument};

use super::OcrResult;

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// `$XDG_CACHE_HOME/ocrs`, else `~/.cache/ocrs`, else `./ocrs-models`.
fn default_model_dir() -> PathBuf {
    std::env::var_os("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".cache")))
        .map(|cache| cache.join("ocrs"))
        .unwrap_or_else(|| PathBuf::from("ocrs-models"))
}

/// Locations of the detection and recognition models.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrModels {
    pub detection: PathBuf,
    pub recognition: PathBuf,
}

impl Default for OcrModels {
    fn default() -> Self {
        Self::in_dir(default_model_dir())
    }
}

impl OcrModels {
    /// Both models under their well-known file names in `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            detection: dir.as_ref().join(DETECTION_MODEL_FILENAME),
            recognition: dir.as_ref().join(RECOGNITION_MODEL_FILENAME),
        }
    }

    /// The first missing model, if any.
    pub fn missing(&self) -> Option<&Path> {
        [&self.detection, &self.recognition]
            .into_iter()
            .find(|path| !path.exists())
            .map(PathBuf::as_path)
    }

    pub fn validate(&self) -> Result<()> {
        match self.missing() {
            Some(path) => Err(QuireError::Ocr(format!(
                "model not found at {}; run `ocrs-cli` once to download models",
                path.display()
            ))),
            None => Ok(()),
        }
    }
}

/// Word-level OCR over rendered page images.
///
/// Model loading is the expensive step; keep one engine for many pages.
pub struct OcrEngine {
    engine: OcrsEngine,
}

impl OcrEngine {
    #[instrument(skip_all, fields(detection = %models.detection.display()))]
    pub fn new(models: &OcrModels) -> Result<Self> {
        models.validate()?;

        let load = |path: &Path| {
            Model::load_file(path).map_err(|err| {
                QuireError::Ocr(format!("failed to load model from {}: {}", path.display(), err))
            })
        };
        let detection_model = load(&models.detection)?;
        let recognition_model = load(&models.recognition)?;

        let engine = OcrsEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| QuireError::Ocr(format!("failed to initialise OCR engine: {}", err)))?;

        info!("OCR engine initialised");
        Ok(Self { engine })
    }

    pub fn from_model_dir(dir: impl AsRef<Path>) -> Result<Self> {
        Self::new(&OcrModels::in_dir(dir))
    }

    /// Recognise the words on `image`, with boxes in its pixel space.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn recognize_words(&self, image: &DynamicImage) -> Result<OcrResult> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();

        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
            QuireError::Ocr(format!(
                "failed to create image source ({}x{}): {}",
                width, height, err
            ))
        })?;
        let input = self
            .engine
            .prepare_input(source)
            .map_err(|err| QuireError::Ocr(format!("OCR preprocessing failed: {}", err)))?;

        let word_rects = self
            .engine
            .detect_words(&input)
            .map_err(|err| QuireError::Ocr(format!("word detection failed: {}", err)))?;
        let line_rects = self.engine.find_text_lines(&input, &word_rects);
        let lines = self
            .engine
            .recognize_text(&input, &line_rects)
            .map_err(|err| QuireError::Ocr(format!("line recognition failed: {}", err)))?;

        let mut words = Vec::new();
        for line in lines.iter().flatten() {
            for word in line.words() {
                let text = word.to_string();
                if text.trim().is_empty() {
                    continue;
                }
                let bounds: RectF = word.rotated_rect().bounding_rect();
                words.push(OcrWord {
                    x: bounds.left(),
                    y: bounds.top(),
                    width: bounds.width(),
                    height: bounds.height(),
                    text: text.trim().to_string(),
                });
            }
        }

        debug!(lines = line_rects.len(), words = words.len(), "OCR complete");
        Ok(OcrResult {
            words,
            image_size: PixelSize { width, height },
        })
    }
}

/// Whether both model files exist in the default cache location.
pub fn models_available() -> bool {
    OcrModels::default().missing().is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn models_use_well_known_names() {
        let models = OcrModels::in_dir("/opt/quire/models");
        assert!(models.detection.ends_with("text-detection.rten"));
        assert!(models.recognition.ends_with("text-recognition.rten"));
        assert!(models.detection.starts_with("/opt/quire/models"));
    }

    #[test]
    fn missing_models_are_named() {
        let models = OcrModels::in_dir("/nonexistent/ocr-models");
        assert_eq!(models.missing(), Some(models.detection.as_path()));
        let err = models.validate().expect_err("models are missing");
        assert!(matches!(err, QuireError::Ocr(ref message) if message.contains("text-detection")));
    }
}
