// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for Quire.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a page instance in the working set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageId(pub Uuid);

impl PageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Generational handle into the workspace's source-document arena.
///
/// A handle outlives the document it names only as a stale value: resolving
/// it after the slot was freed (or reused) fails instead of aliasing.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct DocumentId {
    pub slot: u32,
    pub generation: u32,
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "doc#{}.{}", self.slot, self.generation)
    }
}

/// Page rotation, always one of the four quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

/// Direction of a user-requested quarter turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotateDirection {
    Clockwise,
    CounterClockwise,
}

impl Rotation {
    /// Normalise any multiple of 90 (including negatives) into a rotation.
    /// Values that are not a multiple of 90 snap down to the previous quarter.
    pub fn from_degrees(degrees: i64) -> Self {
        match degrees.rem_euclid(360) / 90 {
            1 => Self::Deg90,
            2 => Self::Deg180,
            3 => Self::Deg270,
            _ => Self::Deg0,
        }
    }

    pub fn degrees(self) -> u16 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    /// `(self + other) mod 360`.
    pub fn add(self, other: Rotation) -> Self {
        Self::from_degrees(i64::from(self.degrees()) + i64::from(other.degrees()))
    }

    pub fn turn(self, direction: RotateDirection) -> Self {
        match direction {
            RotateDirection::Clockwise => Self::from_degrees(i64::from(self.degrees()) + 90),
            RotateDirection::CounterClockwise => {
                Self::from_degrees(i64::from(self.degrees()) - 90)
            }
        }
    }

    /// True for 90 and 270, where width and height trade places.
    pub fn is_quarter_turn(self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }

    pub fn is_upright(self) -> bool {
        self == Self::Deg0
    }
}

/// Encoding used for rasterized pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RasterFormat {
    /// Lossless: raw RGB, Flate-compressed inside the PDF.
    Png,
    /// Lossy: baseline JPEG embedded as `DCTDecode`.
    Jpeg,
}

/// Resolution/quality settings behind a [`CompressionPreset`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PresetSettings {
    pub target_dpi: Option<f32>,
    /// JPEG quality in `0.0..=1.0`; unused for PNG.
    pub target_quality: Option<f32>,
    pub raster_format: RasterFormat,
}

/// Export compression policy.
///
/// `None` prefers structural page copies; every other preset rasterizes every
/// page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionPreset {
    #[default]
    None,
    Lossless,
    Light,
    Balanced,
    Strong,
}

impl CompressionPreset {
    pub const ALL: [CompressionPreset; 5] = [
        Self::None,
        Self::Lossless,
        Self::Light,
        Self::Balanced,
        Self::Strong,
    ];

    pub fn settings(self) -> PresetSettings {
        match self {
            Self::None => PresetSettings {
                target_dpi: None,
                target_quality: None,
                raster_format: RasterFormat::Png,
            },
            Self::Lossless => PresetSettings {
                target_dpi: Some(200.0),
                target_quality: None,
                raster_format: RasterFormat::Png,
            },
            Self::Light => PresetSettings {
                target_dpi: Some(150.0),
                target_quality: Some(0.85),
                raster_format: RasterFormat::Jpeg,
            },
            Self::Balanced => PresetSettings {
                target_dpi: Some(110.0),
                target_quality: Some(0.70),
                raster_format: RasterFormat::Jpeg,
            },
            Self::Strong => PresetSettings {
                target_dpi: Some(72.0),
                target_quality: Some(0.50),
                raster_format: RasterFormat::Jpeg,
            },
        }
    }

    /// Whether this preset forces every page through the raster path.
    pub fn forces_raster(self) -> bool {
        self != Self::None
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Lossless => "lossless",
            Self::Light => "light",
            Self::Balanced => "balanced",
            Self::Strong => "strong",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|preset| preset.name().eq_ignore_ascii_case(name.trim()))
    }
}

/// Page size in PDF points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

impl PageSize {
    /// US Letter, used when a page carries no usable MediaBox.
    pub const LETTER: PageSize = PageSize {
        width_pt: 612.0,
        height_pt: 792.0,
    };

    pub fn new(width_pt: f32, height_pt: f32) -> Self {
        Self {
            width_pt,
            height_pt,
        }
    }

    /// Size as displayed after `rotation`.
    pub fn rotated(self, rotation: Rotation) -> Self {
        if rotation.is_quarter_turn() {
            Self::new(self.height_pt, self.width_pt)
        } else {
            self
        }
    }
}

/// Bitmap size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

/// Axis-aligned rectangle with a top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }
}

/// One word recognized by OCR, in OCR-image pixel space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrWord {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub text: String,
}

impl OcrWord {
    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Where a page's searchable text came from.
///
/// OCR word boxes only exist on the `Ocr` variant, so nothing can read them
/// from a page that was never recognized.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum TextSource {
    Native {
        text: String,
    },
    Ocr {
        text: String,
        words: Vec<OcrWord>,
        image_size: PixelSize,
    },
    #[default]
    None,
}

impl TextSource {
    /// Searchable text, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Native { text } | Self::Ocr { text, .. } => Some(text),
            Self::None => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Native { .. } => "native",
            Self::Ocr { .. } => "ocr",
            Self::None => "none",
        }
    }
}

/// Inclusive, 1-based page range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

impl PageRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn single(page: u32) -> Self {
        Self::new(page, page)
    }

    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start) + 1
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}
