// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{QuireError, Result};

/// Top-level settings. Every field has a default, so a partial JSON file only
/// needs to name what it overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuireConfig {
    pub assembly: AssemblyConfig,
    pub load: LoadConfig,
    pub search: SearchConfig,
    pub history: HistoryConfig,
}

/// Knobs for the assembly engine's raster and validation paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyConfig {
    /// Pixel budget per page when every page is rasterized.
    pub primary_pixel_budget: u64,
    /// Pixel budget per page when rasterizing after a failed structural copy.
    pub fallback_pixel_budget: u64,
    /// Floor for budget-driven DPI reduction.
    pub min_dpi: f32,
    /// DPI used when rasterization is forced but the preset names none.
    pub default_raster_dpi: f32,
    /// Width of the probe render used to validate a structural copy.
    pub probe_width_px: u32,
    /// Fraction of inked probe pixels below which a copy is rejected.
    pub min_ink_ratio: f32,
    /// Channel value at or above which a pixel counts as white.
    pub near_white_threshold: u8,
    /// Rasterize pages that carry any rotation when rotation is baked.
    pub rasterize_rotated_pages: bool,
    /// Skip object compaction for maximum viewer compatibility.
    pub vector_compatibility: bool,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            primary_pixel_budget: 10_000_000,
            fallback_pixel_budget: 8_000_000,
            min_dpi: 72.0,
            default_raster_dpi: 150.0,
            probe_width_px: 40,
            min_ink_ratio: 0.005,
            near_white_threshold: 250,
            rasterize_rotated_pages: true,
            vector_compatibility: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    /// Password prompts per document before it is skipped.
    pub max_password_attempts: u32,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            max_password_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Characters of context kept on each side of a match.
    pub snippet_context: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            snippet_context: 40,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum retained undo snapshots; `None` keeps all of them.
    pub capacity: Option<usize>,
}

impl QuireConfig {
    /// Parse a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        let assembly = &self.assembly;
        if assembly.primary_pixel_budget == 0 || assembly.fallback_pixel_budget == 0 {
            return Err(QuireError::Config("pixel budgets must be positive".into()));
        }
        if !(assembly.min_dpi > 0.0) || !(assembly.default_raster_dpi > 0.0) {
            return Err(QuireError::Config("DPI values must be positive".into()));
        }
        if assembly.probe_width_px == 0 {
            return Err(QuireError::Config("probe width must be positive".into()));
        }
        if !(0.0..=1.0).contains(&assembly.min_ink_ratio) {
            return Err(QuireError::Config(format!(
                "min_ink_ratio {} is outside 0..=1",
                assembly.min_ink_ratio
            )));
        }
        if self.load.max_password_attempts == 0 {
            return Err(QuireError::Config(
                "max_password_attempts must be at least 1".into(),
            ));
        }
        if self.history.capacity == Some(0) {
            return Err(QuireError::Config("history capacity must be positive".into()));
        }
        Ok(())
    }
}
