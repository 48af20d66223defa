#![forbid(unsafe_code)]

//! Pedigree chart layout + drawing (headless).
//!
//! [`layout`] places every individual of a [`pedigree_core::Pedigree`] on a fixed-size canvas and
//! routes the marriage and descent connectors; [`svg::render_pedigree_svg`] draws the result
//! through the [`canvas::Canvas`] abstraction.

pub mod canvas;
pub mod layout;
pub mod model;
pub mod svg;
pub mod text;

use crate::text::{DeterministicTextMeasurer, TextMeasurer};
use pedigree_core::PedigreeConfig;
use std::sync::Arc;

pub use layout::layout;
pub use model::LayoutResult;
pub use svg::{SvgRenderOptions, render_pedigree_svg};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot lay out an empty pedigree")]
    EmptyPedigree,
    #[error("invalid canvas size {width}x{height}")]
    InvalidCanvas { width: f64, height: f64 },
    #[error("layout has no symbol for individual {id}")]
    MissingSymbol { id: String },
    #[error("layout JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Layout constants, in unscaled canvas units.
#[derive(Clone)]
pub struct LayoutOptions {
    pub symbol_size: f64,
    pub generation_spacing: f64,
    pub top_margin: f64,
    pub side_margin: f64,
    pub bottom_margin: f64,
    /// Minimum horizontal gap between symbols that are not partners.
    pub sibling_gap: f64,
    /// Gap between partners; kept smaller than `sibling_gap`.
    pub spouse_gap: f64,
    pub label_font_size: f64,
    pub age_font_size: f64,
    pub label_gap: f64,
    pub font_family: String,
    pub text_measurer: Arc<dyn TextMeasurer + Send + Sync>,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            symbol_size: 30.0,
            generation_spacing: 100.0,
            top_margin: 50.0,
            side_margin: 40.0,
            bottom_margin: 20.0,
            sibling_gap: 50.0,
            spouse_gap: 30.0,
            label_font_size: 12.0,
            age_font_size: 10.0,
            label_gap: 5.0,
            font_family: "Arial, sans-serif".to_string(),
            text_measurer: Arc::new(DeterministicTextMeasurer::default()),
        }
    }
}

impl std::fmt::Debug for LayoutOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutOptions")
            .field("symbol_size", &self.symbol_size)
            .field("generation_spacing", &self.generation_spacing)
            .field("top_margin", &self.top_margin)
            .field("side_margin", &self.side_margin)
            .field("bottom_margin", &self.bottom_margin)
            .field("sibling_gap", &self.sibling_gap)
            .field("spouse_gap", &self.spouse_gap)
            .field("label_font_size", &self.label_font_size)
            .field("age_font_size", &self.age_font_size)
            .field("label_gap", &self.label_gap)
            .field("font_family", &self.font_family)
            .finish_non_exhaustive()
    }
}

impl LayoutOptions {
    /// Reads `layout.*` (and `render.fontFamily`) from a config, falling back to the defaults for
    /// anything missing.
    pub fn from_config(config: &PedigreeConfig) -> Self {
        let d = Self::default();
        let num = |key: &str, fallback: f64| {
            config
                .get_f64(&format!("layout.{key}"))
                .filter(|v| v.is_finite() && *v >= 0.0)
                .unwrap_or(fallback)
        };
        Self {
            symbol_size: num("symbolSize", d.symbol_size).max(1.0),
            generation_spacing: num("generationSpacing", d.generation_spacing),
            top_margin: num("topMargin", d.top_margin),
            side_margin: num("sideMargin", d.side_margin),
            bottom_margin: num("bottomMargin", d.bottom_margin),
            sibling_gap: num("siblingGap", d.sibling_gap),
            spouse_gap: num("spouseGap", d.spouse_gap),
            label_font_size: num("labelFontSize", d.label_font_size),
            age_font_size: num("ageFontSize", d.age_font_size),
            label_gap: num("labelGap", d.label_gap),
            font_family: config
                .get_str("render.fontFamily")
                .map(str::to_string)
                .unwrap_or(d.font_family),
            text_measurer: d.text_measurer,
        }
    }

    pub fn with_text_measurer(mut self, measurer: Arc<dyn TextMeasurer + Send + Sync>) -> Self {
        self.text_measurer = measurer;
        self
    }
}

/// Canvas size requested in `layout.canvasWidth` / `layout.canvasHeight` (default 800x600).
pub fn canvas_size(config: &PedigreeConfig) -> (f64, f64) {
    (
        config.get_f64("layout.canvasWidth").unwrap_or(800.0),
        config.get_f64("layout.canvasHeight").unwrap_or(600.0),
    )
}
