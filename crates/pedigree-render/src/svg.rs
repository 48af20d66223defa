//! Pedigree chart drawing.
//!
//! [`render_pedigree`] walks a [`LayoutResult`] and issues primitive calls on any [`Canvas`];
//! [`render_pedigree_svg`] does the same against an [`SvgCanvas`] and returns the document.

use crate::canvas::{Canvas, ShapeStyle, SvgCanvas, TextAnchor, TextPaint};
use crate::model::{LayoutPoint, LayoutResult, LayoutSymbol};
use crate::{Error, Result};
use pedigree_core::{Individual, Pedigree, PedigreeConfig, Sex, Status};

#[derive(Debug, Clone, PartialEq)]
pub struct SvgRenderOptions {
    /// Stroke width at scale 1.
    pub line_width: f64,
    pub background: String,
    pub border_color: String,
    pub connector_color: String,
    pub affected_color: String,
    pub carrier_color: String,
    pub text_color: String,
    pub age_color: String,
    pub font_family: String,
}

impl Default for SvgRenderOptions {
    fn default() -> Self {
        Self {
            line_width: 2.0,
            background: "white".to_string(),
            border_color: "#000000".to_string(),
            connector_color: "#000000".to_string(),
            affected_color: "#000000".to_string(),
            carrier_color: "#666666".to_string(),
            text_color: "#333333".to_string(),
            age_color: "#666666".to_string(),
            font_family: "Arial, sans-serif".to_string(),
        }
    }
}

impl SvgRenderOptions {
    pub fn from_config(config: &PedigreeConfig) -> Self {
        let d = Self::default();
        let color = |key: &str, fallback: String| {
            config
                .get_str(&format!("render.{key}"))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .unwrap_or(fallback)
        };
        Self {
            line_width: config
                .get_f64("render.lineWidth")
                .filter(|v| v.is_finite() && *v > 0.0)
                .unwrap_or(d.line_width),
            background: color("background", d.background),
            border_color: color("borderColor", d.border_color),
            connector_color: color("connectorColor", d.connector_color),
            affected_color: color("affectedColor", d.affected_color),
            carrier_color: color("carrierColor", d.carrier_color),
            text_color: color("textColor", d.text_color),
            age_color: color("ageColor", d.age_color),
            font_family: color("fontFamily", d.font_family),
        }
    }
}

const CARRIER_DOT_RATIO: f64 = 0.15;
const DECEASED_OVERHANG_RATIO: f64 = 0.2;
const UNKNOWN_DASH: [f64; 2] = [4.0, 3.0];

/// Draws connectors first, then symbols, then labels, so lines never cover a symbol.
pub fn render_pedigree(
    pedigree: &Pedigree,
    layout: &LayoutResult,
    canvas: &mut dyn Canvas,
    options: &SvgRenderOptions,
) -> Result<()> {
    if pedigree.is_empty() || layout.symbols.is_empty() {
        return Err(Error::EmptyPedigree);
    }
    let scale = if layout.scale.is_finite() && layout.scale > 0.0 {
        layout.scale
    } else {
        1.0
    };
    let line_width = options.line_width * scale;

    for marriage in &layout.marriages {
        canvas.draw_line(
            &points(&[marriage.from, marriage.to]),
            &options.connector_color,
            line_width,
        );
    }
    for descent in &layout.descents {
        for polyline in descent.polylines() {
            canvas.draw_line(&points(polyline), &options.connector_color, line_width);
        }
    }

    let mut placed = Vec::with_capacity(pedigree.len());
    for individual in pedigree.individuals.values() {
        let symbol = layout.symbol(&individual.id).ok_or_else(|| Error::MissingSymbol {
            id: individual.id.clone(),
        })?;
        draw_symbol(canvas, individual, symbol, line_width, options);
        placed.push(symbol);
    }

    for symbol in placed {
        let name = &symbol.name_label;
        canvas.draw_text(
            name.x,
            name.y,
            &name.text,
            &TextPaint {
                color: options.text_color.clone(),
                font_family: options.font_family.clone(),
                font_size: name.font_size,
                anchor: TextAnchor::Middle,
            },
        );
        if let Some(age) = &symbol.age_label {
            canvas.draw_text(
                age.x,
                age.y,
                &age.text,
                &TextPaint {
                    color: options.age_color.clone(),
                    font_family: options.font_family.clone(),
                    font_size: age.font_size,
                    anchor: TextAnchor::Middle,
                },
            );
        }
    }

    tracing::debug!(
        symbols = layout.symbols.len(),
        marriages = layout.marriages.len(),
        descents = layout.descents.len(),
        scale,
        "rendered pedigree"
    );
    Ok(())
}

pub fn render_pedigree_svg(
    pedigree: &Pedigree,
    layout: &LayoutResult,
    options: &SvgRenderOptions,
) -> Result<String> {
    if !(layout.width.is_finite() && layout.height.is_finite())
        || layout.width <= 0.0
        || layout.height <= 0.0
    {
        return Err(Error::InvalidCanvas {
            width: layout.width,
            height: layout.height,
        });
    }
    let mut canvas = SvgCanvas::new(layout.width, layout.height).with_background(&options.background);
    render_pedigree(pedigree, layout, &mut canvas, options)?;
    Ok(canvas.finish())
}

fn points(polyline: &[LayoutPoint]) -> Vec<(f64, f64)> {
    polyline.iter().map(|p| (p.x, p.y)).collect()
}

fn draw_symbol(
    canvas: &mut dyn Canvas,
    individual: &Individual,
    symbol: &LayoutSymbol,
    line_width: f64,
    options: &SvgRenderOptions,
) {
    let (cx, cy, size) = (symbol.x, symbol.y, symbol.size);

    let mut style = ShapeStyle::outline(options.border_color.clone(), line_width);
    match individual.status {
        Status::Affected => style = style.with_fill(options.affected_color.clone()),
        Status::Unknown => {
            let scale = line_width / options.line_width.max(f64::EPSILON);
            style = style.with_dash(UNKNOWN_DASH.iter().map(|d| d * scale).collect());
        }
        Status::Carrier | Status::Unaffected => {}
    }

    match individual.sex {
        Sex::Male => canvas.draw_square(cx, cy, size, &style),
        Sex::Female => canvas.draw_circle(cx, cy, size / 2.0, &style),
        Sex::Unknown => canvas.draw_diamond(cx, cy, size, &style),
    }

    match individual.status {
        Status::Carrier => canvas.draw_circle(
            cx,
            cy,
            size * CARRIER_DOT_RATIO,
            &ShapeStyle::filled(options.carrier_color.clone()),
        ),
        Status::Unknown => {
            let font_size = size * 0.5;
            canvas.draw_text(
                cx,
                cy + font_size * 0.35,
                "?",
                &TextPaint {
                    color: options.text_color.clone(),
                    font_family: options.font_family.clone(),
                    font_size,
                    anchor: TextAnchor::Middle,
                },
            );
        }
        Status::Affected | Status::Unaffected => {}
    }

    if individual.deceased {
        let reach = size / 2.0 + size * DECEASED_OVERHANG_RATIO;
        canvas.draw_line(
            &[(cx - reach, cy + reach), (cx + reach, cy - reach)],
            &options.border_color,
            line_width,
        );
    }
}
