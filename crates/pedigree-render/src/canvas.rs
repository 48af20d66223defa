//! Drawing abstraction used by the pedigree renderer.
//!
//! Coordinates are canvas units with the origin in the top-left corner. Shapes are given by their
//! center and bounding-box size so that every backend draws the same geometry.

use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq)]
pub struct ShapeStyle {
    /// `None` leaves the shape unfilled.
    pub fill: Option<String>,
    /// `None` draws no outline.
    pub stroke: Option<String>,
    pub stroke_width: f64,
    /// Dash pattern (on/off lengths); empty for a solid outline.
    pub dash: Vec<f64>,
}

impl ShapeStyle {
    pub fn outline(color: impl Into<String>, width: f64) -> Self {
        Self {
            fill: None,
            stroke: Some(color.into()),
            stroke_width: width,
            dash: Vec::new(),
        }
    }

    pub fn filled(color: impl Into<String>) -> Self {
        Self {
            fill: Some(color.into()),
            stroke: None,
            stroke_width: 0.0,
            dash: Vec::new(),
        }
    }

    pub fn with_fill(mut self, color: impl Into<String>) -> Self {
        self.fill = Some(color.into());
        self
    }

    pub fn with_dash(mut self, dash: Vec<f64>) -> Self {
        self.dash = dash;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextPaint {
    pub color: String,
    pub font_family: String,
    pub font_size: f64,
    pub anchor: TextAnchor,
}

/// Minimal 2D surface: the five primitives a pedigree chart needs.
pub trait Canvas {
    /// Axis-aligned square of edge `size` centered on (`cx`, `cy`).
    fn draw_square(&mut self, cx: f64, cy: f64, size: f64, style: &ShapeStyle);
    fn draw_circle(&mut self, cx: f64, cy: f64, radius: f64, style: &ShapeStyle);
    /// Square rotated 45 degrees, with vertices `size / 2` away from the center.
    fn draw_diamond(&mut self, cx: f64, cy: f64, size: f64, style: &ShapeStyle);
    /// Open polyline through `points`.
    fn draw_line(&mut self, points: &[(f64, f64)], color: &str, width: f64);
    /// Text with its baseline at `y`.
    fn draw_text(&mut self, x: f64, y: f64, text: &str, paint: &TextPaint);
}

/// Canvas that records SVG markup.
#[derive(Debug, Clone)]
pub struct SvgCanvas {
    width: f64,
    height: f64,
    background: Option<String>,
    body: String,
}

impl SvgCanvas {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            background: None,
            body: String::new(),
        }
    }

    pub fn with_background(mut self, color: impl Into<String>) -> Self {
        self.background = Some(color.into());
        self
    }

    /// Closes the document and returns the SVG text.
    pub fn finish(self) -> String {
        let mut out = String::with_capacity(self.body.len() + 256);
        let w = fmt(self.width);
        let h = fmt(self.height);
        let _ = write!(
            &mut out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#
        );
        if let Some(bg) = &self.background {
            let _ = write!(
                &mut out,
                r#"<rect x="0" y="0" width="{w}" height="{h}" fill="{}"/>"#,
                escape_xml(bg)
            );
        }
        out.push_str(&self.body);
        out.push_str("</svg>\n");
        out
    }

    fn push_style(&mut self, style: &ShapeStyle) {
        let out = &mut self.body;
        let _ = write!(
            out,
            r#" fill="{}""#,
            escape_xml(style.fill.as_deref().unwrap_or("none"))
        );
        match &style.stroke {
            Some(stroke) if style.stroke_width > 0.0 => {
                let _ = write!(
                    out,
                    r#" stroke="{}" stroke-width="{}""#,
                    escape_xml(stroke),
                    fmt(style.stroke_width)
                );
                if !style.dash.is_empty() {
                    let dash: Vec<String> = style.dash.iter().map(|d| fmt(*d)).collect();
                    let _ = write!(out, r#" stroke-dasharray="{}""#, dash.join(" "));
                }
            }
            _ => out.push_str(r#" stroke="none""#),
        }
    }
}

impl Canvas for SvgCanvas {
    fn draw_square(&mut self, cx: f64, cy: f64, size: f64, style: &ShapeStyle) {
        let _ = write!(
            &mut self.body,
            r#"<rect x="{}" y="{}" width="{}" height="{}""#,
            fmt(cx - size / 2.0),
            fmt(cy - size / 2.0),
            fmt(size),
            fmt(size)
        );
        self.push_style(style);
        self.body.push_str("/>");
    }

    fn draw_circle(&mut self, cx: f64, cy: f64, radius: f64, style: &ShapeStyle) {
        let _ = write!(
            &mut self.body,
            r#"<circle cx="{}" cy="{}" r="{}""#,
            fmt(cx),
            fmt(cy),
            fmt(radius)
        );
        self.push_style(style);
        self.body.push_str("/>");
    }

    fn draw_diamond(&mut self, cx: f64, cy: f64, size: f64, style: &ShapeStyle) {
        let h = size / 2.0;
        let _ = write!(
            &mut self.body,
            r#"<polygon points="{},{} {},{} {},{} {},{}""#,
            fmt(cx),
            fmt(cy - h),
            fmt(cx + h),
            fmt(cy),
            fmt(cx),
            fmt(cy + h),
            fmt(cx - h),
            fmt(cy)
        );
        self.push_style(style);
        self.body.push_str("/>");
    }

    fn draw_line(&mut self, points: &[(f64, f64)], color: &str, width: f64) {
        if points.len() < 2 {
            return;
        }
        let pts: Vec<String> = points
            .iter()
            .map(|(x, y)| format!("{},{}", fmt(*x), fmt(*y)))
            .collect();
        let _ = write!(
            &mut self.body,
            r#"<polyline points="{}" fill="none" stroke="{}" stroke-width="{}" stroke-linecap="square"/>"#,
            pts.join(" "),
            escape_xml(color),
            fmt(width)
        );
    }

    fn draw_text(&mut self, x: f64, y: f64, text: &str, paint: &TextPaint) {
        let anchor = match paint.anchor {
            TextAnchor::Start => "start",
            TextAnchor::Middle => "middle",
            TextAnchor::End => "end",
        };
        let _ = write!(
            &mut self.body,
            r#"<text x="{}" y="{}" font-family="{}" font-size="{}" fill="{}" text-anchor="{anchor}">{}</text>"#,
            fmt(x),
            fmt(y),
            escape_xml(&paint.font_family),
            fmt(paint.font_size),
            escape_xml(&paint.color),
            escape_xml(text)
        );
    }
}

/// Shortest round-trippable form, without `-0` and sub-micro float noise.
pub(crate) fn fmt(v: f64) -> String {
    if !v.is_finite() {
        return "0".to_string();
    }
    let mut v = if v.abs() < 1e-9 { 0.0 } else { v };
    let rounded = (v * 1000.0).round() / 1000.0;
    if (v - rounded).abs() < 1e-6 {
        v = rounded;
    }
    if v == -0.0 {
        v = 0.0;
    }
    format!("{v}")
}

pub(crate) fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
