#![forbid(unsafe_code)]

use crate::render::{HeadlessError, LayoutResult, SvgRenderOptions, render_pedigree_svg};
use pedigree_core::Pedigree;

#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error(transparent)]
    Headless(#[from] HeadlessError),
    #[error("failed to parse SVG")]
    SvgParse,
    #[error("failed to allocate pixmap for raster rendering")]
    PixmapAlloc,
    #[error("failed to encode PNG")]
    PngEncode,
    #[error("invalid background color for JPG rendering")]
    JpegBackground,
    #[error("JPG rendering requires an opaque background color (e.g. white)")]
    JpegOpaqueBackgroundRequired,
    #[error("failed to encode JPG")]
    JpegEncode,
}

pub type Result<T> = std::result::Result<T, RasterError>;

#[derive(Debug, Clone)]
pub struct RasterOptions {
    /// Pixels per SVG unit.
    pub scale: f32,
    pub background: Option<String>,
    pub jpeg_quality: u8,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            background: Some("white".to_string()),
            jpeg_quality: 90,
        }
    }
}

/// A rendered chart as RGBA pixels.
#[derive(Clone)]
pub struct RasterImage {
    pixmap: tiny_skia::Pixmap,
}

impl std::fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

impl RasterImage {
    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Premultiplied RGBA8, row-major.
    pub fn data(&self) -> &[u8] {
        self.pixmap.data()
    }

    /// RGBA of one pixel, or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let p = self.pixmap.pixel(x, y)?.demultiply();
        Some([p.red(), p.green(), p.blue(), p.alpha()])
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        self.pixmap.encode_png().map_err(|_| RasterError::PngEncode)
    }

    /// Drops the alpha channel; only valid for images rendered onto an opaque background.
    pub fn encode_jpeg(&self, quality: u8) -> Result<Vec<u8>> {
        let (w, h) = (self.width(), self.height());
        let rgba = self.pixmap.data();
        let mut rgb = vec![0u8; (w as usize) * (h as usize) * 3];
        for (src, dst) in rgba.chunks_exact(4).zip(rgb.chunks_exact_mut(3)) {
            dst.copy_from_slice(&src[..3]);
        }

        let mut out = Vec::new();
        let mut enc = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality);
        enc.encode(&rgb, w, h, image::ExtendedColorType::Rgb8)
            .map_err(|_| RasterError::JpegEncode)?;
        Ok(out)
    }
}

/// Draws a laid-out pedigree and rasterizes it at the layout's canvas size.
pub fn render(
    pedigree: &Pedigree,
    layout: &LayoutResult,
    svg_options: &SvgRenderOptions,
    options: &RasterOptions,
) -> Result<RasterImage> {
    let svg = render_pedigree_svg(pedigree, layout, svg_options).map_err(HeadlessError::from)?;
    rasterize(&svg, options)
}

pub fn rasterize(svg: &str, options: &RasterOptions) -> Result<RasterImage> {
    let pixmap = svg_to_pixmap(svg, options.scale, options.background.as_deref())?;
    Ok(RasterImage { pixmap })
}

pub fn svg_to_png(svg: &str, options: &RasterOptions) -> Result<Vec<u8>> {
    rasterize(svg, options)?.encode_png()
}

pub fn svg_to_jpeg(svg: &str, options: &RasterOptions) -> Result<Vec<u8>> {
    let bg = options.background.as_deref().unwrap_or("white");
    let Some(color) = parse_tiny_skia_color(bg) else {
        return Err(RasterError::JpegBackground);
    };
    if color.alpha() != 1.0 {
        return Err(RasterError::JpegOpaqueBackgroundRequired);
    }

    let pixmap = svg_to_pixmap(svg, options.scale, Some(bg))?;
    RasterImage { pixmap }.encode_jpeg(options.jpeg_quality)
}

fn parse_svg_viewbox(svg: &str) -> Option<(f32, f32)> {
    // Root `viewBox="minX minY w h"`; the renderer always emits one with a zero origin.
    let i = svg.find("viewBox=\"")?;
    let rest = &svg[i + "viewBox=\"".len()..];
    let end = rest.find('"')?;
    let mut it = rest[..end].split_whitespace().skip(2);
    let width = it.next()?.parse::<f32>().ok()?;
    let height = it.next()?.parse::<f32>().ok()?;
    (width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0)
        .then_some((width, height))
}

fn svg_to_pixmap(svg: &str, scale: f32, background: Option<&str>) -> Result<tiny_skia::Pixmap> {
    let mut opt = usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();
    opt.font_family = "Arial".to_string();

    let tree = usvg::Tree::from_str(svg, &opt).map_err(|_| RasterError::SvgParse)?;

    let (width, height) = parse_svg_viewbox(svg).unwrap_or_else(|| {
        let size = tree.size();
        (size.width(), size.height())
    });
    let width_px = (width * scale).ceil().max(1.0) as u32;
    let height_px = (height * scale).ceil().max(1.0) as u32;

    let mut pixmap = tiny_skia::Pixmap::new(width_px, height_px).ok_or(RasterError::PixmapAlloc)?;
    if let Some(color) = background.and_then(parse_tiny_skia_color) {
        pixmap.fill(color);
    }

    resvg::render(
        &tree,
        tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );
    tracing::debug!(width_px, height_px, "rasterized pedigree svg");
    Ok(pixmap)
}

fn parse_tiny_skia_color(text: &str) -> Option<tiny_skia::Color> {
    let s = text.trim().to_ascii_lowercase();
    match s.as_str() {
        "transparent" => return Some(tiny_skia::Color::from_rgba8(0, 0, 0, 0)),
        "white" => return Some(tiny_skia::Color::from_rgba8(255, 255, 255, 255)),
        "black" => return Some(tiny_skia::Color::from_rgba8(0, 0, 0, 255)),
        _ => {}
    }

    let hex = s.strip_prefix('#')?;
    fn hex2(b: &[u8]) -> Option<u8> {
        let hi = (*b.first()? as char).to_digit(16)? as u8;
        let lo = (*b.get(1)? as char).to_digit(16)? as u8;
        Some((hi << 4) | lo)
    }
    fn hex1(c: u8) -> Option<u8> {
        let v = (c as char).to_digit(16)? as u8;
        Some((v << 4) | v)
    }

    let bytes = hex.as_bytes();
    let [r, g, b, a] = match bytes.len() {
        3 | 4 => [
            hex1(bytes[0])?,
            hex1(bytes[1])?,
            hex1(bytes[2])?,
            bytes.get(3).map_or(Some(255), |c| hex1(*c))?,
        ],
        6 | 8 => [
            hex2(&bytes[0..2])?,
            hex2(&bytes[2..4])?,
            hex2(&bytes[4..6])?,
            bytes.get(6..8).map_or(Some(255), hex2)?,
        ],
        _ => return None,
    };
    Some(tiny_skia::Color::from_rgba8(r, g, b, a))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10" viewBox="0 0 10 10"><rect x="2" y="2" width="6" height="6" fill="black"/></svg>"#;

    #[test]
    fn svg_to_png_produces_png_signature() {
        let bytes = svg_to_png(SQUARE, &RasterOptions::default()).unwrap();
        assert!(bytes.starts_with(b"\x89PNG\r\n\x1a\n"));
    }

    #[test]
    fn svg_to_jpeg_produces_jpeg_signature() {
        let bytes = svg_to_jpeg(SQUARE, &RasterOptions::default()).unwrap();
        assert!(bytes.starts_with(&[0xFF, 0xD8, 0xFF]));
    }

    #[test]
    fn jpeg_requires_opaque_background() {
        let options = RasterOptions {
            background: Some("transparent".to_string()),
            ..RasterOptions::default()
        };
        assert!(matches!(
            svg_to_jpeg(SQUARE, &options),
            Err(RasterError::JpegOpaqueBackgroundRequired)
        ));
    }

    #[test]
    fn rasterize_fills_background_and_draws_content() {
        let image = rasterize(SQUARE, &RasterOptions::default()).unwrap();
        assert_eq!((image.width(), image.height()), (10, 10));
        assert_eq!(image.pixel(0, 0), Some([255, 255, 255, 255]));
        assert_eq!(image.pixel(5, 5), Some([0, 0, 0, 255]));
        assert_eq!(image.pixel(10, 10), None);
    }

    #[test]
    fn scale_multiplies_pixel_size() {
        let options = RasterOptions {
            scale: 2.0,
            ..RasterOptions::default()
        };
        let image = rasterize(SQUARE, &options).unwrap();
        assert_eq!((image.width(), image.height()), (20, 20));
    }

    #[test]
    fn colors_parse_in_short_and_long_form() {
        let c = parse_tiny_skia_color("#fff").unwrap();
        assert_eq!(c.to_color_u8().red(), 255);
        let c = parse_tiny_skia_color("#00000080").unwrap();
        assert_eq!(c.to_color_u8().alpha(), 128);
        assert!(parse_tiny_skia_color("#12").is_none());
        assert!(parse_tiny_skia_color("rebeccapurple").is_none());
    }

    #[test]
    fn invalid_svg_is_reported() {
        assert!(matches!(
            rasterize("<svg", &RasterOptions::default()),
            Err(RasterError::SvgParse)
        ));
    }
}
