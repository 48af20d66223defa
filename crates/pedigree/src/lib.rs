#![forbid(unsafe_code)]

//! `pedigree` turns a free-text family description into a standard pedigree chart.
//!
//! The text is parsed (optionally through an LLM assistant, falling back to the built-in
//! grammars), validated into a [`Pedigree`] graph, laid out by generation and drawn as SVG, PNG or
//! JPEG.
//!
//! # Features
//!
//! - `render`: layout + SVG rendering (`pedigree::render`)
//! - `raster`: PNG/JPEG output via pure-Rust SVG rasterization (default)
//! - `assistant`: the HTTP assistant transport

pub use pedigree_core::*;

#[cfg(feature = "render")]
pub mod render {
    pub use pedigree_render::canvas::{Canvas, SvgCanvas};
    pub use pedigree_render::layout::layout_with_options;
    pub use pedigree_render::model::LayoutResult;
    pub use pedigree_render::svg::{SvgRenderOptions, render_pedigree, render_pedigree_svg};
    pub use pedigree_render::text::{DeterministicTextMeasurer, TextMeasurer};
    pub use pedigree_render::{LayoutOptions, canvas_size};

    use pedigree_core::{
        Assistant, AssistantConfig, AssistantTransport, Engine, Pedigree, PedigreeConfig,
    };

    #[cfg(feature = "raster")]
    pub mod raster;

    #[cfg(feature = "assistant")]
    fn http_transport() -> Option<Box<dyn AssistantTransport>> {
        Some(Box::new(pedigree_core::assistant::HttpAssistant::new()))
    }

    #[cfg(not(feature = "assistant"))]
    fn http_transport() -> Option<Box<dyn AssistantTransport>> {
        None
    }

    #[derive(Debug, thiserror::Error)]
    pub enum HeadlessError {
        #[error(transparent)]
        Parse(#[from] pedigree_core::Error),
        #[error(transparent)]
        Render(#[from] pedigree_render::Error),
    }

    pub type Result<T> = std::result::Result<T, HeadlessError>;

    /// Bundles the parser, layout and drawing options for one chart style.
    ///
    /// Every call is independent: nothing is cached between requests and the generator is never
    /// mutated by a call.
    #[derive(Debug, Clone)]
    pub struct PedigreeGenerator {
        pub engine: Engine,
        pub config: PedigreeConfig,
        pub layout: LayoutOptions,
        pub svg: SvgRenderOptions,
        /// Used only when a call asks for the assistant.
        pub assistant: Option<AssistantConfig>,
        pub canvas_width: f64,
        pub canvas_height: f64,
    }

    impl Default for PedigreeGenerator {
        fn default() -> Self {
            Self::from_config(PedigreeConfig::defaults())
        }
    }

    impl PedigreeGenerator {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn from_config(config: PedigreeConfig) -> Self {
            let (canvas_width, canvas_height) = canvas_size(&config);
            Self {
                engine: Engine::new(),
                layout: LayoutOptions::from_config(&config),
                svg: SvgRenderOptions::from_config(&config),
                assistant: None,
                canvas_width,
                canvas_height,
                config,
            }
        }

        pub fn with_assistant(mut self, assistant: AssistantConfig) -> Self {
            self.assistant = Some(assistant);
            self
        }

        pub fn with_canvas_size(mut self, width: f64, height: f64) -> Self {
            self.canvas_width = width;
            self.canvas_height = height;
            self
        }

        /// Parses and builds a pedigree. With `use_assistant`, the configured assistant is tried
        /// first over HTTP; without the `assistant` feature or an assistant config, the built-in
        /// grammars are used directly.
        pub fn parse_family_description(&self, text: &str, use_assistant: bool) -> Result<Pedigree> {
            if use_assistant {
                match (&self.assistant, http_transport()) {
                    (Some(config), Some(transport)) => {
                        return self.parse_family_description_with(text, config, transport.as_ref());
                    }
                    _ => tracing::warn!("no assistant transport available; using text grammars"),
                }
            }
            Ok(self.engine.parse_pedigree(text, None)?)
        }

        /// Like [`Self::parse_family_description`] with an explicit transport.
        pub fn parse_family_description_with(
            &self,
            text: &str,
            config: &AssistantConfig,
            transport: &dyn AssistantTransport,
        ) -> Result<Pedigree> {
            Ok(self
                .engine
                .parse_pedigree(text, Some(Assistant { config, transport }))?)
        }

        pub fn layout(&self, pedigree: &Pedigree) -> Result<LayoutResult> {
            Ok(layout_with_options(
                pedigree,
                self.canvas_width,
                self.canvas_height,
                &self.layout,
            )?)
        }

        pub fn generate_svg(&self, pedigree: &Pedigree) -> Result<String> {
            let layout = self.layout(pedigree)?;
            Ok(render_pedigree_svg(pedigree, &layout, &self.svg)?)
        }

        #[cfg(feature = "raster")]
        pub fn generate_image(&self, pedigree: &Pedigree) -> raster::Result<raster::RasterImage> {
            let layout = self.layout(pedigree)?;
            raster::render(pedigree, &layout, &self.svg, &self.raster_options())
        }

        #[cfg(feature = "raster")]
        pub fn generate_png_bytes(&self, pedigree: &Pedigree) -> raster::Result<Vec<u8>> {
            self.generate_image(pedigree)?.encode_png()
        }

        #[cfg(feature = "raster")]
        pub fn generate_jpeg_bytes(&self, pedigree: &Pedigree) -> raster::Result<Vec<u8>> {
            let svg = self.generate_svg(pedigree)?;
            raster::svg_to_jpeg(&svg, &self.raster_options())
        }

        #[cfg(feature = "raster")]
        pub fn raster_options(&self) -> raster::RasterOptions {
            let defaults = raster::RasterOptions::default();
            raster::RasterOptions {
                background: Some(self.svg.background.clone()),
                jpeg_quality: self
                    .config
                    .get_u64("render.jpegQuality")
                    .map(|q| q.clamp(1, 100) as u8)
                    .unwrap_or(defaults.jpeg_quality),
                ..defaults
            }
        }
    }
}
