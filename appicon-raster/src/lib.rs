//! Rasterization capability used by appicon.
//!
//! The crate exposes a single seam, the [`Renderer`] trait, and resolves which
//! implementation is available at runtime through [`Capability::detect`].

use anyhow::Result;
use std::fmt::Debug;
use std::path::Path;

mod raster;
pub use raster::*;

#[cfg(feature = "resvg")]
mod svg;
#[cfg(feature = "resvg")]
pub use svg::ResvgRenderer;

/// Target geometry for a single rendering.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderOptions {
    /// Output width in pixels
    pub width: u32,

    /// Output height in pixels
    pub height: u32,

    /// Fraction of the output occupied by the SVG content, centered. A value of
    /// 1.0 fills the output.
    pub content_scale: f32,
}

impl RenderOptions {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            content_scale: 1.0,
        }
    }

    pub fn with_content_scale(mut self, content_scale: f32) -> Self {
        self.content_scale = content_scale;
        self
    }
}

/// Something that can turn an SVG document into pixels.
pub trait Renderer {
    /// A short name for logging.
    fn name(&self) -> &'static str;

    /// Rasterize the SVG file at `svg` into a raster of exactly the requested
    /// dimensions.
    fn render(&self, svg: &Path, options: &RenderOptions) -> Result<Raster>;
}

/// Whether SVG rendering is possible in this build.
pub enum Capability {
    Available(Box<dyn Renderer>),
    Unavailable,
}

impl Capability {
    /// Resolve the renderer compiled into this build.
    pub fn detect() -> Self {
        #[cfg(feature = "resvg")]
        {
            Capability::Available(Box::new(ResvgRenderer::new()))
        }

        #[cfg(not(feature = "resvg"))]
        {
            Capability::Unavailable
        }
    }

    pub fn renderer(&self) -> Option<&dyn Renderer> {
        match self {
            Capability::Available(renderer) => Some(renderer.as_ref()),
            Capability::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Capability::Available(_))
    }
}

impl<R: Renderer + 'static> From<R> for Capability {
    fn from(renderer: R) -> Self {
        Capability::Available(Box::new(renderer))
    }
}

impl Debug for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::Available(renderer) => write!(f, "Available({})", renderer.name()),
            Capability::Unavailable => write!(f, "Unavailable"),
        }
    }
}
