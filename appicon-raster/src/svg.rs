use anyhow::{Context, Result, anyhow, bail};
use resvg::{tiny_skia, usvg};
use std::path::Path;
use tracing::{debug, trace};

use crate::{Raster, RenderOptions, Renderer};

/// Renders SVG files with resvg.
pub struct ResvgRenderer {
    load_system_fonts: bool,
}

impl Default for ResvgRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ResvgRenderer {
    pub fn new() -> Self {
        Self {
            load_system_fonts: true,
        }
    }

    /// Skip the system font scan. Text elements will not render.
    pub fn without_system_fonts(mut self) -> Self {
        self.load_system_fonts = false;
        self
    }

    fn parse(&self, svg: &Path) -> Result<usvg::Tree> {
        let mut options = usvg::Options::default();

        // Relative image references resolve against the SVG's own directory
        options.resources_dir = std::fs::canonicalize(svg)
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()));

        if self.load_system_fonts {
            options.fontdb_mut().load_system_fonts();
        }

        let data = std::fs::read(svg).with_context(|| format!("Failed to read {}", svg.display()))?;
        usvg::Tree::from_data(&data, &options)
            .with_context(|| format!("Failed to parse {}", svg.display()))
    }
}

/// Compute the transform that fits an SVG of `size` into the target, keeping
/// the aspect ratio and centering the result.
fn fit_transform(size: usvg::Size, options: &RenderOptions) -> tiny_skia::Transform {
    let (width, height) = (options.width as f32, options.height as f32);
    let scale = (width / size.width()).min(height / size.height()) * options.content_scale;

    let tx = (width - size.width() * scale) / 2.0;
    let ty = (height - size.height() * scale) / 2.0;

    tiny_skia::Transform::from_row(scale, 0.0, 0.0, scale, tx, ty)
}

impl Renderer for ResvgRenderer {
    fn name(&self) -> &'static str {
        "resvg"
    }

    fn render(&self, svg: &Path, options: &RenderOptions) -> Result<Raster> {
        if !(options.content_scale > 0.0 && options.content_scale <= 1.0) {
            bail!("Content scale must be in (0, 1]: {}", options.content_scale);
        }

        let tree = self.parse(svg)?;
        let size = tree.size();
        debug!(
            source = %svg.display(),
            "Parsed SVG with size {}x{}",
            size.width(),
            size.height()
        );

        let mut pixmap = tiny_skia::Pixmap::new(options.width, options.height)
            .ok_or_else(|| anyhow!("Invalid raster size {}x{}", options.width, options.height))?;

        let transform = fit_transform(size, options);
        trace!(?transform, "Rendering");
        resvg::render(&tree, transform, &mut pixmap.as_mut());

        // tiny-skia stores premultiplied alpha
        let data = pixmap
            .pixels()
            .iter()
            .flat_map(|pixel| {
                let color = pixel.demultiply();
                [color.red(), color.green(), color.blue(), color.alpha()]
            })
            .collect();

        Raster::new(options.width, options.height, data)
    }
}
