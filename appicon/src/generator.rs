use anyhow::{Context, Result, bail};
use appicon_raster::{Capability, RenderOptions};
use console::{Emoji, Style};
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::config::{IconConfig, OutputRole};

static CROSS: Emoji<'_, '_> = Emoji("❌ ", "error: ");
static PALETTE: Emoji<'_, '_> = Emoji("🎨 ", "");
static CHECK: Emoji<'_, '_> = Emoji("✓ ", "+ ");
static SPARKLE: Emoji<'_, '_> = Emoji("✅ ", "");

/// Web converters suggested when no renderer is built in.
pub const ONLINE_CONVERTERS: [&str; 2] = [
    "https://www.svgtopng.com/",
    "https://cloudconvert.com/svg-to-png",
];

/// Result of a generator run that did not hit an unexpected error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Every output was written, in configuration order
    Generated(Vec<PathBuf>),

    /// No renderer is available in this build
    MissingCapability,

    /// The SVG template does not exist
    MissingSource(PathBuf),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Generated(_))
    }
}

/// Rasterize the configured SVG into every configured output, writing console
/// messages to `out`.
///
/// The configuration should already be resolved against the project root.
/// Nothing is written to disk unless a renderer is available and the source
/// exists. Render and write failures are returned as errors; outputs written
/// before the failure are left in place.
pub fn generate(
    config: &IconConfig,
    capability: &Capability,
    out: &mut dyn Write,
) -> Result<Outcome> {
    let Some(renderer) = capability.renderer() else {
        print_missing_capability(config, out)?;
        return Ok(Outcome::MissingCapability);
    };

    if !config.source.is_file() {
        writeln!(
            out,
            "{}SVG file not found: {}",
            CROSS,
            config.source.display()
        )?;
        return Ok(Outcome::MissingSource(config.source.clone()));
    }

    let output_dir = config.output_dir();
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    writeln!(out, "{}Generating app icons...", PALETTE)?;
    debug!(renderer = renderer.name(), source = %config.source.display(), "Starting generation");

    let mut written = Vec::with_capacity(config.outputs.len());
    for output in &config.outputs {
        let path = config.output_path(output);
        let options = RenderOptions::new(output.width, output.height)
            .with_content_scale(output.content_scale);

        info!(
            role = %output.role,
            width = output.width,
            height = output.height,
            "Rendering {}",
            output.name
        );

        let raster = renderer
            .render(&config.source, &options)
            .with_context(|| format!("Failed to render {}", output.name))?;

        if (raster.width, raster.height) != (output.width, output.height) {
            bail!(
                "Renderer produced {}x{} for {} (expected {}x{})",
                raster.width,
                raster.height,
                output.name,
                output.width,
                output.height
            );
        }

        raster
            .write_png(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        writeln!(out, "   {}Created {}", CHECK, path.display())?;
        written.push(path);
    }

    let green = Style::new().green().bold();
    writeln!(out)?;
    writeln!(out, "{}{}", SPARKLE, green.apply_to("Icons generated successfully!"))?;

    if !config.next_steps.is_empty() {
        writeln!(out)?;
        writeln!(out, "Next steps:")?;
        for (i, step) in config.next_steps.iter().enumerate() {
            writeln!(out, "   {}. {}", i + 1, step)?;
        }
    }

    Ok(Outcome::Generated(written))
}

fn print_missing_capability(config: &IconConfig, out: &mut dyn Write) -> Result<()> {
    let yellow = Style::new().yellow();

    writeln!(out, "{}No SVG renderer available. Rebuild with:", CROSS)?;
    writeln!(out, "   {}", yellow.apply_to("cargo install appicon --features resvg"))?;
    writeln!(out)?;
    writeln!(out, "Alternatively, manually create these PNG files:")?;
    for output in &config.outputs {
        let padding = match output.role {
            OutputRole::Foreground => ", with padding",
            OutputRole::Icon => "",
        };
        writeln!(
            out,
            "   - {} ({}x{}{})",
            config.output_path(output).display(),
            output.width,
            output.height,
            padding
        )?;
    }
    writeln!(out)?;
    writeln!(out, "You can use online tools like:")?;
    for url in ONLINE_CONVERTERS {
        writeln!(out, "   - {}", url)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use appicon_raster::{Raster, Renderer};
    use std::cell::Cell;
    use std::path::Path;
    use std::rc::Rc;

    const ICON_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="64" height="64">
  <rect width="64" height="64" rx="8" fill="#1e88e5"/>
  <circle cx="32" cy="32" r="16" fill="#ffffff"/>
</svg>"##;

    /// Fills the whole raster with a color derived from the content scale.
    #[derive(Default)]
    struct FakeRenderer {
        calls: Rc<Cell<usize>>,
    }

    impl Renderer for FakeRenderer {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn render(&self, _svg: &Path, options: &RenderOptions) -> Result<Raster> {
            self.calls.set(self.calls.get() + 1);
            let shade = (options.content_scale * 255.0) as u8;
            Ok(Raster::filled(options.width, options.height, [shade, 0, 0, 255]))
        }
    }

    struct FailingRenderer;

    impl Renderer for FailingRenderer {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn render(&self, _svg: &Path, _options: &RenderOptions) -> Result<Raster> {
            bail!("rasterizer exploded")
        }
    }

    struct UndersizedRenderer;

    impl Renderer for UndersizedRenderer {
        fn name(&self) -> &'static str {
            "undersized"
        }

        fn render(&self, _svg: &Path, _options: &RenderOptions) -> Result<Raster> {
            Ok(Raster::filled(1, 1, [0, 0, 0, 0]))
        }
    }

    fn project(with_svg: bool) -> Result<(tempfile::TempDir, IconConfig)> {
        let tmp = tempfile::tempdir()?;
        let config = IconConfig::default().resolve(tmp.path());
        if with_svg {
            std::fs::create_dir_all(config.source.parent().unwrap())?;
            std::fs::write(&config.source, ICON_SVG)?;
        }
        Ok((tmp, config))
    }

    fn png_count(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter(|e| e.path().extension().is_some_and(|ext| ext == "png"))
                    .count()
            })
            .unwrap_or(0)
    }

    #[test_log::test]
    fn test_missing_capability() -> Result<()> {
        let (tmp, config) = project(true)?;
        let mut out: Vec<u8> = Vec::new();

        let outcome = generate(&config, &Capability::Unavailable, &mut out)?;
        assert_eq!(outcome, Outcome::MissingCapability);
        assert!(!outcome.is_success());

        let text = String::from_utf8(out)?;
        assert!(text.contains("manually create"));
        assert!(text.contains("app_icon_foreground.png (1024x1024, with padding)"));
        for url in ONLINE_CONVERTERS {
            assert!(text.contains(url));
        }

        assert_eq!(png_count(&config.output_dir()), 0);
        drop(tmp);
        Ok(())
    }

    #[test]
    fn test_missing_capability_checked_before_source() -> Result<()> {
        let (_tmp, config) = project(false)?;
        let outcome = generate(&config, &Capability::Unavailable, &mut std::io::sink())?;
        assert_eq!(outcome, Outcome::MissingCapability);
        Ok(())
    }

    #[test_log::test]
    fn test_missing_source() -> Result<()> {
        let (tmp, config) = project(false)?;
        let renderer = FakeRenderer::default();
        let capability = Capability::from(renderer);
        let mut out: Vec<u8> = Vec::new();

        let outcome = generate(&config, &capability, &mut out)?;
        assert_eq!(outcome, Outcome::MissingSource(config.source.clone()));
        assert!(!outcome.is_success());

        let text = String::from_utf8(out)?;
        assert!(text.contains(&format!("SVG file not found: {}", config.source.display())));

        // Not even the output directory is created
        assert!(!config.output_dir().exists());
        assert_eq!(png_count(tmp.path()), 0);
        Ok(())
    }

    #[test_log::test]
    fn test_generate_outputs() -> Result<()> {
        let (_tmp, config) = project(true)?;
        let mut out: Vec<u8> = Vec::new();

        let outcome = generate(&config, &Capability::from(FakeRenderer::default()), &mut out)?;
        assert!(outcome.is_success());

        let expected: Vec<PathBuf> = config
            .outputs
            .iter()
            .map(|output| config.output_path(output))
            .collect();
        assert_eq!(outcome, Outcome::Generated(expected.clone()));

        for path in &expected {
            let raster = Raster::read_png(path)?;
            assert_eq!((raster.width, raster.height), (1024, 1024));
        }

        let text = String::from_utf8(out)?;
        assert!(text.contains(&format!("Created {}", expected[0].display())));
        assert!(text.contains(&format!("Created {}", expected[1].display())));
        assert!(text.contains("Icons generated successfully!"));
        assert!(text.contains("1. Run: flutter pub get"));
        assert!(text.contains("3. Build your app: flutter build apk --release"));
        Ok(())
    }

    #[test]
    fn test_foreground_identical_by_default() -> Result<()> {
        let (_tmp, config) = project(true)?;
        generate(&config, &Capability::from(FakeRenderer::default()), &mut std::io::sink())?;

        let icon = std::fs::read(config.output_path(&config.outputs[0]))?;
        let foreground = std::fs::read(config.output_path(&config.outputs[1]))?;
        assert_eq!(icon, foreground);
        Ok(())
    }

    #[test]
    fn test_padded_foreground_differs() -> Result<()> {
        let (_tmp, config) = project(true)?;
        let config = config.pad_foreground();
        generate(&config, &Capability::from(FakeRenderer::default()), &mut std::io::sink())?;

        let icon = Raster::read_png(&config.output_path(&config.outputs[0]))?;
        let foreground = Raster::read_png(&config.output_path(&config.outputs[1]))?;
        assert_ne!(icon.pixel(0, 0), foreground.pixel(0, 0));
        Ok(())
    }

    #[test]
    fn test_idempotent() -> Result<()> {
        let (_tmp, config) = project(true)?;
        let capability = Capability::from(FakeRenderer::default());

        generate(&config, &capability, &mut std::io::sink())?;
        let first: Vec<Vec<u8>> = config
            .outputs
            .iter()
            .map(|o| std::fs::read(config.output_path(o)))
            .collect::<std::io::Result<_>>()?;

        generate(&config, &capability, &mut std::io::sink())?;
        let second: Vec<Vec<u8>> = config
            .outputs
            .iter()
            .map(|o| std::fs::read(config.output_path(o)))
            .collect::<std::io::Result<_>>()?;

        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn test_regenerates_deleted_output() -> Result<()> {
        let (_tmp, config) = project(true)?;
        let capability = Capability::from(FakeRenderer::default());
        generate(&config, &capability, &mut std::io::sink())?;

        let foreground = config.output_path(&config.outputs[1]);
        std::fs::remove_file(&foreground)?;

        assert!(generate(&config, &capability, &mut std::io::sink())?.is_success());
        let raster = Raster::read_png(&foreground)?;
        assert_eq!((raster.width, raster.height), (1024, 1024));
        Ok(())
    }

    #[test]
    fn test_renders_each_output_once() -> Result<()> {
        let (_tmp, config) = project(true)?;
        let renderer = FakeRenderer::default();
        let calls = renderer.calls.clone();

        generate(&config, &Capability::from(renderer), &mut std::io::sink())?;
        assert_eq!(calls.get(), config.outputs.len());
        Ok(())
    }

    #[test]
    fn test_render_failure_propagates() -> Result<()> {
        let (_tmp, config) = project(true)?;
        let result = generate(&config, &Capability::from(FailingRenderer), &mut std::io::sink());

        let error = result.unwrap_err();
        assert!(format!("{:#}", error).contains("rasterizer exploded"));
        assert_eq!(png_count(&config.output_dir()), 0);
        Ok(())
    }

    #[test]
    fn test_wrong_size_rejected() -> Result<()> {
        let (_tmp, config) = project(true)?;
        let capability = Capability::from(UndersizedRenderer);
        assert!(generate(&config, &capability, &mut std::io::sink()).is_err());
        assert_eq!(png_count(&config.output_dir()), 0);
        Ok(())
    }

    #[test]
    #[cfg(feature = "resvg")]
    fn test_generate_with_resvg() -> Result<()> {
        use appicon_raster::ResvgRenderer;

        let (_tmp, config) = project(true)?;
        let capability = Capability::from(ResvgRenderer::new().without_system_fonts());

        let outcome = generate(&config, &capability, &mut std::io::sink())?;
        let Outcome::Generated(paths) = outcome else {
            panic!("Expected outputs");
        };

        let mut first = Vec::new();
        for path in &paths {
            let raster = Raster::read_png(path)?;
            assert_eq!((raster.width, raster.height), (1024, 1024));
            assert_eq!(raster.pixel(512, 512), Some([255, 255, 255, 255]));
            first.push(std::fs::read(path)?);
        }

        generate(&config, &capability, &mut std::io::sink())?;
        for (path, bytes) in paths.iter().zip(first) {
            assert_eq!(std::fs::read(path)?, bytes);
        }
        Ok(())
    }
}
