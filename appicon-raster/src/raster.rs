use anyhow::{Result, bail};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::debug;

/// An RGBA8 pixel buffer with straight (non-premultiplied) alpha.
#[derive(Clone, PartialEq, Eq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl std::fmt::Debug for Raster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Raster")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl Raster {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            bail!(
                "Pixel buffer for {}x{} must be {} bytes (got {})",
                width,
                height,
                expected,
                data.len()
            );
        }

        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Create a raster where every pixel has the given color.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self {
            width,
            height,
            data: rgba.repeat(width as usize * height as usize),
        }
    }

    /// Get the RGBA value at the given coordinate.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }

        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let mut rgba = [0u8; 4];
        rgba.copy_from_slice(&self.data[offset..offset + 4]);
        Some(rgba)
    }

    /// Encode as an 8-bit RGBA PNG, creating or truncating the file.
    pub fn write_png(&self, output_path: &Path) -> Result<()> {
        let w = BufWriter::new(File::create(output_path)?);

        let mut encoder = png::Encoder::new(w, self.width, self.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&self.data)?;
        writer.finish()?;

        debug!(
            width = self.width,
            height = self.height,
            "Saved raster to: {}",
            output_path.display()
        );
        Ok(())
    }

    /// Decode an 8-bit PNG from disk, expanding it to RGBA.
    pub fn read_png(input_path: &Path) -> Result<Self> {
        let mut decoder = png::Decoder::new(BufReader::new(File::open(input_path)?));
        decoder.set_transformations(png::Transformations::normalize_to_color8());

        let mut reader = decoder.read_info()?;
        let mut buffer = vec![0u8; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buffer)?;
        buffer.truncate(info.buffer_size());

        let data = match info.color_type {
            png::ColorType::Rgba => buffer,
            png::ColorType::Rgb => buffer
                .chunks_exact(3)
                .flat_map(|p| [p[0], p[1], p[2], 255])
                .collect(),
            png::ColorType::GrayscaleAlpha => buffer
                .chunks_exact(2)
                .flat_map(|p| [p[0], p[0], p[0], p[1]])
                .collect(),
            png::ColorType::Grayscale => buffer.iter().flat_map(|&v| [v, v, v, 255]).collect(),
            png::ColorType::Indexed => bail!("Indexed PNG was not expanded"),
        };

        Raster::new(info.width, info.height, data)
    }
}
