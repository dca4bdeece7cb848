use crate::error::{Error, Result};
use image::ImageEncoder;
use image::RgbImage;
use std::path::Path;

pub use ab_glyph::FontVec;

/// Writes an annotated frame as a PNG file.
pub fn save(path: &Path, frame: &RgbImage) -> Result<()> {
    let output = std::io::BufWriter::new(std::fs::File::create(path)?);
    let encoder = image::codecs::png::PngEncoder::new(output);

    encoder.write_image(frame.as_raw(), frame.width(), frame.height(), image::ExtendedColorType::Rgb8)?;

    Ok(())
}

/// Loads a TrueType/OpenType font used for track labels.
pub fn load_font(path: &Path) -> Result<FontVec> {
    let bytes = std::fs::read(path)?;
    FontVec::try_from_vec(bytes).map_err(|e| Error::Font {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Standard file name for the n-th annotated frame.
pub fn frame_file_name(frame_number: u64) -> String {
    format!("frame_{frame_number:05}.png")
}
