//! Page images for LLM OCR requests.
//!
//! Transcription needs no colour, so pages go out as 8-bit greyscale PNG,
//! about a third of the RGBA payload and lossless on glyph edges.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder};
use tracing::debug;

/// Encode a rendered page as a base64 greyscale PNG for an OCR request.
///
/// `detail: "high"` asks OpenAI-style models to tile the image at full
/// resolution; small print is lost in the single low-detail tile.
pub fn encode_page(page: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let grey = page.to_luma8();
    let (width, height) = grey.dimensions();

    let mut png = Vec::new();
    PngEncoder::new(&mut png).write_image(grey.as_raw(), width, height, ExtendedColorType::L8)?;
    debug!("OCR image {}x{}: {} bytes PNG", width, height, png.len());

    Ok(ImageData::new(STANDARD.encode(&png), "image/png").with_detail("high"))
}
