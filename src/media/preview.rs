/// Display previews for the source and result panels
///
/// Decodes the stored bytes, applies the EXIF orientation so phone photos
/// are upright, and shrinks the picture to fit the on-screen frame. The
/// bytes kept in the session are never touched.

use image::{imageops::FilterType, DynamicImage, ImageDecoder, ImageReader};
use std::io::Cursor;

use crate::error::{Error, Result};

/// Size of the image frames in the window
pub const FRAME_W: u32 = 340;
pub const FRAME_H: u32 = 340;

/// A decoded, window-sized copy of an image
#[derive(Debug, Clone)]
pub struct Preview {
    pub handle: iced::widget::image::Handle,
    /// Dimensions of the full image after orientation
    pub width: u32,
    pub height: u32,
}

/// Decode `bytes` and build a preview that fits the frame
///
/// CPU-bound; call it from `spawn_blocking`.
pub fn render(bytes: &[u8]) -> Result<Preview> {
    let img = decode_oriented(bytes)?;
    let (width, height) = (img.width(), img.height());

    // Only ever shrink; small images are shown at their real size
    let fitted = if width > FRAME_W || height > FRAME_H {
        img.resize(FRAME_W, FRAME_H, FilterType::Lanczos3)
    } else {
        img
    };

    let rgba = fitted.to_rgba8();
    let handle =
        iced::widget::image::Handle::from_rgba(rgba.width(), rgba.height(), rgba.into_raw());

    Ok(Preview {
        handle,
        width,
        height,
    })
}

/// Decode an image and rotate/flip it according to its EXIF orientation tag
pub fn decode_oriented(bytes: &[u8]) -> Result<DynamicImage> {
    let mut decoder = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| Error::Decode(e.to_string()))?
        .into_decoder()?;

    let orientation = decoder.orientation().ok();
    let mut img = DynamicImage::from_decoder(decoder)?;
    if let Some(orientation) = orientation {
        img.apply_orientation(orientation);
    }
    Ok(img)
}
