/// Save handler for the generated image
///
/// When the chosen extension matches what the provider returned (or there is
/// no recognised extension) the bytes are written as-is, so reading the file
/// back gives exactly the result. Asking for another format re-encodes.

use chrono::{DateTime, Local};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::state::ResultImage;

/// JPEG quality used when converting to .jpg
pub const JPEG_QUALITY: u8 = 95;

/// Write the result to `path` on a blocking worker
pub async fn save_result(result: ResultImage, path: PathBuf) -> Result<PathBuf> {
    tokio::task::spawn_blocking(move || {
        write_result(&result, &path)?;
        Ok(path)
    })
    .await?
}

/// Write the result to `path`, converting only if the extension asks for it
pub fn write_result(result: &ResultImage, path: &Path) -> Result<()> {
    let data = match ImageFormat::from_path(path).ok() {
        Some(target) if target != result.format => {
            tracing::info!(from = ?result.format, to = ?target, "converting result for save");
            transcode(result, target)?
        }
        _ => result.bytes.clone(),
    };

    std::fs::write(path, &data).map_err(|e| Error::io(path, e))?;

    tracing::info!(path = %path.display(), bytes = data.len(), "💾 result saved");
    Ok(())
}

/// Re-encode in memory first so a failed encode never leaves a partial file
fn transcode(result: &ResultImage, target: ImageFormat) -> Result<Vec<u8>> {
    let img = image::load_from_memory_with_format(&result.bytes, result.format)?;
    let mut out = Vec::new();

    let encoded = match target {
        ImageFormat::Jpeg => {
            // JPEG has no alpha channel
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
                Cursor::new(&mut out),
                JPEG_QUALITY,
            );
            DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder)
        }
        other => img.write_to(&mut Cursor::new(&mut out), other),
    };
    encoded.map_err(|e| Error::Encode(e.to_string()))?;

    Ok(out)
}

/// Suggested file name for the save dialog, e.g. `mirror-mirror-20261019-142233.jpg`
pub fn default_file_name(result: &ResultImage, now: DateTime<Local>) -> String {
    format!(
        "mirror-mirror-{}.{}",
        now.format("%Y%m%d-%H%M%S"),
        result.extension()
    )
}
