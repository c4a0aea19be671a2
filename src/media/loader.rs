/// Source image loader
///
/// Reads the photo the user picked (file dialog, drag-and-drop or URL) into
/// memory. The bytes are kept exactly as read; decoding happens once here to
/// reject files that are not images and to build the on-screen preview.

use image::ImageFormat;
use std::path::PathBuf;
use std::time::Duration;

use super::preview::{self, Preview};
use crate::error::{Error, Result};
use crate::state::{SourceImage, SourceOrigin};

/// Extensions offered by the "Image files" filter of the open dialog.
/// Anything else still loads if its content decodes.
pub const SUPPORTED_EXTENSIONS: [&str; 8] =
    ["jpg", "jpeg", "png", "webp", "bmp", "gif", "tif", "tiff"];

/// Give up on slow image URLs after this long
const URL_TIMEOUT: Duration = Duration::from_secs(15);

/// A freshly loaded source image plus its preview
#[derive(Debug, Clone)]
pub struct Loaded {
    pub image: SourceImage,
    pub preview: Preview,
}

/// Load a photo from disk
pub async fn load_from_path(path: PathBuf) -> Result<Loaded> {
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| Error::io(&path, e))?;

    // Decoding is CPU-intensive
    tokio::task::spawn_blocking(move || from_bytes(bytes, SourceOrigin::File(path))).await?
}

/// Download a photo from an http(s) URL
pub async fn load_from_url(client: reqwest::Client, url: String) -> Result<Loaded> {
    let url = url.trim().to_string();
    let parsed = reqwest::Url::parse(&url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::InvalidUrl(format!(
            "unsupported scheme '{}'",
            parsed.scheme()
        )));
    }

    let response = client
        .get(parsed)
        .timeout(URL_TIMEOUT)
        .send()
        .await
        .map_err(timeout_or_network)?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::Api {
            status: status.as_u16(),
            message: format!("could not download {url}"),
        });
    }

    let bytes = response.bytes().await.map_err(timeout_or_network)?.to_vec();

    tokio::task::spawn_blocking(move || from_bytes(bytes, SourceOrigin::Url(url))).await?
}

fn timeout_or_network(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout(URL_TIMEOUT)
    } else {
        Error::Network(err)
    }
}

/// Validate raw bytes as an image and build the preview
fn from_bytes(bytes: Vec<u8>, origin: SourceOrigin) -> Result<Loaded> {
    if bytes.is_empty() {
        return Err(Error::Decode(format!("{origin} is empty")));
    }

    let format = image::guess_format(&bytes)?;
    let preview = preview::render(&bytes)?;

    tracing::info!(
        %origin,
        bytes = bytes.len(),
        format = ?format,
        width = preview.width,
        height = preview.height,
        "📷 source image loaded"
    );

    Ok(Loaded {
        image: SourceImage {
            bytes,
            format,
            origin,
        },
        preview,
    })
}
