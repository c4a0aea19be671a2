/// Shared data structures for the application state
///
/// These are the two images a session juggles: the photo the user picked and
/// the picture the provider sent back. Both keep the exact bytes they were
/// created from; previews for the window are built separately.

use image::ImageFormat;
use std::path::PathBuf;
use std::time::Duration;

/// Where a source photo came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOrigin {
    /// Picked in the file dialog or dropped on the window
    File(PathBuf),
    /// Downloaded from a URL typed by the user
    Url(String),
}

impl std::fmt::Display for SourceOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Url(url) => write!(f, "{}", url),
        }
    }
}

/// The photo to transform, exactly as read from disk or the network
#[derive(Debug, Clone, PartialEq)]
pub struct SourceImage {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    pub origin: SourceOrigin,
}

impl SourceImage {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }
}

/// The transformed image returned by the provider
#[derive(Debug, Clone, PartialEq)]
pub struct ResultImage {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    /// Model id that produced it (e.g. "grok-imagine-image-pro")
    pub model: String,
    /// Wall time of the provider round trip
    pub elapsed: Duration,
}

impl ResultImage {
    /// File extension matching the returned bytes
    pub fn extension(&self) -> &'static str {
        self.format.extensions_str().first().copied().unwrap_or("png")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_extension_follows_format() {
        let result = ResultImage {
            bytes: vec![0xFF, 0xD8, 0xFF],
            format: ImageFormat::Jpeg,
            model: "grok-imagine-image".into(),
            elapsed: Duration::from_secs(3),
        };
        assert_eq!(result.extension(), "jpg");
    }

    #[test]
    fn test_origin_display() {
        let origin = SourceOrigin::Url("https://example.com/cat.png".into());
        assert_eq!(origin.to_string(), "https://example.com/cat.png");
    }
}
