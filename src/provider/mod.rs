//! Image-generation provider (xAI Grok Imagine).
//!
//! - `grok.rs` - HTTP client for the `/images/edits` endpoint
//!
//! This module only holds the request snapshot and model choice that the
//! session hands over to the client.

pub mod grok;

pub use grok::GrokClient;

use serde::{Deserialize, Serialize};

use crate::state::SourceImage;

/// Grok Imagine model variants, trading latency for quality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrokModel {
    /// Higher quality, up to about a minute per image.
    #[default]
    #[serde(rename = "grok-imagine-image-pro")]
    ImaginePro,
    /// Faster, lower quality.
    #[serde(rename = "grok-imagine-image")]
    Imagine,
}

impl GrokModel {
    pub const ALL: [GrokModel; 2] = [GrokModel::ImaginePro, GrokModel::Imagine];

    /// Returns the API model identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ImaginePro => "grok-imagine-image-pro",
            Self::Imagine => "grok-imagine-image",
        }
    }
}

impl std::fmt::Display for GrokModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything one call to the provider needs, captured at submit time.
#[derive(Clone)]
pub struct EditRequest {
    pub prompt: String,
    pub model: GrokModel,
    pub api_key: String,
    pub image: SourceImage,
}

// Hand-written so the key never lands in logs.
impl std::fmt::Debug for EditRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditRequest")
            .field("prompt", &self.prompt)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("image_bytes", &self.image.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SourceOrigin;

    #[test]
    fn test_model_as_str() {
        assert_eq!(GrokModel::ImaginePro.as_str(), "grok-imagine-image-pro");
        assert_eq!(GrokModel::Imagine.as_str(), "grok-imagine-image");
        assert_eq!(GrokModel::default(), GrokModel::ImaginePro);
    }

    #[test]
    fn test_model_serde_uses_api_ids() {
        let json = serde_json::to_string(&GrokModel::Imagine).unwrap();
        assert_eq!(json, "\"grok-imagine-image\"");
        let back: GrokModel = serde_json::from_str("\"grok-imagine-image-pro\"").unwrap();
        assert_eq!(back, GrokModel::ImaginePro);
    }

    #[test]
    fn test_debug_redacts_key() {
        let request = EditRequest {
            prompt: "p".into(),
            model: GrokModel::Imagine,
            api_key: "xai-secret".into(),
            image: SourceImage {
                bytes: vec![1, 2, 3],
                format: image::ImageFormat::Png,
                origin: SourceOrigin::Url("https://example.com/a.png".into()),
            },
        };
        let debug = format!("{request:?}");
        assert!(!debug.contains("xai-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
