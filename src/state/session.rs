use super::data::{ResultImage, SourceImage};
use crate::error::{Error, Result};
use crate::provider::{EditRequest, GrokModel};

/// Prompt the editor starts with.
pub const DEFAULT_PROMPT: &str = "MtF gender swap transformation of the subject; \
maintain pose and facial structure, but change body shape, \
clothing, and features to emphasize the new gender";

/// One run of the tool: at most one source photo and one result at a time.
///
/// The session owns the user's inputs and the last generated image. The UI
/// reads and writes it; the provider call happens elsewhere and reports back
/// through `finish_generation`.
#[derive(Debug)]
pub struct Session {
    source: Option<SourceImage>,
    result: Option<ResultImage>,
    /// Prompt Text, sent verbatim on submit
    pub prompt: String,
    pub model: GrokModel,
    pub api_key: String,
    generating: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            source: None,
            result: None,
            prompt: DEFAULT_PROMPT.to_string(),
            model: GrokModel::default(),
            api_key: String::new(),
            generating: false,
        }
    }
}

impl Session {
    pub fn new(model: GrokModel, api_key: Option<String>) -> Self {
        Self {
            model,
            api_key: api_key.unwrap_or_default(),
            ..Self::default()
        }
    }

    pub fn source(&self) -> Option<&SourceImage> {
        self.source.as_ref()
    }

    pub fn result(&self) -> Option<&ResultImage> {
        self.result.as_ref()
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    /// Replaces the source photo.
    ///
    /// Any result belongs to the previous photo, so it is dropped even if it
    /// was never saved.
    pub fn set_source(&mut self, image: SourceImage) {
        if self.result.take().is_some() {
            tracing::debug!("discarding unsaved result for previous source");
        }
        self.source = Some(image);
    }

    /// Validates inputs and snapshots the request for the provider.
    ///
    /// On success the previous result is cleared and the session is marked
    /// busy until `finish_generation` is called. On failure nothing changes.
    pub fn begin_generation(&mut self) -> Result<EditRequest> {
        if self.generating {
            return Err(Error::Busy);
        }
        let api_key = self.api_key.trim();
        if api_key.is_empty() {
            return Err(Error::Auth("enter your xAI API key".into()));
        }
        let image = self.source.clone().ok_or(Error::NoSource)?;

        let request = EditRequest {
            prompt: self.prompt.clone(),
            model: self.model,
            api_key: api_key.to_string(),
            image,
        };

        self.result = None;
        self.generating = true;
        Ok(request)
    }

    /// Records the provider's answer.
    ///
    /// A success replaces any prior result; a failure leaves the result unset.
    pub fn finish_generation(&mut self, outcome: std::result::Result<ResultImage, &Error>) {
        self.generating = false;
        match outcome {
            Ok(image) => self.result = Some(image),
            Err(err) => {
                tracing::debug!("generation failed: {err}");
                self.result = None;
            }
        }
    }

    /// The image to write when the user asks to save.
    pub fn result_for_save(&self) -> Result<&ResultImage> {
        self.result.as_ref().ok_or(Error::NoResult)
    }
}
