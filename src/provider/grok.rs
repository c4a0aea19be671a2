//! Grok Imagine (xAI) image editing client.

use std::borrow::Cow;
use std::io::Cursor;
use std::time::{Duration, Instant};

use base64::Engine;
use image::ImageFormat;
use serde::{Deserialize, Serialize};

use super::{EditRequest, GrokModel};
use crate::error::{sanitize_error_message, Error, Result};
use crate::state::{ResultImage, SourceImage};

pub const DEFAULT_ENDPOINT: &str = "https://api.x.ai/v1";
pub const USER_AGENT: &str = "MirrorMirror/1.0";

/// Quality used when a BMP/GIF/etc. source has to be converted for upload.
const UPLOAD_JPEG_QUALITY: u8 = 92;

/// Client for the xAI `/images/edits` endpoint.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct GrokClient {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl GrokClient {
    /// Creates a client talking to `endpoint` (e.g. `https://api.x.ai/v1`).
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Shared HTTP client, also used for loading source images from URLs.
    pub fn http(&self) -> &reqwest::Client {
        &self.client
    }

    /// Host name of the endpoint, for the activity log.
    pub fn host(&self) -> String {
        reqwest::Url::parse(&self.endpoint)
            .ok()
            .and_then(|url| url.host_str().map(str::to_owned))
            .unwrap_or_else(|| self.endpoint.clone())
    }

    fn edits_url(&self) -> String {
        format!("{}/images/edits", self.endpoint)
    }

    /// Sends the source image and prompt, returning the transformed image.
    ///
    /// Exactly one HTTP request is made to the provider (plus a download if the
    /// provider answers with a URL). Nothing is retried.
    pub async fn edit(&self, request: EditRequest) -> Result<ResultImage> {
        let start = Instant::now();
        let model = request.model;

        // base64 of a phone photo is a few MB; keep it off the UI executor
        let body = tokio::task::spawn_blocking(move || {
            GrokEditRequest::from_edit_request(&request).map(|body| (body, request.api_key))
        })
        .await??;
        let (body, api_key) = body;

        tracing::info!(model = %model, url = %self.edits_url(), "sending edit request");

        let response = self
            .client
            .post(self.edits_url())
            .bearer_auth(api_key.trim())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let err = parse_error(status.as_u16(), &text);
            tracing::warn!(status = status.as_u16(), "provider rejected request: {err}");
            return Err(err);
        }

        let grok_response: GrokResponse = response
            .json()
            .await
            .map_err(|e| Error::UnexpectedResponse(format!("malformed JSON body: {e}")))?;

        let data = self.image_bytes(grok_response).await?;

        let format = image::guess_format(&data).map_err(|_| {
            Error::UnexpectedResponse("provider returned data that is not an image".into())
        })?;

        let elapsed = start.elapsed();
        tracing::info!(
            bytes = data.len(),
            format = ?format,
            elapsed_ms = elapsed.as_millis() as u64,
            "edit complete"
        );

        Ok(ResultImage {
            bytes: data,
            format,
            model: model.as_str().to_string(),
            elapsed,
        })
    }

    /// Pulls the first image out of a response, downloading it if needed.
    async fn image_bytes(&self, response: GrokResponse) -> Result<Vec<u8>> {
        let image_data = response.data.into_iter().next().ok_or_else(|| {
            Error::UnexpectedResponse(
                "no images in response. The model may not have generated output for this prompt."
                    .into(),
            )
        })?;

        if let Some(b64) = image_data.b64_json.or(image_data.image) {
            let data = base64::engine::general_purpose::STANDARD
                .decode(b64.trim())
                .map_err(|e| Error::UnexpectedResponse(format!("invalid base64 image: {e}")))?;
            if data.is_empty() {
                return Err(Error::UnexpectedResponse("empty image payload".into()));
            }
            return Ok(data);
        }

        if let Some(url) = image_data.url {
            tracing::debug!(%url, "downloading result image");
            let img_response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| self.transport_error(e))?;
            if !img_response.status().is_success() {
                return Err(Error::Api {
                    status: img_response.status().as_u16(),
                    message: "failed to download image from URL".into(),
                });
            }
            let bytes = img_response
                .bytes()
                .await
                .map_err(|e| self.transport_error(e))?;
            return Ok(bytes.to_vec());
        }

        Err(Error::UnexpectedResponse(
            "response contained no image data".into(),
        ))
    }

    fn transport_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout(self.timeout)
        } else {
            Error::Network(err)
        }
    }
}

/// Maps a non-success status and body onto the error taxonomy.
fn parse_error(status: u16, text: &str) -> Error {
    let text = sanitize_error_message(text);
    match status {
        401 | 403 => return Error::Auth(text),
        402 => {
            return Error::Billing(
                "Insufficient credits. Check your xAI billing at console.x.ai".into(),
            )
        }
        429 => return Error::RateLimited,
        _ => {}
    }

    let lower = text.to_lowercase();
    if lower.contains("incorrect api key") || lower.contains("invalid api key") {
        return Error::Auth(text);
    }
    if lower.contains("safety")
        || lower.contains("blocked")
        || lower.contains("content_policy")
        || lower.contains("content policy")
        || lower.contains("moderated")
    {
        return Error::ContentBlocked(text);
    }
    Error::Api {
        status,
        message: text,
    }
}

/// Returns `data:<mime>;base64,...` for the source image.
///
/// PNG, JPEG and WebP go up untouched; anything else the loader accepted is
/// converted to JPEG first.
fn encode_source(image: &SourceImage) -> Result<String> {
    let (mime, bytes): (&str, Cow<'_, [u8]>) = match image.format {
        ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::WebP => {
            (image.format.to_mime_type(), Cow::Borrowed(image.bytes.as_slice()))
        }
        other => {
            let decoded = image::load_from_memory_with_format(&image.bytes, other)?;
            let mut out = Vec::new();
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
                Cursor::new(&mut out),
                UPLOAD_JPEG_QUALITY,
            );
            image::DynamicImage::ImageRgb8(decoded.to_rgb8()).write_with_encoder(encoder)?;
            ("image/jpeg", Cow::Owned(out))
        }
    };

    let b64 = base64::engine::general_purpose::STANDARD.encode(bytes.as_ref());
    Ok(format!("data:{mime};base64,{b64}"))
}

/// Image URL structure for edit endpoint.
#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

/// Request body for the image editing endpoint.
#[derive(Debug, Serialize)]
struct GrokEditRequest {
    model: String,
    prompt: String,
    /// Image as URL object (data URI).
    image: ImageUrl,
    n: u32,
    response_format: String,
}

impl GrokEditRequest {
    fn from_edit_request(req: &EditRequest) -> Result<Self> {
        Ok(Self::new(&req.prompt, req.model, encode_source(&req.image)?))
    }

    fn new(prompt: &str, model: GrokModel, data_uri: String) -> Self {
        Self {
            model: model.as_str().to_string(),
            prompt: prompt.to_string(),
            image: ImageUrl { url: data_uri },
            n: 1,
            response_format: "b64_json".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GrokResponse {
    #[serde(default)]
    data: Vec<GrokImageData>,
}

#[derive(Debug, Deserialize)]
struct GrokImageData {
    /// Base64-encoded image (when response_format is b64_json)
    #[serde(default)]
    b64_json: Option<String>,
    /// Image URL (when response_format is url)
    #[serde(default)]
    url: Option<String>,
    /// Base64-encoded image, as some edit responses name it
    #[serde(default)]
    image: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{SourceOrigin, DEFAULT_PROMPT};
    use axum::http::header::AUTHORIZATION;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(4, 3, image::Rgb([200, 40, 90]));
        let mut out = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    fn bmp_bytes() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(2, 2, image::Rgb([1, 2, 3]));
        let mut out = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Bmp)
            .unwrap();
        out
    }

    fn request(prompt: &str, api_key: &str) -> EditRequest {
        EditRequest {
            prompt: prompt.to_string(),
            model: GrokModel::ImaginePro,
            api_key: api_key.to_string(),
            image: SourceImage {
                bytes: png_bytes(),
                format: ImageFormat::Png,
                origin: SourceOrigin::File("me.png".into()),
            },
        }
    }

    const GOOD_KEY: &str = "xai-good";

    /// What the stub server saw on its last edit request
    #[derive(Debug, Default)]
    struct Captured {
        authorization: Option<String>,
        body: Option<Value>,
    }

    /// Stub xAI server. `/v1/images/edits` answers `body` when the bearer
    /// token is `GOOD_KEY` and 401 otherwise; `/slow/v1/images/edits` never
    /// answers in time.
    async fn spawn_stub(body: Value) -> (String, Arc<Mutex<Captured>>) {
        let captured = Arc::new(Mutex::new(Captured::default()));
        let seen = captured.clone();
        let result_png = png_bytes();
        let app = Router::new()
            .route(
                "/v1/images/edits",
                post(move |headers: HeaderMap, Json(req): Json<Value>| {
                    let seen = seen.clone();
                    let body = body.clone();
                    async move {
                        let authorization = headers
                            .get(AUTHORIZATION)
                            .and_then(|value| value.to_str().ok())
                            .map(str::to_string);
                        let expected = format!("Bearer {GOOD_KEY}");
                        let authorized = authorization.as_deref() == Some(expected.as_str());

                        let mut seen = seen.lock().unwrap();
                        seen.authorization = authorization;
                        seen.body = Some(req);

                        if authorized {
                            (StatusCode::OK, Json(body))
                        } else {
                            (
                                StatusCode::UNAUTHORIZED,
                                Json(json!({
                                    "code": "invalid-api-key",
                                    "error": "Incorrect API key provided"
                                })),
                            )
                        }
                    }
                }),
            )
            .route(
                "/slow/v1/images/edits",
                post(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    StatusCode::OK
                }),
            )
            .route("/files/result.png", get(move || async move { result_png }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/v1"), captured)
    }

    #[test]
    fn test_request_keeps_default_prompt_verbatim() {
        let body = GrokEditRequest::from_edit_request(&request(DEFAULT_PROMPT, "k")).unwrap();
        assert_eq!(body.prompt, DEFAULT_PROMPT);
        assert_eq!(body.model, "grok-imagine-image-pro");
        assert_eq!(body.n, 1);
        assert_eq!(body.response_format, "b64_json");
    }

    #[test]
    fn test_request_allows_empty_prompt() {
        let body = GrokEditRequest::from_edit_request(&request("", "k")).unwrap();
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["prompt"], "");
        assert!(json["image"]["url"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_request_does_not_trim_prompt() {
        let body = GrokEditRequest::from_edit_request(&request("  keep the hat \n", "k")).unwrap();
        assert_eq!(body.prompt, "  keep the hat \n");
    }

    #[test]
    fn test_png_source_is_sent_unchanged() {
        let req = request("p", "k");
        let uri = encode_source(&req.image).unwrap();
        let b64 = uri.strip_prefix("data:image/png;base64,").unwrap();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(b64)
            .unwrap();
        assert_eq!(decoded, req.image.bytes);
    }

    #[test]
    fn test_bmp_source_is_converted_to_jpeg() {
        let image = SourceImage {
            bytes: bmp_bytes(),
            format: ImageFormat::Bmp,
            origin: SourceOrigin::File("old.bmp".into()),
        };
        let uri = encode_source(&image).unwrap();
        let b64 = uri.strip_prefix("data:image/jpeg;base64,").unwrap();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(b64)
            .unwrap();
        assert_eq!(image::guess_format(&decoded).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_parse_error_mapping() {
        assert!(parse_error(401, "Incorrect API key provided").is_auth());
        assert!(parse_error(403, "forbidden").is_auth());
        assert!(parse_error(400, "{\"error\":\"Incorrect API key provided: xa***\"}").is_auth());
        assert!(matches!(parse_error(429, ""), Error::RateLimited));
        assert!(matches!(parse_error(402, ""), Error::Billing(_)));
        assert!(matches!(
            parse_error(400, "Generated image rejected by content moderation: moderated"),
            Error::ContentBlocked(_)
        ));
        assert!(matches!(
            parse_error(500, "oops"),
            Error::Api { status: 500, .. }
        ));
    }

    #[test]
    fn test_response_deserialization_variants() {
        let resp: GrokResponse =
            serde_json::from_str(r#"{"data": [{"b64_json": "AQID"}]}"#).unwrap();
        assert_eq!(resp.data[0].b64_json.as_deref(), Some("AQID"));

        let resp: GrokResponse =
            serde_json::from_str(r#"{"data": [{"url": "https://example.com/img.jpg"}]}"#).unwrap();
        assert_eq!(resp.data[0].url.as_deref(), Some("https://example.com/img.jpg"));

        let resp: GrokResponse = serde_json::from_str(r#"{"data": [{"image": "AQID"}]}"#).unwrap();
        assert_eq!(resp.data[0].image.as_deref(), Some("AQID"));

        let resp: GrokResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.data.is_empty());
    }

    #[test]
    fn test_host_from_endpoint() {
        let client = GrokClient::new(DEFAULT_ENDPOINT, Duration::from_secs(5)).unwrap();
        assert_eq!(client.host(), "api.x.ai");
    }

    #[tokio::test]
    async fn test_edit_returns_decoded_image() {
        let expected = png_bytes();
        let b64 = base64::engine::general_purpose::STANDARD.encode(&expected);
        let (endpoint, captured) = spawn_stub(json!({"data": [{"b64_json": b64}]})).await;

        let client = GrokClient::new(endpoint, Duration::from_secs(10)).unwrap();
        let result = client.edit(request(DEFAULT_PROMPT, GOOD_KEY)).await.unwrap();

        assert_eq!(result.bytes, expected);
        assert_eq!(result.format, ImageFormat::Png);
        assert_eq!(result.model, "grok-imagine-image-pro");

        let captured = captured.lock().unwrap();
        assert_eq!(captured.authorization.as_deref(), Some("Bearer xai-good"));
        let sent = captured.body.as_ref().unwrap();
        assert_eq!(sent["prompt"], DEFAULT_PROMPT);
        assert_eq!(sent["model"], "grok-imagine-image-pro");
    }

    #[tokio::test]
    async fn test_edit_downloads_url_response() {
        let (endpoint, _) = spawn_stub(json!({"data": []})).await;
        let base = endpoint.trim_end_matches("/v1").to_string();
        let client = GrokClient::new(endpoint, Duration::from_secs(10)).unwrap();

        let response = GrokResponse {
            data: vec![GrokImageData {
                b64_json: None,
                url: Some(format!("{base}/files/result.png")),
                image: None,
            }],
        };
        let bytes = client.image_bytes(response).await.unwrap();
        assert_eq!(bytes, png_bytes());
    }

    #[tokio::test]
    async fn test_edit_with_invalid_key_is_auth_error() {
        let (endpoint, captured) = spawn_stub(json!({"data": []})).await;

        let client = GrokClient::new(endpoint, Duration::from_secs(10)).unwrap();
        let err = client.edit(request("p", "xai-bad")).await.unwrap_err();
        assert!(err.is_auth(), "expected auth error, got {err}");
        assert!(err.to_string().contains("Incorrect API key"));
        assert_eq!(
            captured.lock().unwrap().authorization.as_deref(),
            Some("Bearer xai-bad")
        );
    }

    #[tokio::test]
    async fn test_edit_trims_key_in_header() {
        let b64 = base64::engine::general_purpose::STANDARD.encode(png_bytes());
        let (endpoint, captured) = spawn_stub(json!({"data": [{"b64_json": b64}]})).await;

        let client = GrokClient::new(endpoint, Duration::from_secs(10)).unwrap();
        client.edit(request("p", "  xai-good\n")).await.unwrap();
        assert_eq!(
            captured.lock().unwrap().authorization.as_deref(),
            Some("Bearer xai-good")
        );
    }

    #[tokio::test]
    async fn test_edit_times_out() {
        let (endpoint, _) = spawn_stub(json!({"data": []})).await;
        let slow = endpoint.replace("/v1", "/slow/v1");

        let client = GrokClient::new(slow, Duration::from_secs(1)).unwrap();
        let err = client.edit(request("p", GOOD_KEY)).await.unwrap_err();
        assert!(
            matches!(err, Error::Timeout(limit) if limit == Duration::from_secs(1)),
            "expected timeout, got {err}"
        );
    }

    #[tokio::test]
    async fn test_edit_with_empty_data_is_unexpected() {
        let (endpoint, _) = spawn_stub(json!({"data": []})).await;
        let client = GrokClient::new(endpoint, Duration::from_secs(10)).unwrap();
        let err = client.edit(request("p", GOOD_KEY)).await.unwrap_err();
        assert!(matches!(err, Error::UnexpectedResponse(_)));
    }
}
