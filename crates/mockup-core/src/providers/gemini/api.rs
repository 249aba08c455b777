//! Gemini API key provider (Generative Language API) for image generation and edits.

use std::time::Duration;

use anyhow::{Context, Result};
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{Value, json};

use crate::capability::{CapabilityFailure, CapabilityFuture, ImageCapability, ImageRequest};
use crate::images::{EncodedPayload, MediaType, classify_media_type, sniff_media_type};
use crate::prompts::{render_edit_prompt, render_mockup_prompt};
use crate::providers::shared::{
    ProviderError, USER_AGENT, classify_reqwest_error, resolve_api_key, resolve_base_url,
};
use crate::session::GeneratedImage;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Image-capable Gemini model used when none is configured.
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";

/// Hints forwarded as `generationConfig.imageConfig`.
#[derive(Debug, Clone, Default)]
pub struct GeminiImageOptions {
    pub aspect_ratio: Option<String>,
    pub image_size: Option<String>,
}

/// Gemini API configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub options: GeminiImageOptions,
    /// Whole-request timeout; `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl GeminiConfig {
    /// The config-file key beats `GEMINI_API_KEY`. For the endpoint,
    /// `GEMINI_BASE_URL` beats the config file, which beats the public API.
    ///
    /// # Errors
    /// Returns an error if no API key is available or the base URL is invalid.
    pub fn from_env(
        model: String,
        config_base_url: Option<&str>,
        config_api_key: Option<&str>,
        options: GeminiImageOptions,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let api_key = resolve_api_key(config_api_key, "GEMINI_API_KEY", "gemini")?;
        let base_url = resolve_base_url(
            config_base_url,
            "GEMINI_BASE_URL",
            DEFAULT_BASE_URL,
            "Gemini",
        )?;

        Ok(Self {
            api_key,
            base_url,
            model,
            options,
            timeout,
        })
    }
}

/// Gemini client.
pub struct GeminiClient {
    config: GeminiConfig,
    http: reqwest::Client,
}

impl GeminiClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("build HTTP client")?;
        Ok(Self { config, http })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Sends a generate or edit request and returns the first image.
    ///
    /// # Errors
    /// Returns a [`ProviderError`] (inside `anyhow`) for transport, HTTP,
    /// and response problems.
    pub async fn request_image(&self, request: &ImageRequest) -> Result<GeneratedImage> {
        let body = build_image_request(request, &self.config.options)
            .map_err(|e| ProviderError::parse(format!("Failed to render prompt: {e}")))?;
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url, self.config.model
        );

        tracing::debug!(kind = request.kind(), model = %self.config.model, "sending Gemini image request");
        let response = self
            .http
            .post(url)
            .headers(build_headers(&self.config.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::http_status(status.as_u16(), &body).into());
        }
        let body = response
            .text()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        let value: Value = serde_json::from_str(&body).map_err(|e| {
            ProviderError::parse(format!("Failed to parse Gemini image response JSON: {e}"))
        })?;
        Ok(parse_image_response(&value)?)
    }
}

impl ImageCapability for GeminiClient {
    fn invoke<'a>(&'a self, request: &'a ImageRequest) -> CapabilityFuture<'a> {
        Box::pin(async move {
            self.request_image(request)
                .await
                .map_err(|error| match error.downcast::<ProviderError>() {
                    Ok(provider_error) => CapabilityFailure::from(provider_error),
                    Err(other) => CapabilityFailure::from(other),
                })
        })
    }
}

fn build_image_request(
    request: &ImageRequest,
    options: &GeminiImageOptions,
) -> std::result::Result<Value, String> {
    let prompt = match request {
        ImageRequest::Generate { description, .. } => render_mockup_prompt(description)?,
        ImageRequest::Edit { instruction, .. } => render_edit_prompt(instruction)?,
    };
    let image = request.image();

    let mut generation_config = json!({
        "responseModalities": ["IMAGE", "TEXT"]
    });

    let mut image_config = serde_json::Map::new();
    if let Some(aspect_ratio) = options.aspect_ratio.as_deref()
        && !aspect_ratio.trim().is_empty()
    {
        image_config.insert("aspectRatio".to_string(), json!(aspect_ratio.trim()));
    }
    if let Some(image_size) = options.image_size.as_deref()
        && !image_size.trim().is_empty()
    {
        image_config.insert("imageSize".to_string(), json!(image_size.trim()));
    }
    if !image_config.is_empty() {
        generation_config["imageConfig"] = Value::Object(image_config);
    }

    Ok(json!({
        "contents": [{
            "role": "user",
            "parts": [
                inline_data_part(image.media_type.mime_type(), &image.data),
                { "text": prompt }
            ]
        }],
        "generationConfig": generation_config,
    }))
}

fn inline_data_part(mime_type: &str, data: &str) -> Value {
    json!({
        "inlineData": {
            "mimeType": mime_type,
            "data": data
        }
    })
}

/// Extracts the first image (and any text) from a `generateContent` response.
///
/// The response media type goes through the same allow-list as uploads.
/// When the response does not declare one, it is sniffed from the bytes.
fn parse_image_response(value: &Value) -> std::result::Result<GeneratedImage, ProviderError> {
    let payload = value.get("response").unwrap_or(value);
    let mut text_parts = Vec::new();
    let mut image = None;
    let mut finish_reason = None;

    let candidates = payload
        .get("candidates")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for candidate in candidates {
        if finish_reason.is_none() {
            finish_reason = candidate.get("finishReason").and_then(Value::as_str);
        }

        let parts = candidate
            .get("content")
            .and_then(|content| content.get("parts"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        for part in parts {
            if let Some(text) = part.get("text").and_then(Value::as_str)
                && !text.trim().is_empty()
            {
                text_parts.push(text.trim().to_string());
            }

            if image.is_some() {
                continue;
            }
            let Some(inline_data) = part.get("inlineData").or_else(|| part.get("inline_data"))
            else {
                continue;
            };
            image = Some(parse_inline_image(inline_data)?);
        }
    }

    let commentary = (!text_parts.is_empty()).then(|| text_parts.join("\n"));
    if let Some(payload) = image {
        return Ok(GeneratedImage::new(payload).with_commentary(commentary));
    }

    if let Some(reason) = payload
        .get("promptFeedback")
        .and_then(|feedback| feedback.get("blockReason"))
        .and_then(Value::as_str)
    {
        return Err(ProviderError::api_error(format!(
            "Request blocked by the image service ({reason})"
        )));
    }
    if let Some(text) = commentary {
        return Err(ProviderError::api_error(format!(
            "Model returned no image. Model text: {text}"
        )));
    }
    match finish_reason {
        Some(reason) if reason != "STOP" => Err(ProviderError::api_error(format!(
            "Model returned no image (finish reason: {reason})"
        ))),
        _ => Err(ProviderError::api_error("Model returned no image")),
    }
}

fn parse_inline_image(inline_data: &Value) -> std::result::Result<EncodedPayload, ProviderError> {
    let data = inline_data
        .get("data")
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderError::parse("Gemini image response is missing inlineData.data"))?;

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| ProviderError::parse(format!("Failed to decode base64 image data: {e}")))?;

    let declared = inline_data
        .get("mimeType")
        .or_else(|| inline_data.get("mime_type"))
        .and_then(Value::as_str)
        .filter(|mime| !mime.trim().is_empty());

    let media_type: MediaType = match declared {
        Some(mime) => classify_media_type(mime).ok().ok_or_else(|| {
            ProviderError::parse(format!("Image service returned unsupported media type '{mime}'"))
        })?,
        None => sniff_media_type(&bytes).ok_or_else(|| {
            ProviderError::parse("Image service returned an image of unknown media type")
        })?,
    };

    Ok(EncodedPayload::new(data, media_type))
}

fn build_headers(api_key: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        "x-goog-api-key",
        HeaderValue::from_str(api_key).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    headers.insert("accept", HeaderValue::from_static("application/json"));
    headers.insert("content-type", HeaderValue::from_static("application/json"));
    headers.insert("user-agent", HeaderValue::from_static(USER_AGENT));
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderErrorKind;

    const PNG_B64: &str = "iVBORw0KGgoAAAAA";

    fn generate_request() -> ImageRequest {
        ImageRequest::Generate {
            reference: EncodedPayload::new("AQID", MediaType::Png),
            description: "a white t-shirt".to_string(),
        }
    }

    #[test]
    fn build_request_sends_reference_image_and_prompt() {
        let request =
            build_image_request(&generate_request(), &GeminiImageOptions::default()).unwrap();

        let parts = &request["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], json!("image/png"));
        assert_eq!(parts[0]["inlineData"]["data"], json!("AQID"));
        assert!(
            parts[1]["text"]
                .as_str()
                .unwrap()
                .contains("a white t-shirt")
        );
        assert_eq!(
            request["generationConfig"]["responseModalities"],
            json!(["IMAGE", "TEXT"])
        );
        assert!(request["generationConfig"].get("imageConfig").is_none());
    }

    #[test]
    fn build_request_for_edit_uses_current_image_and_instruction() {
        let edit = ImageRequest::Edit {
            current: EncodedPayload::new("BAUG", MediaType::Jpeg),
            instruction: "add a retro filter".to_string(),
        };
        let request = build_image_request(
            &edit,
            &GeminiImageOptions {
                aspect_ratio: Some("4:5".to_string()),
                image_size: Some(" ".to_string()),
            },
        )
        .unwrap();

        let parts = &request["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], json!("image/jpeg"));
        assert_eq!(parts[0]["inlineData"]["data"], json!("BAUG"));
        assert!(
            parts[1]["text"]
                .as_str()
                .unwrap()
                .contains("add a retro filter")
        );
        assert_eq!(
            request["generationConfig"]["imageConfig"],
            json!({ "aspectRatio": "4:5" })
        );
    }

    #[test]
    fn parse_response_extracts_image_and_text() {
        let value = json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "Here is your mockup." },
                        { "inlineData": { "mimeType": "image/jpeg", "data": "AQID" } }
                    ]
                },
                "finishReason": "STOP"
            }]
        });

        let image = parse_image_response(&value).unwrap();
        assert_eq!(image.payload, EncodedPayload::new("AQID", MediaType::Jpeg));
        assert_eq!(image.commentary.as_deref(), Some("Here is your mockup."));
    }

    #[test]
    fn parse_response_sniffs_missing_mime_type() {
        let value = json!({
            "response": {
                "candidates": [{
                    "content": { "parts": [{ "inline_data": { "data": PNG_B64 } }] }
                }]
            }
        });

        let image = parse_image_response(&value).unwrap();
        assert_eq!(image.payload.media_type, MediaType::Png);
        assert_eq!(image.commentary, None);
    }

    #[test]
    fn parse_response_rejects_unsupported_mime_type() {
        let value = json!({
            "candidates": [{
                "content": { "parts": [{ "inlineData": { "mimeType": "image/gif", "data": "AQID" } }] }
            }]
        });

        let err = parse_image_response(&value).unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Parse);
        assert!(err.message.contains("image/gif"));
    }

    #[test]
    fn parse_response_rejects_unknown_bytes_without_mime_type() {
        let value = json!({
            "candidates": [{
                "content": { "parts": [{ "inlineData": { "data": "AQID" } }] }
            }]
        });

        let err = parse_image_response(&value).unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Parse);
    }

    #[test]
    fn parse_response_without_image_reports_model_text() {
        let value = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "I can't help with that." }] }
            }]
        });

        let err = parse_image_response(&value).unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::ApiError);
        assert_eq!(
            err.message,
            "Model returned no image. Model text: I can't help with that."
        );
    }

    #[test]
    fn parse_response_reports_block_reason() {
        let value = json!({ "promptFeedback": { "blockReason": "SAFETY" } });

        let err = parse_image_response(&value).unwrap_err();
        assert_eq!(err.message, "Request blocked by the image service (SAFETY)");
    }

    #[test]
    fn parse_response_reports_finish_reason() {
        let value = json!({
            "candidates": [{ "content": { "parts": [] }, "finishReason": "IMAGE_SAFETY" }]
        });

        let err = parse_image_response(&value).unwrap_err();
        assert_eq!(
            err.message,
            "Model returned no image (finish reason: IMAGE_SAFETY)"
        );
    }

    /// Accepts one request, then answers 200 with a body shorter than its
    /// declared length.
    fn truncated_body_server() -> Option<String> {
        use std::io::{Read, Write};

        let listener = std::net::TcpListener::bind("127.0.0.1:0").ok()?;
        let addr = listener.local_addr().ok()?;
        std::thread::spawn(move || {
            let Ok((mut stream, _)) = listener.accept() else {
                return;
            };
            let mut request = Vec::new();
            let mut buf = [0u8; 8192];
            while !request_complete(&request) {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => return,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let _ = stream.write_all(
                b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 64\r\n\r\n{\"candidates\":",
            );
            let _ = stream.flush();
        });
        Some(format!("http://{addr}"))
    }

    fn request_complete(request: &[u8]) -> bool {
        let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
            return false;
        };
        let head = String::from_utf8_lossy(&request[..end]).to_ascii_lowercase();
        let length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        request.len() >= end + 4 + length
    }

    #[tokio::test]
    async fn truncated_success_body_is_a_transport_error() {
        let Some(base_url) = truncated_body_server() else {
            eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
            return;
        };
        let client = GeminiClient::new(GeminiConfig {
            api_key: "test-key".to_string(),
            base_url,
            model: DEFAULT_IMAGE_MODEL.to_string(),
            options: GeminiImageOptions::default(),
            timeout: Some(Duration::from_secs(10)),
        })
        .unwrap();

        let err = client.request_image(&generate_request()).await.unwrap_err();
        let provider = err.downcast_ref::<ProviderError>().unwrap();
        assert_ne!(provider.kind, ProviderErrorKind::Parse);
        assert!(
            !provider.message.contains("parse"),
            "unexpected message: {}",
            provider.message
        );
    }
}
