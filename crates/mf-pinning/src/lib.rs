//! Image pinning client.
//!
//! One multipart POST per file against a Pinata-compatible pinning service,
//! authenticated with a bearer credential. The returned content hash is
//! templated into a gateway URL the contract stores verbatim.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Environment variable holding the pinning bearer credential. The only
/// environment surface of this workspace.
pub const PIN_JWT_ENV: &str = "PINATA_JWT";

const DEFAULT_ENDPOINT: &str = "https://api.pinata.cloud";
const DEFAULT_GATEWAY: &str = "https://gateway.pinata.cloud";

/// One image selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }
}

/// Failures at the pinning boundary.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The service answered with a structured refusal.
    #[error("{0}")]
    Service(String),
    /// The service could not be reached or answered garbage.
    #[error("pinning transport failure: {0}")]
    Transport(String),
    /// No bearer credential available.
    #[error("pinning credential missing: set {PIN_JWT_ENV}")]
    MissingCredential,
}

/// Pins one file at a time and hands back a retrievable URL.
#[async_trait]
pub trait ImagePinner: Send + Sync {
    async fn pin_image(&self, file: &ImageFile) -> Result<String, UploadError>;
}

/// HTTP client for a Pinata-compatible pinning service.
pub struct PinataClient {
    endpoint: String,
    gateway: String,
    jwt: String,
    http: reqwest::Client,
}

impl PinataClient {
    pub fn new(jwt: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            gateway: DEFAULT_GATEWAY.to_owned(),
            jwt: jwt.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Build a client from the `PINATA_JWT` environment variable.
    pub fn from_env() -> Result<Self, UploadError> {
        let jwt = std::env::var(PIN_JWT_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or(UploadError::MissingCredential)?;
        Ok(Self::new(jwt))
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_owned();
        self
    }

    pub fn with_gateway(mut self, gateway: &str) -> Self {
        self.gateway = gateway.trim_end_matches('/').to_owned();
        self
    }

    fn pin_url(&self) -> String {
        format!("{}/pinning/pinFileToIPFS", self.endpoint)
    }

    fn gateway_url(&self, hash: &str) -> String {
        format!("{}/ipfs/{}", self.gateway, hash)
    }
}

#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

#[derive(Debug, Deserialize)]
struct PinErrorBody {
    error: PinErrorDetail,
}

#[derive(Debug, Deserialize)]
struct PinErrorDetail {
    reason: String,
}

/// Extract the pinned hash, honoring the service's structured error body
/// regardless of HTTP status.
fn parse_pin_outcome(body: &str) -> Result<String, UploadError> {
    if let Ok(refusal) = serde_json::from_str::<PinErrorBody>(body) {
        return Err(UploadError::Service(refusal.error.reason));
    }
    let response: PinResponse = serde_json::from_str(body)
        .map_err(|err| UploadError::Transport(format!("unexpected pin response: {err}")))?;
    Ok(response.ipfs_hash)
}

/// Unique-enough pin label, mirroring the upload metadata convention.
fn pin_name(file_name: &str) -> String {
    let epoch_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    format!("product_image_{file_name}_{epoch_ms}")
}

#[async_trait]
impl ImagePinner for PinataClient {
    async fn pin_image(&self, file: &ImageFile) -> Result<String, UploadError> {
        if self.jwt.trim().is_empty() {
            return Err(UploadError::MissingCredential);
        }

        let metadata = serde_json::json!({ "name": pin_name(&file.file_name) }).to_string();
        let options = serde_json::json!({ "cidVersion": 0 }).to_string();

        let mut part = reqwest::multipart::Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone());
        if !file.content_type.is_empty() {
            part = part
                .mime_str(&file.content_type)
                .map_err(|err| UploadError::Transport(format!("bad content type: {err}")))?;
        }

        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("pinataMetadata", metadata)
            .text("pinataOptions", options);

        let response = self
            .http
            .post(self.pin_url())
            .bearer_auth(&self.jwt)
            .multipart(form)
            .send()
            .await
            .map_err(|err| UploadError::Transport(err.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|err| UploadError::Transport(err.to_string()))?;

        let hash = parse_pin_outcome(&body)?;
        Ok(self.gateway_url(&hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_extracts_hash_from_success_body() {
        let hash = parse_pin_outcome(r#"{"IpfsHash":"QmYwAPJzv5CZsnA","PinSize":12,"Timestamp":"2024-01-01T00:00:00Z"}"#)
            .unwrap();
        assert_eq!(hash, "QmYwAPJzv5CZsnA");
    }

    #[test]
    fn parse_surfaces_service_reason() {
        let err = parse_pin_outcome(r#"{"error":{"reason":"INVALID_CREDENTIALS","details":"bad token"}}"#)
            .unwrap_err();
        match err {
            UploadError::Service(reason) => assert_eq!(reason, "INVALID_CREDENTIALS"),
            other => panic!("expected service error, got {other:?}"),
        }
    }

    #[test]
    fn parse_rejects_garbage_bodies() {
        assert!(matches!(
            parse_pin_outcome("<html>502</html>"),
            Err(UploadError::Transport(_)),
        ));
    }

    #[test]
    fn gateway_url_templates_the_hash() {
        let client = PinataClient::new("jwt").with_gateway("https://ipfs.example.com/");
        assert_eq!(
            client.gateway_url("QmYwAPJzv5CZsnA"),
            "https://ipfs.example.com/ipfs/QmYwAPJzv5CZsnA",
        );
    }

    #[test]
    fn endpoint_trailing_slash_is_trimmed() {
        let client = PinataClient::new("jwt").with_endpoint("https://pin.example.com/");
        assert_eq!(client.pin_url(), "https://pin.example.com/pinning/pinFileToIPFS");
    }

    #[test]
    fn pin_names_carry_the_file_name() {
        let name = pin_name("lamp.png");
        assert!(name.starts_with("product_image_lamp.png_"));
    }

    #[tokio::test]
    async fn empty_credential_fails_before_any_request() {
        let client = PinataClient::new("");
        let err = client
            .pin_image(&ImageFile::new("lamp.png", "image/png", vec![1, 2, 3]))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::MissingCredential));
    }
}
