//! HTTP Transport
//!
//! The seam between the API client and the network. The browser build goes
//! through `reqwest` (fetch under wasm32); tests plug in a fake.

use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    /// Path relative to the API base URL, starting with `/`
    pub path: String,
    pub body: Option<Value>,
    pub bearer: Option<String>,
}

impl HttpRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), body: None, bearer: None }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_bearer(mut self, token: Option<String>) -> Self {
        self.bearer = token;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Raw body; JSON for everything except report exports
    pub body: Vec<u8>,
    /// File name from `Content-Disposition`, if the server sent one
    pub attachment: Option<String>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self { status, body: body.into(), attachment: None }
    }

    pub fn with_attachment(mut self, name: impl Into<String>) -> Self {
        self.attachment = Some(name.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// The backend's error as an `ApiError::Status`, whatever the code
    pub fn status_error(&self) -> ApiError {
        ApiError::Status { status: self.status, message: backend_message(&String::from_utf8_lossy(&self.body)) }
    }

    /// Pass 2xx through; 401 becomes `Unauthorized`, anything else `Status`
    pub fn error_for_status(self) -> Result<Self, ApiError> {
        if self.is_success() {
            Ok(self)
        } else if self.is_unauthorized() {
            Err(ApiError::Unauthorized)
        } else {
            Err(self.status_error())
        }
    }

    /// Decode a 2xx JSON body
    pub fn json<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        let response = self.error_for_status()?;
        serde_json::from_slice(&response.body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// File name out of a `Content-Disposition` header, percent-decoded.
/// `filename*=UTF-8''...` wins over plain `filename=`.
pub fn attachment_name(header: &str) -> Option<String> {
    let mut plain = None;
    for part in header.split(';').map(str::trim) {
        if let Some(value) = part.strip_prefix("filename*=") {
            let encoded = value.rsplit("''").next().unwrap_or(value).trim_matches('"');
            return decoded(encoded);
        }
        if let Some(value) = part.strip_prefix("filename=") {
            plain = decoded(value.trim_matches('"'));
        }
    }
    plain
}

fn decoded(value: &str) -> Option<String> {
    let text = percent_decode_str(value).decode_utf8().ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Pull the human-readable `message` out of an error body.
/// Validation errors carry a list of messages.
fn backend_message(body: &str) -> String {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("message").cloned());
    match message {
        Some(Value::String(text)) => text,
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join("; "),
        _ if body.trim().is_empty() => "no details".to_string(),
        _ => body.trim().to_string(),
    }
}

#[async_trait(?Send)]
pub trait Transport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// Production transport backed by `reqwest`
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait(?Send)]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };
        let mut builder = self.client.request(method, self.url(&request.path));
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let attachment = response
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(attachment_name);
        let body = response.bytes().await.map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(HttpResponse { status, body: body.to_vec(), attachment })
    }
}
