//! Response envelope and headers.
//!
//! Every outcome of the pipeline becomes a `FormResponse`: a status code, the
//! JSON envelope (absent only for preflight), and the fixed CORS headers.

use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// JSON body returned for every non-preflight request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResponseEnvelope {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
        }
    }
}

/// Cross-origin headers attached to every response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsHeaders {
    pub allow_origin: String,
}

impl Default for CorsHeaders {
    fn default() -> Self {
        Self {
            allow_origin: "*".to_string(),
        }
    }
}

impl CorsHeaders {
    pub const ALLOW_METHODS: &'static str = "POST, OPTIONS";
    pub const ALLOW_HEADERS: &'static str = "Content-Type";

    pub fn new(allow_origin: impl Into<String>) -> Self {
        Self {
            allow_origin: allow_origin.into(),
        }
    }

    /// Render as HTTP headers.
    pub fn to_header_map(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        let origin = HeaderValue::from_str(&self.allow_origin).unwrap_or_else(|_| {
            warn!(allow_origin = %self.allow_origin, "cors_origin_invalid");
            HeaderValue::from_static("*")
        });

        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(Self::ALLOW_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(Self::ALLOW_HEADERS),
        );
        headers
    }
}

/// A complete response produced by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormResponse {
    pub status: StatusCode,
    /// `None` for the empty preflight response
    pub body: Option<ResponseEnvelope>,
    pub cors: CorsHeaders,
}

impl FormResponse {
    /// Empty 200 for CORS preflight.
    pub fn preflight(cors: &CorsHeaders) -> Self {
        Self {
            status: StatusCode::OK,
            body: None,
            cors: cors.clone(),
        }
    }

    /// 200 naming the form. Also used for silently dropped spam.
    pub fn success(form_id: &str, cors: &CorsHeaders) -> Self {
        Self {
            status: StatusCode::OK,
            body: Some(ResponseEnvelope::ok(format!(
                "Form '{}' submitted successfully",
                form_id
            ))),
            cors: cors.clone(),
        }
    }

    pub fn error(status: StatusCode, error: impl Into<String>, cors: &CorsHeaders) -> Self {
        Self {
            status,
            body: Some(ResponseEnvelope::err(error)),
            cors: cors.clone(),
        }
    }
}

impl IntoResponse for FormResponse {
    fn into_response(self) -> Response {
        let headers = self.cors.to_header_map();
        match self.body {
            Some(envelope) => (self.status, headers, Json(envelope)).into_response(),
            None => (self.status, headers).into_response(),
        }
    }
}
