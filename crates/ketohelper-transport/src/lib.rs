//! Transport abstraction layer for KetoHelper.
//!
//! Provides the [`HttpTransport`] trait that the session layer uses to talk
//! to the backend, plus the request/response values that cross it. The
//! session, refresh, and interceptor code never touch an HTTP client
//! directly, so tests can swap in a scripted transport.
//!
//! # Feature Flags
//!
//! - `reqwest` (default): [`ReqwestTransport`], backed by `reqwest`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "reqwest")]
mod http;

pub use error::TransportError;
#[cfg(feature = "reqwest")]
pub use http::ReqwestTransport;

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Counter for generating unique request IDs.
static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for a logical request, used to correlate log lines
/// between the first attempt and its retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

impl RequestId {
    /// Allocates the next process-wide request ID.
    pub fn next() -> Self {
        Self(NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// HTTP methods the API uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Request / response
// ---------------------------------------------------------------------------

/// An outgoing API call.
///
/// `path` is relative to the transport's base URL. `bearer` is filled in
/// by the interceptor just before sending; callers normally leave it empty.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub id: RequestId,
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
    pub bearer: Option<String>,
}

impl ApiRequest {
    /// A request with no body and no credentials.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            id: RequestId::next(),
            method,
            path: path.into(),
            body: None,
            bearer: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Attaches a JSON body.
    ///
    /// # Errors
    /// Returns [`TransportError::InvalidRequest`] if `body` can't be
    /// represented as JSON.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, TransportError> {
        self.body = Some(serde_json::to_value(body).map_err(TransportError::InvalidRequest)?);
        Ok(self)
    }

    /// Sets (or clears) the bearer token sent with this request.
    pub fn with_bearer(mut self, token: Option<String>) -> Self {
        self.bearer = token;
        self
    }
}

/// A response as received, before any status interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// A response whose body is `value` serialized as JSON.
    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self::new(status, value.to_string())
    }

    /// `true` for any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `true` for 401, the only status the interceptor reacts to.
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// Parses the body as JSON.
    ///
    /// # Errors
    /// Returns [`TransportError::InvalidBody`] if it doesn't parse as `T`.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, TransportError> {
        serde_json::from_slice(&self.body).map_err(TransportError::InvalidBody)
    }
}

// ---------------------------------------------------------------------------
// Transport trait
// ---------------------------------------------------------------------------

/// Sends API requests and returns raw responses.
///
/// `Send + Sync + 'static` because one transport is shared by the
/// interceptor, the refresher, and the scheduler's background task.
/// The returned future is `Send` so those callers can run on any
/// Tokio worker.
pub trait HttpTransport: Send + Sync + 'static {
    /// Sends `request` and returns whatever status came back.
    ///
    /// Only failures to obtain a response are errors; a 401 or 500 is an
    /// `Ok(ApiResponse)`.
    fn send(
        &self,
        request: ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send;
}

impl<T: HttpTransport> HttpTransport for Arc<T> {
    fn send(
        &self,
        request: ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send {
        (**self).send(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_display() {
        let id = RequestId(7);
        assert_eq!(id.to_string(), "req-7");
    }

    #[test]
    fn test_request_ids_are_unique() {
        let a = ApiRequest::get("/a");
        let b = ApiRequest::get("/a");
        assert_ne!(a.id, b.id);
        assert!(b.id.into_inner() > a.id.into_inner());
    }

    #[test]
    fn test_request_json_sets_body() {
        let req = ApiRequest::post("/auth/refresh")
            .json(&serde_json::json!({ "refresh_token": "r" }))
            .unwrap();

        assert_eq!(req.method, Method::Post);
        assert_eq!(req.body, Some(serde_json::json!({ "refresh_token": "r" })));
        assert_eq!(req.bearer, None);
    }

    #[test]
    fn test_response_status_helpers() {
        assert!(ApiResponse::new(204, Vec::new()).is_success());
        assert!(!ApiResponse::new(401, Vec::new()).is_success());
        assert!(ApiResponse::new(401, Vec::new()).is_unauthorized());
        assert!(!ApiResponse::new(403, Vec::new()).is_unauthorized());
    }

    #[test]
    fn test_response_parse_invalid_body() {
        let resp = ApiResponse::new(200, "<html>");
        let parsed: Result<serde_json::Value, _> = resp.parse();
        assert!(matches!(parsed, Err(TransportError::InvalidBody(_))));
    }
}
