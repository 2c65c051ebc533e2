//! HTTP transport implementation using `reqwest`.

use std::time::Duration;

use crate::{ApiRequest, ApiResponse, HttpTransport, Method, TransportError};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// A [`HttpTransport`] that sends requests to a fixed base URL.
///
/// Cheap to share: `reqwest::Client` pools connections internally.
pub struct ReqwestTransport {
    http: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    /// Creates a transport with default timeouts (15 s total, 5 s connect).
    ///
    /// # Errors
    /// Returns [`TransportError::ClientBuild`] if the TLS backend fails to
    /// initialize.
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        Self::with_timeouts(base_url, DEFAULT_REQUEST_TIMEOUT, DEFAULT_CONNECT_TIMEOUT)
    }

    /// Creates a transport with explicit timeouts.
    ///
    /// # Errors
    /// Returns [`TransportError::ClientBuild`] if the client can't be built.
    pub fn with_timeouts(
        base_url: &str,
        request_timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| TransportError::ClientBuild(e.to_string()))?;
        tracing::debug!(base_url, "http transport ready");
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// The base URL requests are resolved against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

fn to_reqwest(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn map_error(e: &reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::RequestFailed(e.to_string())
    }
}

impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.url(&request.path);
        let mut builder = self.http.request(to_reqwest(request.method), &url);
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| map_error(&e))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| map_error(&e))?;

        tracing::debug!(
            id = %request.id,
            method = %request.method,
            path = %request.path,
            status,
            "request completed"
        );

        Ok(ApiResponse::new(status, body.to_vec()))
    }
}
