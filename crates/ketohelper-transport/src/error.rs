/// Errors that can occur in the transport layer.
///
/// A `TransportError` means no usable HTTP response came back. A response
/// with a non-2xx status is NOT a transport error; it is returned as an
/// [`ApiResponse`](crate::ApiResponse) and interpreted by the caller.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The underlying HTTP client could not be constructed.
    #[error("http client build failed: {0}")]
    ClientBuild(String),

    /// The request could not be sent or the response could not be read.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// The request exceeded its timeout.
    #[error("request timed out")]
    Timeout,

    /// The request body could not be serialized.
    #[error("invalid request body: {0}")]
    InvalidRequest(#[source] serde_json::Error),

    /// The response body is not the JSON the caller expected.
    #[error("invalid response body: {0}")]
    InvalidBody(#[source] serde_json::Error),
}
