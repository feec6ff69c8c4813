use crate::core::frame::Method;
use crate::traits::{HeaderOverrides, Result, SocketLinkError};
use serde::Serialize;
use serde_json::Value;

/// Everything needed to issue one request on a connection
///
/// ```
/// use socketlink::{Method, RequestDescriptor};
///
/// let request = RequestDescriptor::new(Method::Get, "/headersOverride")
///     .header("x-test-header-one", "baz")
///     .without_header("x-test-header-two");
/// assert_eq!(request.url, "/headersOverride");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: Method,
    /// Path on the connected endpoint
    pub url: String,
    /// Per-request layer merged over the connection defaults
    pub headers: HeaderOverrides,
    pub body: Option<Value>,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderOverrides::new(),
            body: None,
        }
    }

    /// Override a default header for this request; an empty value removes it
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name, Some(value.into()));
        self
    }

    /// Suppress a default header for this request
    pub fn without_header(mut self, name: impl AsRef<str>) -> Self {
        self.headers.insert(name, None);
        self
    }

    pub fn headers(mut self, headers: HeaderOverrides) -> Self {
        self.headers = headers;
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serialize any value as the request body
    pub fn json<B: Serialize + ?Sized>(self, body: &B) -> Result<Self> {
        Ok(self.body(serde_json::to_value(body)?))
    }
}

/// Validate a request URL and turn it into a path on the connection
///
/// Absolute URLs are refused: every request goes to the one connected endpoint.
pub(crate) fn normalize_path(url: &str) -> Result<String> {
    let url = url.trim();
    if url.is_empty() {
        return Err(SocketLinkError::InvalidRequest("url is required".into()));
    }
    if url.contains("://") {
        return Err(SocketLinkError::InvalidRequest(format!(
            "'{}' is absolute; requests take a path on the connected endpoint",
            url
        )));
    }
    if url.starts_with('/') {
        Ok(url.to_string())
    } else {
        Ok(format!("/{}", url))
    }
}
