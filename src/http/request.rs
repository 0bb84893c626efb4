use bytes::Bytes;

use crate::http::headers::HeaderMap;
use crate::http::protocol::{Version, is_connection_persistent};

/// HTTP request methods.
///
/// Method names are matched case-sensitively; anything outside the known
/// vocabulary parses to `Unknown` and is rejected as a bad request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    GET,
    HEAD,
    POST,
    PUT,
    DELETE,
    CONNECT,
    OPTIONS,
    TRACE,
    PATCH,
    Unknown,
}

impl Method {
    /// Parses an HTTP method token.
    ///
    /// ```
    /// # use plainwire::http::request::Method;
    /// assert_eq!(Method::parse("GET"), Method::GET);
    /// assert_eq!(Method::parse("get"), Method::Unknown);
    /// ```
    pub fn parse(s: &str) -> Self {
        match s {
            "GET" => Method::GET,
            "HEAD" => Method::HEAD,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            "CONNECT" => Method::CONNECT,
            "OPTIONS" => Method::OPTIONS,
            "TRACE" => Method::TRACE,
            "PATCH" => Method::PATCH,
            _ => Method::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::CONNECT => "CONNECT",
            Method::OPTIONS => "OPTIONS",
            Method::TRACE => "TRACE",
            Method::PATCH => "PATCH",
            Method::Unknown => "UNKNOWN",
        }
    }
}

/// A parsed HTTP request.
///
/// Immutable once built: the header store is frozen and the persistence flag
/// is computed from version and headers at construction.
#[derive(Debug, Clone)]
pub struct Request {
    version: Version,
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Option<Bytes>,
    persistent: bool,
}

impl Request {
    pub fn new(
        version: Version,
        method: Method,
        path: impl Into<String>,
        mut headers: HeaderMap,
        body: Option<Bytes>,
    ) -> Self {
        headers.freeze();
        let persistent = is_connection_persistent(version, &headers);

        Self {
            version,
            method,
            path: path.into(),
            headers,
            body,
            persistent,
        }
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// The URL-decoded request path.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header value by name, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Request body, present only when the request declared a Content-Length.
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn content_length(&self) -> Option<u64> {
        self.headers.content_length()
    }

    /// Whether the client asked to keep the connection open after this request.
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }
}

/// Builder for constructing Request objects, mostly for exercising handlers.
#[derive(Default)]
pub struct RequestBuilder {
    method: Option<Method>,
    path: Option<String>,
    version: Option<Version>,
    headers: Vec<(String, String)>,
    body: Option<Bytes>,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn build(self) -> Result<Request, &'static str> {
        let mut headers = HeaderMap::new();
        for (key, value) in self.headers {
            headers
                .set(key, value)
                .map_err(|_| "invalid header name")?;
        }

        Ok(Request::new(
            self.version.unwrap_or(Version::Http11),
            self.method.ok_or("method missing")?,
            self.path.ok_or("path missing")?,
            headers,
            self.body,
        ))
    }
}
