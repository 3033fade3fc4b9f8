//! Request and response snapshots exchanged between the page, the cache
//! store and the network

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// HTTP request method
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
        };
        write!(f, "{}", name)
    }
}

/// How the page issued the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Top-level page navigation
    Navigate,
    SameOrigin,
    Cors,
    NoCors,
}

/// An outbound request observed by the interceptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub mode: RequestMode,
}

impl Request {
    /// Create a request
    pub fn new(method: Method, url: Url, mode: RequestMode) -> Self {
        Self { method, url, mode }
    }

    /// Plain GET subresource request
    pub fn get(url: Url) -> Self {
        Self::new(Method::Get, url, RequestMode::Cors)
    }

    /// Page navigation request
    pub fn navigate(url: Url) -> Self {
        Self::new(Method::Get, url, RequestMode::Navigate)
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }
}

/// Lookup identity of a cacheable request.
///
/// Only GET requests produce a key. Identity is the exact absolute URL with
/// the fragment removed; query strings are kept verbatim and `Vary` headers
/// are not consulted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestKey(String);

impl RequestKey {
    /// Key for a GET of `url`
    pub fn get(url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self(url.into())
    }

    /// Key for `request`, or `None` when the method is not cacheable
    pub fn for_request(request: &Request) -> Option<Self> {
        match request.method {
            Method::Get => Some(Self::get(&request.url)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GET {}", self.0)
    }
}

/// Response snapshot.
///
/// The body is reference counted, so `clone()` is an exact duplicate of the
/// payload and never a second read of the network stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl Response {
    /// Create a response with no headers
    pub fn new(status: u16, status_text: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// 200 OK with the given body
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(200, "OK", body)
    }

    /// Add a header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Generic response for a request that cannot reach the network
    pub fn offline() -> Self {
        Self::new(503, "Service Unavailable", "Offline")
    }

    /// Response for a media request that cannot reach the network
    pub fn audio_unavailable() -> Self {
        Self::new(503, "Service Unavailable", "Audio unavailable offline")
    }

    /// Response for a request the network answered but could not be relayed
    pub fn bad_gateway() -> Self {
        Self::new(502, "Bad Gateway", "Bad Gateway")
    }

    /// Whether the status is in the 2xx range
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header value matching `name`, case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
