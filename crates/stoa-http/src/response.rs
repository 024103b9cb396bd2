//! Outgoing response builder.
//!
//! [`Response`] collects status, headers, and body as plain owned data.
//! Middleware can rewrite any part of it after the fact; the server turns
//! the finished value into a hyper response with [`Response::into_http`].

use bytes::Bytes;
use http::header::{
    HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, ETAG, LAST_MODIFIED,
    LOCATION, VARY,
};
use http::StatusCode;
use http_body_util::Full;
use serde::Serialize;
use std::time::SystemTime;

/// An owned HTTP response under construction.
#[derive(Debug, Clone)]
pub struct Response {
    /// Response status.
    status: StatusCode,

    /// Response headers.
    headers: HeaderMap,

    /// Response body.
    body: Bytes,
}

impl Default for Response {
    /// An empty `204 No Content` response.
    fn default() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }
}

impl Response {
    /// Creates an empty `200 OK` response.
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            ..Self::default()
        }
    }

    /// Creates a `200 OK` plain-text response.
    #[must_use]
    pub fn text(body: impl Into<Bytes>) -> Self {
        Self::new()
            .content_type("text/plain; charset=utf-8")
            .body(body)
    }

    /// Creates a `200 OK` HTML response.
    #[must_use]
    pub fn html(body: impl Into<Bytes>) -> Self {
        Self::new()
            .content_type("text/html; charset=utf-8")
            .body(body)
    }

    /// Creates a `200 OK` JSON response from a serializable value.
    ///
    /// # Errors
    ///
    /// Returns an error when the value cannot be serialized.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        Ok(Self::new().content_type("application/json").body(body))
    }

    /// Creates a `302 Found` redirect to the given location.
    #[must_use]
    pub fn redirect(url: &str) -> Self {
        Self::new().status(StatusCode::FOUND).location(url)
    }

    /// Sets the status code. Builder-style.
    #[must_use]
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Sets the `Content-Type` header.
    ///
    /// `text/*` types pick up `charset=utf-8` when no charset is given.
    #[must_use]
    pub fn content_type(self, value: &str) -> Self {
        if value.starts_with("text/") && !value.contains("charset") {
            let value = format!("{value}; charset=utf-8");
            self.try_set(CONTENT_TYPE, &value)
        } else {
            self.try_set(CONTENT_TYPE, value)
        }
    }

    /// Sets the `Content-Length` header explicitly.
    #[must_use]
    pub fn length(self, length: u64) -> Self {
        self.try_set(CONTENT_LENGTH, &length.to_string())
    }

    /// Sets the `Last-Modified` header from a timestamp.
    #[must_use]
    pub fn last_modified(self, when: SystemTime) -> Self {
        self.try_set(LAST_MODIFIED, &httpdate::fmt_http_date(when))
    }

    /// Sets the `ETag` header.
    ///
    /// Bare tags are quoted; already-quoted and weak (`W/"..."`) tags are
    /// kept as given.
    #[must_use]
    pub fn etag(self, tag: &str) -> Self {
        if tag.starts_with("W/") || tag.starts_with('"') {
            self.try_set(ETAG, tag)
        } else {
            let quoted = format!("\"{tag}\"");
            self.try_set(ETAG, &quoted)
        }
    }

    /// Sets the `Location` header.
    #[must_use]
    pub fn location(self, url: &str) -> Self {
        self.try_set(LOCATION, url)
    }

    /// Merges field names into the `Vary` header.
    ///
    /// Names already present are not repeated; a `*` anywhere collapses
    /// the header to `*`.
    #[must_use]
    pub fn vary(mut self, fields: &[&str]) -> Self {
        let mut merged: Vec<String> = self
            .headers
            .get_all(VARY)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .map(|field| field.trim().to_string())
            .filter(|field| !field.is_empty())
            .collect();

        for field in fields {
            let field = field.trim();
            if field.is_empty() {
                continue;
            }
            if !merged.iter().any(|existing| existing.eq_ignore_ascii_case(field)) {
                merged.push(field.to_string());
            }
        }

        if merged.is_empty() {
            return self;
        }
        if merged.iter().any(|field| field == "*") {
            self.headers.insert(VARY, HeaderValue::from_static("*"));
            return self;
        }
        let joined = merged.join(", ");
        self.try_set(VARY, &joined)
    }

    /// Sets a header, replacing any previous value.
    #[must_use]
    pub fn set(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Appends a header, keeping any previous values.
    #[must_use]
    pub fn append(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Removes a header.
    #[must_use]
    pub fn remove(mut self, name: HeaderName) -> Self {
        self.headers.remove(name);
        self
    }

    /// Removes every header. Status and body are kept.
    #[must_use]
    pub fn reset(mut self) -> Self {
        self.headers.clear();
        self
    }

    /// Sets the body. Builder-style.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns the status code.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    /// Returns the response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the response body.
    #[must_use]
    pub fn body_bytes(&self) -> &Bytes {
        &self.body
    }

    /// Returns a header value as a string. Lookup is case-insensitive.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Returns `true` if the header is present with a readable value.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Converts the response into the form hyper writes to the wire.
    #[must_use]
    pub fn into_http(self) -> http::Response<Full<Bytes>> {
        let mut response = http::Response::new(Full::new(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }

    fn try_set(mut self, name: HeaderName, value: &str) -> Self {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                self.headers.insert(name, value);
            }
            Err(_) => tracing::warn!(header = %name, "dropping header with invalid value"),
        }
        self
    }
}

impl From<&str> for Response {
    fn from(body: &str) -> Self {
        Self::text(body.to_string())
    }
}

impl From<String> for Response {
    fn from(body: String) -> Self {
        Self::text(body)
    }
}

impl From<Bytes> for Response {
    fn from(body: Bytes) -> Self {
        Self::new().body(body)
    }
}
