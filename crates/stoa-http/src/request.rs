//! Incoming request snapshot.
//!
//! [`Request`] is an owned, fully-buffered view of one HTTP request:
//! method, target, headers, and collected body. Handlers and middleware
//! get a value they can freely inspect and pass around without touching
//! the connection.

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use http::{Method, Version};
use std::net::SocketAddr;

/// An owned HTTP request with a fully collected body.
#[derive(Debug, Clone)]
pub struct Request {
    /// Request method.
    method: Method,

    /// Decoded path component of the request target.
    path: String,

    /// Raw query string, without the leading `?`. Empty if absent.
    querystring: String,

    /// Protocol version the request arrived with.
    version: Version,

    /// Request headers.
    headers: HeaderMap,

    /// Collected request body.
    body: Bytes,

    /// Peer address, when known.
    peer_addr: Option<SocketAddr>,

    /// Whether the request arrived over an encrypted transport.
    secure: bool,
}

impl Request {
    /// Creates a request with the given method and path and nothing else.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            querystring: String::new(),
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            peer_addr: None,
            secure: false,
        }
    }

    /// Builds a request from the pieces hyper hands the server.
    #[must_use]
    pub fn from_hyper(
        parts: http::request::Parts,
        body: Bytes,
        peer_addr: Option<SocketAddr>,
    ) -> Self {
        let path = parts.uri.path().to_string();
        let querystring = parts.uri.query().unwrap_or("").to_string();
        // Origin-form targets carry no scheme; secure stays false unless
        // the rare absolute-form target says otherwise.
        let secure = parts.uri.scheme() == Some(&http::uri::Scheme::HTTPS);

        Self {
            method: parts.method,
            path,
            querystring,
            version: parts.version,
            headers: parts.headers,
            body,
            peer_addr,
            secure,
        }
    }

    /// Sets the query string. Builder-style.
    #[must_use]
    pub fn with_query(mut self, querystring: impl Into<String>) -> Self {
        self.querystring = querystring.into();
        self
    }

    /// Appends a header. Builder-style.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Sets the body. Builder-style.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the peer address. Builder-style.
    #[must_use]
    pub fn with_peer_addr(mut self, addr: SocketAddr) -> Self {
        self.peer_addr = Some(addr);
        self
    }

    /// Marks the request as arriving over an encrypted transport.
    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Sets the protocol version. Builder-style.
    #[must_use]
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Returns the request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the decoded path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the raw query string, empty if the target had none.
    #[must_use]
    pub fn querystring(&self) -> &str {
        &self.querystring
    }

    /// Returns the origin-form request target: path plus query string.
    #[must_use]
    pub fn url(&self) -> String {
        if self.querystring.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.querystring)
        }
    }

    /// Returns the protocol version.
    #[must_use]
    pub fn version(&self) -> Version {
        self.version
    }

    /// Returns the request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the collected body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the peer address, when known.
    #[must_use]
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// Returns `true` if the request arrived over an encrypted transport.
    #[must_use]
    pub fn secure(&self) -> bool {
        self.secure
    }

    /// Returns a header value as a string.
    ///
    /// Lookup is case-insensitive. `Referrer` and `Referer` are
    /// interchangeable: asking for either spelling finds whichever one the
    /// client sent. Values that are not valid UTF-8 read as absent.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        let value = if name.eq_ignore_ascii_case("referer") || name.eq_ignore_ascii_case("referrer")
        {
            self.headers
                .get("referrer")
                .or_else(|| self.headers.get("referer"))
        } else {
            self.headers.get(name)
        };
        value.and_then(|value| value.to_str().ok())
    }

    /// Returns `true` if the header is present with a readable value.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns the media type of the request, with parameters stripped.
    ///
    /// `Content-Type: application/json; charset=utf-8` reads as
    /// `application/json`.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        let value = self.headers.get(CONTENT_TYPE)?.to_str().ok()?;
        let media_type = value.split(';').next().unwrap_or("").trim();
        if media_type.is_empty() {
            None
        } else {
            Some(media_type)
        }
    }

    /// Returns the parsed `Content-Length`, when present and numeric.
    #[must_use]
    pub fn length(&self) -> Option<u64> {
        self.headers
            .get(CONTENT_LENGTH)?
            .to_str()
            .ok()?
            .trim()
            .parse()
            .ok()
    }

    /// Checks whether the request's media type matches any of the given
    /// patterns, returning the first match.
    ///
    /// Patterns may be a bare shorthand (`"json"`, `"html"`), an exact
    /// type (`"application/json"`), a suffix (`"+json"`), or a wildcard
    /// (`"text/*"`). Shorthand and exact patterns echo the pattern back;
    /// suffix and wildcard patterns return the request's actual media
    /// type. Returns `None` when there is no `Content-Type` or nothing
    /// matches.
    #[must_use]
    pub fn is(&self, types: &[&str]) -> Option<String> {
        let actual = self.content_type()?;
        for candidate in types {
            if mime_match(actual, candidate) {
                if candidate.starts_with('+') || candidate.contains('*') {
                    return Some(actual.to_string());
                }
                return Some((*candidate).to_string());
            }
        }
        None
    }
}

/// Matches a concrete media type against one pattern.
fn mime_match(actual: &str, candidate: &str) -> bool {
    // Suffix patterns: "+json" matches "application/ld+json".
    if let Some(suffix) = candidate.strip_prefix('+') {
        return actual
            .rsplit_once('+')
            .is_some_and(|(_, actual_suffix)| actual_suffix.eq_ignore_ascii_case(suffix));
    }

    // Bare shorthands expand to their usual full type.
    if !candidate.contains('/') {
        return match candidate.to_ascii_lowercase().as_str() {
            "html" => actual.eq_ignore_ascii_case("text/html"),
            "text" => actual.eq_ignore_ascii_case("text/plain"),
            "json" => actual.eq_ignore_ascii_case("application/json"),
            "xml" => {
                actual.eq_ignore_ascii_case("application/xml")
                    || actual.eq_ignore_ascii_case("text/xml")
            }
            "urlencoded" => actual.eq_ignore_ascii_case("application/x-www-form-urlencoded"),
            "multipart" => actual
                .split_once('/')
                .is_some_and(|(main, _)| main.eq_ignore_ascii_case("multipart")),
            _ => false,
        };
    }

    // Wildcards match per component; anything else is an exact match.
    let Some((candidate_main, candidate_sub)) = candidate.split_once('/') else {
        return false;
    };
    let Some((actual_main, actual_sub)) = actual.split_once('/') else {
        return false;
    };

    let main_ok = candidate_main == "*" || candidate_main.eq_ignore_ascii_case(actual_main);
    let sub_ok = candidate_sub == "*" || candidate_sub.eq_ignore_ascii_case(actual_sub);
    main_ok && sub_ok
}
