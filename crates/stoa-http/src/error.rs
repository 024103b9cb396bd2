//! Error type for handlers and the mapping from failed dispatches to
//! HTTP responses.
//!
//! Middleware reports failure through the plain boxed-error channel.
//! Errors that are [`HttpError`]s carry their own status and decide
//! whether the message is safe to show; everything else becomes an
//! opaque `500`.

use crate::response::Response;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;
use std::io;
use stoa_middleware::BoxError;

/// An error with an HTTP status attached.
///
/// The message is sent to the client only when the error is exposed.
/// Client errors (4xx) are exposed by default, server errors are not;
/// [`HttpError::with_expose`] overrides either way.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct HttpError {
    status: StatusCode,
    message: String,
    expose: bool,
    headers: HeaderMap,
}

impl HttpError {
    /// Creates an error with the given status and message.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            expose: status.as_u16() < 500,
            headers: HeaderMap::new(),
        }
    }

    /// Creates a `400 Bad Request` error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Creates a `404 Not Found` error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Creates a `500 Internal Server Error` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Overrides whether the message is shown to the client.
    #[must_use]
    pub fn with_expose(mut self, expose: bool) -> Self {
        self.expose = expose;
        self
    }

    /// Attaches a header to send alongside the error response.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Returns the HTTP status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns `true` if the message is sent to the client.
    #[must_use]
    pub fn expose(&self) -> bool {
        self.expose
    }

    /// Returns the headers to send alongside the error response.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

/// Maps a dispatch error to the response the client sees.
///
/// [`HttpError`]s keep their status and, when exposed, their message.
/// An [`io::Error`] with [`io::ErrorKind::NotFound`] becomes a `404`.
/// Anything else is reported as a bare `500` so internal detail stays
/// out of the response.
#[must_use]
pub fn error_to_response(err: &BoxError) -> Response {
    if let Some(http_err) = err.downcast_ref::<HttpError>() {
        let message = if http_err.expose() {
            http_err.message().to_string()
        } else {
            canonical_message(http_err.status())
        };
        let mut response = Response::text(message).status(http_err.status());
        for (name, value) in http_err.headers() {
            response = response.set(name.clone(), value.clone());
        }
        return response;
    }

    if let Some(io_err) = err.downcast_ref::<io::Error>() {
        if io_err.kind() == io::ErrorKind::NotFound {
            return Response::text(canonical_message(StatusCode::NOT_FOUND))
                .status(StatusCode::NOT_FOUND);
        }
    }

    Response::text(canonical_message(StatusCode::INTERNAL_SERVER_ERROR))
        .status(StatusCode::INTERNAL_SERVER_ERROR)
}

fn canonical_message(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or("Unknown Error").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("database tipped over")]
    struct Opaque;

    #[test]
    fn display_shows_the_message() {
        let err = HttpError::not_found("no such widget");
        assert_eq!(err.to_string(), "no such widget");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn expose_follows_the_status_class() {
        assert!(HttpError::bad_request("short").expose());
        assert!(!HttpError::internal("secret").expose());
        assert!(HttpError::internal("shown anyway").with_expose(true).expose());
    }

    #[test]
    fn exposed_error_keeps_status_and_message() {
        let err: BoxError = Box::new(HttpError::new(StatusCode::IM_A_TEAPOT, "short and stout"));
        let response = error_to_response(&err);
        assert_eq!(response.status_code(), StatusCode::IM_A_TEAPOT);
        assert_eq!(response.body_bytes().as_ref(), b"short and stout");
    }

    #[test]
    fn hidden_error_uses_the_canonical_reason() {
        let err: BoxError = Box::new(HttpError::internal("connection string leaked"));
        let response = error_to_response(&err);
        assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.body_bytes().as_ref(), b"Internal Server Error");
    }

    #[test]
    fn attached_headers_reach_the_response() {
        let err: BoxError = Box::new(
            HttpError::new(StatusCode::UNAUTHORIZED, "credentials required").with_header(
                http::header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"stoa\""),
            ),
        );
        let response = error_to_response(&err);
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.get("www-authenticate"), Some("Basic realm=\"stoa\""));
    }

    #[test]
    fn io_not_found_becomes_404() {
        let err: BoxError = Box::new(io::Error::new(io::ErrorKind::NotFound, "gone"));
        let response = error_to_response(&err);
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(response.body_bytes().as_ref(), b"Not Found");
    }

    #[test]
    fn opaque_errors_become_bare_500() {
        let err: BoxError = Box::new(Opaque);
        let response = error_to_response(&err);
        assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.body_bytes().as_ref(), b"Internal Server Error");
    }
}
