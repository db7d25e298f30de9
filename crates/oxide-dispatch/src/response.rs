//! HTTP response type and the buffered writer used by [`Context`](crate::Context).

use std::collections::HashMap;

use tracing::warn;

/// An HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: Vec<u8>,
}

impl Response {
    /// Creates a new response with the given status.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// Creates a 200 OK response.
    pub fn ok() -> Self {
        Self::new(200)
    }

    /// Creates a response with plain text content.
    pub fn text(body: impl Into<String>) -> Self {
        Self::ok()
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(body.into())
    }

    /// Sets a header.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Sets the status code.
    #[must_use]
    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Gets a header value, ignoring case.
    pub fn get_header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the body as a string.
    pub fn body_string(&self) -> Option<String> {
        String::from_utf8(self.body.clone()).ok()
    }

    /// Returns the status text for the current status code.
    pub fn status_text(&self) -> &'static str {
        status_text(self.status)
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::ok()
    }
}

/// Returns the canonical reason phrase for a status code.
pub fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        307 => "Temporary Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// Buffered response state owned by a [`Context`](crate::Context).
///
/// The first status write commits the status code; later status writes are
/// ignored. Body writes append and commit `200` if nothing was committed yet.
/// Headers set after the status is committed are dropped.
#[derive(Debug, Default)]
pub struct ResponseWriter {
    status: Option<u16>,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

impl ResponseWriter {
    /// Commits the status code if none has been written yet.
    ///
    /// Returns `false` if a status was already committed.
    pub fn write_status(&mut self, status: u16) -> bool {
        match self.status {
            Some(existing) => {
                warn!(existing, ignored = status, "superfluous status write");
                false
            }
            None => {
                self.status = Some(status);
                true
            }
        }
    }

    /// Appends bytes to the body, committing `200` if needed.
    pub fn write(&mut self, bytes: &[u8]) {
        if self.status.is_none() {
            self.status = Some(200);
        }
        self.body.extend_from_slice(bytes);
    }

    /// Sets a header. Ignored once the status is committed.
    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if self.status.is_some() {
            warn!(header = %key, "header set after status was written");
            return;
        }
        self.headers.insert(key, value.into());
    }

    /// Returns a header that will be sent.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Returns whether a status has been committed.
    pub fn written(&self) -> bool {
        self.status.is_some()
    }

    /// Returns the committed status, if any.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Returns the body written so far.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Takes the buffered response out, leaving the writer empty.
    pub(crate) fn take(&mut self) -> Response {
        Response {
            status: self.status.take().unwrap_or(200),
            headers: std::mem::take(&mut self.headers),
            body: std::mem::take(&mut self.body),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.status = None;
        self.headers.clear();
        self.body.clear();
    }
}
