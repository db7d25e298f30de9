//! Per-request execution context and the chain executor.
//!
//! A [`Context`] carries one request through its handler chain. The chain is
//! driven by a cursor owned by the context:
//!
//! - When a unit returns without calling [`Context::next`], the executor
//!   advances to the following unit on its own.
//! - A unit that calls `next().await` runs the rest of the chain before its
//!   own code continues, which is how wrap-style middleware (timing, logging)
//!   is written.
//! - [`Context::abort`] stops the chain. No further unit runs, including from
//!   `next()` calls that are already on the stack.

use std::any::Any;
use std::borrow::Cow;
use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::error::{BoxError, HttpError};
use crate::handler::Chain;
use crate::params::PathParams;
use crate::request::{percent_decode, Method, Request};
use crate::response::{Response, ResponseWriter};

/// Execution state of a context's chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    /// Bound to a request, chain not started.
    Pending,
    /// The chain is executing.
    Running,
    /// Every unit ran.
    Completed,
    /// A unit aborted the chain.
    Aborted,
}

/// Per-request state handed to every handler in the chain.
pub struct Context {
    request: Request,
    response: ResponseWriter,
    params: PathParams,
    store: HashMap<String, Box<dyn Any + Send + Sync>>,
    chain: Option<Chain>,
    cursor: usize,
    aborted: bool,
    state: ExecutionState,
    error: Option<BoxError>,
    route: Option<Arc<str>>,
}

impl Context {
    /// Creates a context bound to `request`.
    pub fn new(request: Request) -> Self {
        Self {
            request,
            response: ResponseWriter::default(),
            params: PathParams::new(),
            store: HashMap::new(),
            chain: None,
            cursor: 0,
            aborted: false,
            state: ExecutionState::Pending,
            error: None,
            route: None,
        }
    }

    /// Clears all per-request state and binds a new request.
    pub(crate) fn reset(&mut self, request: Request) {
        self.recycle();
        self.request = request;
    }

    /// Drops everything the previous request left behind, keeping buffers.
    pub(crate) fn recycle(&mut self) {
        self.request = Request::default();
        self.response.clear();
        self.params.clear();
        self.store.clear();
        self.chain = None;
        self.cursor = 0;
        self.aborted = false;
        self.state = ExecutionState::Pending;
        self.error = None;
        self.route = None;
    }

    // ------------------------------------------------------------------
    // Request
    // ------------------------------------------------------------------

    /// Returns the bound request.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Returns the bound request mutably.
    pub fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    /// Returns the request method.
    pub fn method(&self) -> Method {
        self.request.method
    }

    /// Returns the request path.
    pub fn path(&self) -> &str {
        &self.request.path
    }

    /// Returns a request header, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request.get_header(name)
    }

    /// Returns a query parameter.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.request.get_query(name)
    }

    /// Returns the raw value bound to a path parameter, or `""`.
    pub fn param(&self, name: &str) -> &str {
        self.params.get(name).unwrap_or("")
    }

    /// Returns a path parameter with percent-escapes decoded, or `""`.
    pub fn param_decoded(&self, name: &str) -> Cow<'_, str> {
        percent_decode(self.param(name), false)
    }

    /// Returns all path parameters.
    pub fn params(&self) -> &PathParams {
        &self.params
    }

    /// Returns the pattern of the matched route, e.g. `/users/:id`.
    pub fn full_path(&self) -> Option<&str> {
        self.route.as_deref()
    }

    pub(crate) fn parts_mut(&mut self) -> (&Request, &mut PathParams) {
        (&self.request, &mut self.params)
    }

    pub(crate) fn set_route(&mut self, pattern: Arc<str>) {
        self.route = Some(pattern);
    }

    // ------------------------------------------------------------------
    // Store
    // ------------------------------------------------------------------

    /// Stores a value for later units in the chain. Last write wins.
    pub fn set<V: Any + Send + Sync>(&mut self, key: impl Into<String>, value: V) {
        self.store.insert(key.into(), Box::new(value));
    }

    /// Returns the value stored under `key` if it has type `V`.
    pub fn get<V: Any>(&self, key: &str) -> Option<&V> {
        self.store.get(key).and_then(|value| value.downcast_ref::<V>())
    }

    /// Returns the value stored under `key` mutably if it has type `V`.
    pub fn get_mut<V: Any>(&mut self, key: &str) -> Option<&mut V> {
        self.store
            .get_mut(key)
            .and_then(|value| value.downcast_mut::<V>())
    }

    /// Returns whether anything is stored under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.store.contains_key(key)
    }

    // ------------------------------------------------------------------
    // Chain control
    // ------------------------------------------------------------------

    /// Runs the remainder of the chain, then returns to the caller.
    ///
    /// Calling it is only needed to run code after downstream units; a unit
    /// that simply returns is followed by the next one automatically.
    pub async fn next(&mut self) {
        let Some(chain) = self.chain.clone() else {
            return;
        };
        while !self.aborted {
            let Some(unit) = chain.get(self.cursor) else {
                break;
            };
            self.cursor += 1;
            unit.call(self).await;
        }
    }

    /// Runs `chain` against this context from the first unit.
    pub async fn run(&mut self, chain: Chain) {
        self.chain = Some(chain);
        self.cursor = 0;
        self.state = ExecutionState::Running;
        self.next().await;
        self.state = if self.aborted {
            ExecutionState::Aborted
        } else {
            ExecutionState::Completed
        };
    }

    /// Stops the chain. Idempotent.
    pub fn abort(&mut self) {
        self.aborted = true;
    }

    /// Returns whether the chain was aborted.
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Returns the execution state.
    pub fn state(&self) -> ExecutionState {
        self.state
    }

    // ------------------------------------------------------------------
    // Errors
    // ------------------------------------------------------------------

    /// Returns the current error, if any.
    pub fn error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.error.as_deref()
    }

    /// Records an error, replacing any previous one.
    pub fn set_error(&mut self, error: impl Into<BoxError>) {
        self.error = Some(error.into());
    }

    /// Takes the current error out of the context.
    pub fn take_error(&mut self) -> Option<BoxError> {
        self.error.take()
    }

    // ------------------------------------------------------------------
    // Response
    // ------------------------------------------------------------------

    /// Returns the response being written.
    pub fn response(&self) -> &ResponseWriter {
        &self.response
    }

    /// Returns the response being written, mutably.
    pub fn response_mut(&mut self) -> &mut ResponseWriter {
        &mut self.response
    }

    /// Returns whether a status has been written.
    pub fn written(&self) -> bool {
        self.response.written()
    }

    /// Sets a response header.
    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.response.set_header(key, value);
    }

    /// Writes a status with an empty body.
    pub fn status(&mut self, code: u16) {
        self.response.write_status(code);
    }

    /// Appends raw bytes to the body.
    pub fn write(&mut self, bytes: &[u8]) {
        self.response.write(bytes);
    }

    /// Writes a body with the given content type.
    pub fn bytes(&mut self, code: u16, content_type: &str, data: &[u8]) {
        if !self.response.written() {
            self.response.set_header("Content-Type", content_type);
        }
        self.response.write_status(code);
        self.response.write(data);
    }

    /// Writes a plain text body.
    pub fn text(&mut self, code: u16, body: impl AsRef<str>) {
        self.bytes(code, "text/plain; charset=utf-8", body.as_ref().as_bytes());
    }

    /// Writes an HTML body.
    pub fn html(&mut self, code: u16, body: impl AsRef<str>) {
        self.bytes(code, "text/html; charset=utf-8", body.as_ref().as_bytes());
    }

    /// Serializes `value` as the JSON body.
    ///
    /// A serialization failure is recorded with [`set_error`](Self::set_error)
    /// and answered with a 500.
    pub fn json<T: Serialize + ?Sized>(&mut self, code: u16, value: &T) {
        match serde_json::to_vec(value) {
            Ok(body) => self.bytes(code, "application/json; charset=utf-8", &body),
            Err(err) => {
                self.set_error(err);
                self.response.write_status(500);
            }
        }
    }

    /// Writes a redirect to `location`.
    pub fn redirect(&mut self, code: u16, location: &str) {
        if !self.response.written() {
            self.response.set_header("Location", location);
        }
        self.response.write_status(code);
    }

    /// Writes `{"code", "message"}` as JSON, records it as the current error
    /// and aborts the chain.
    pub fn fail(&mut self, code: u16, message: impl Into<String>) {
        let error = HttpError::new(code, message);
        self.json(code, &error);
        self.set_error(error);
        self.abort();
    }

    /// Writes an RFC 7807 problem document.
    pub fn problem(&mut self, code: u16, title: &str, detail: &str) {
        let body = serde_json::json!({
            "type": "about:blank",
            "title": title,
            "status": code,
            "detail": detail,
        });
        self.bytes(
            code,
            "application/problem+json",
            body.to_string().as_bytes(),
        );
    }

    pub(crate) fn take_response(&mut self) -> Response {
        self.response.take()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("method", &self.request.method)
            .field("path", &self.request.path)
            .field("route", &self.route)
            .field("state", &self.state)
            .field("cursor", &self.cursor)
            .finish_non_exhaustive()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(Request::default())
    }
}
