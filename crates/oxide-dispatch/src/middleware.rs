//! Built-in middleware.
//!
//! All of these wrap the rest of the chain with [`Context::next`], so they
//! should be installed before the middleware they are meant to observe,
//! usually with [`RouterBuilder::plug`](crate::RouterBuilder::plug).

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tracing::{error, info, warn};

use crate::context::Context;
use crate::error::HttpError;
use crate::handler::{BoxFuture, Handler};
use crate::request::Method;

/// One finished request, as seen by [`Logger`].
#[derive(Debug)]
pub struct RequestLog<'a> {
    /// Request method.
    pub method: Method,
    /// Request path.
    pub path: &'a str,
    /// Matched route pattern, if any.
    pub route: Option<&'a str>,
    /// Response status.
    pub status: u16,
    /// Time spent in the rest of the chain.
    pub latency: Duration,
    /// Error left on the context.
    pub error: Option<&'a (dyn StdError + Send + Sync + 'static)>,
}

type LogFn = Box<dyn Fn(&RequestLog<'_>) + Send + Sync>;

/// Logs every request after the rest of the chain ran.
///
/// By default each request becomes one `info` event. A callback replaces the
/// event with custom formatting.
#[derive(Default)]
pub struct Logger {
    callback: Option<LogFn>,
}

impl Logger {
    /// Creates a logger that emits `tracing` events.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a logger that hands each record to `callback`.
    pub fn with_callback<F>(callback: F) -> Self
    where
        F: Fn(&RequestLog<'_>) + Send + Sync + 'static,
    {
        Self {
            callback: Some(Box::new(callback)),
        }
    }
}

impl Handler for Logger {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let start = Instant::now();
            ctx.next().await;

            let record = RequestLog {
                method: ctx.method(),
                path: ctx.path(),
                route: ctx.full_path(),
                status: ctx.response().status().unwrap_or(200),
                latency: start.elapsed(),
                error: ctx.error(),
            };
            match &self.callback {
                Some(callback) => callback(&record),
                None => info!(
                    method = %record.method,
                    path = record.path,
                    route = record.route.unwrap_or("-"),
                    status = record.status,
                    latency_us = micros(record.latency),
                    error = record.error.map(tracing::field::display),
                    "request"
                ),
            }
        })
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

/// Turns a panic in the rest of the chain into a 500 response.
///
/// The panic is logged, recorded as the context error and the chain is
/// aborted. If a response was already started it is left as is.
#[derive(Debug, Default, Clone, Copy)]
pub struct Recovery;

impl Handler for Recovery {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let Err(payload) = AssertUnwindSafe(ctx.next()).catch_unwind().await else {
                return;
            };

            let message = panic_message(payload.as_ref());
            error!(
                method = %ctx.method(),
                path = ctx.path(),
                panic = %message,
                "handler panicked"
            );
            let failure = HttpError::internal();
            if !ctx.written() {
                ctx.json(failure.code, &failure);
            }
            ctx.set_error(failure);
            ctx.abort();
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

type Responder = Box<dyn Fn(&mut Context, &HttpError) + Send + Sync>;

/// Answers an error left on the context when nothing was written.
///
/// An [`HttpError`] keeps its own status and message. Any other error becomes
/// a 500 whose message does not leak the error text.
pub struct ErrorHandler {
    responder: Responder,
}

impl ErrorHandler {
    /// Creates a handler that writes the error as `{"code", "message"}` JSON.
    pub fn new() -> Self {
        Self::with_responder(|ctx, err| ctx.json(err.code, err))
    }

    /// Creates a handler that delegates writing to `responder`.
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&mut Context, &HttpError) + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
        }
    }
}

impl Default for ErrorHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for ErrorHandler {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            ctx.next().await;
            if ctx.written() {
                return;
            }
            let Some(err) = ctx.error() else {
                return;
            };
            let http = match err.downcast_ref::<HttpError>() {
                Some(http) => http.clone(),
                None => {
                    warn!(error = %err, path = ctx.path(), "unhandled request error");
                    HttpError::internal()
                }
            };
            (self.responder)(ctx, &http);
        })
    }
}

impl fmt::Debug for ErrorHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorHandler").finish_non_exhaustive()
    }
}

/// Whole microseconds, saturating at `u64::MAX`.
fn micros(latency: Duration) -> u64 {
    u64::try_from(latency.as_micros()).unwrap_or(u64::MAX)
}
