//! Handler and middleware units.
//!
//! Middleware and terminal handlers share one signature: they receive the
//! request [`Context`] and return a future. A chain is an ordered list of such
//! units; see [`Context::next`] for how it is driven.

use std::fmt;
use std::future::Future;
use std::ops::Deref;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;

/// A boxed future returned by handlers.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A unit of a handler chain: middleware or terminal handler.
///
/// # Example
///
/// ```ignore
/// struct RequestId;
///
/// impl Handler for RequestId {
///     fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
///         Box::pin(async move {
///             ctx.set("request_id", 42_u64);
///         })
///     }
/// }
/// ```
pub trait Handler: Send + Sync + 'static {
    /// Runs this unit against the context.
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()>;

    /// Boxes the unit so it can be placed in a chain.
    fn boxed(self) -> BoxedHandler
    where
        Self: Sized,
    {
        Arc::new(self)
    }
}

/// A shared, type-erased chain unit.
pub type BoxedHandler = Arc<dyn Handler>;

struct HandlerFn<F>(F);

impl<F> Handler for HandlerFn<F>
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        (self.0)(ctx)
    }
}

/// Wraps a closure or function as a chain unit.
///
/// ```ignore
/// let auth = handler_fn(|ctx| {
///     Box::pin(async move {
///         if ctx.header("Authorization").is_none() {
///             ctx.fail(401, "unauthorized");
///         }
///     })
/// });
/// ```
pub fn handler_fn<F>(f: F) -> BoxedHandler
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
{
    Arc::new(HandlerFn(f))
}

/// An ordered, immutable handler chain: middleware followed by exactly one
/// terminal handler.
#[derive(Clone)]
pub struct Chain(Arc<[BoxedHandler]>);

impl Chain {
    /// Composes `middleware ++ [handler]`.
    pub fn new(middleware: impl IntoIterator<Item = BoxedHandler>, handler: BoxedHandler) -> Self {
        middleware
            .into_iter()
            .chain(std::iter::once(handler))
            .collect()
    }

    /// Returns a chain with `outer` prepended.
    pub(crate) fn wrapped(&self, outer: &[BoxedHandler]) -> Self {
        if outer.is_empty() {
            return self.clone();
        }
        outer.iter().chain(self.0.iter()).cloned().collect()
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self(Arc::from(Vec::new()))
    }
}

impl Deref for Chain {
    type Target = [BoxedHandler];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromIterator<BoxedHandler> for Chain {
    fn from_iter<I: IntoIterator<Item = BoxedHandler>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain").field("len", &self.0.len()).finish()
    }
}
