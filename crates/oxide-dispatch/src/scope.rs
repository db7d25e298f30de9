//! Route registration and route groups.

use crate::context::Context;
use crate::error::Result;
use crate::handler::{handler_fn, BoxFuture, BoxedHandler, Chain};
use crate::path;
use crate::request::Method;
use crate::router::RouterBuilder;

macro_rules! method_routes {
    ($($method:ident, $with:ident => $variant:ident;)*) => {
        $(
            #[doc = concat!("Registers a ", stringify!($variant), " route.")]
            fn $method<F>(&mut self, path: &str, handler: F) -> Result<&mut Self>
            where
                Self: Sized,
                F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
            {
                self.handle(Method::$variant, path, Vec::new(), handler_fn(handler))
            }

            #[doc = concat!("Registers a ", stringify!($variant), " route with route-level middleware.")]
            fn $with<F>(
                &mut self,
                path: &str,
                middleware: impl IntoIterator<Item = BoxedHandler>,
                handler: F,
            ) -> Result<&mut Self>
            where
                Self: Sized,
                F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
            {
                self.handle(Method::$variant, path, middleware, handler_fn(handler))
            }
        )*
    };
}

/// Route registration shared by [`RouterBuilder`] and [`Scope`].
///
/// A route's chain is the inherited scope middleware, then the route-level
/// middleware, then the handler. Global middleware added with
/// [`RouterBuilder::plug`] is prepended when the router is built.
///
/// ```ignore
/// let mut app = Router::builder();
/// app.get("/health", |ctx| Box::pin(async move { ctx.text(200, "ok") }))?;
///
/// let mut api = app.scope("/api", [auth]);
/// api.get("/users/:id", show_user)?
///     .post_with("/users", [validate], create_user)?;
/// ```
pub trait Routes {
    /// Path prefix applied to routes registered here.
    fn base_path(&self) -> &str;

    /// Middleware inherited by routes registered here.
    fn middleware(&self) -> &[BoxedHandler];

    /// The builder that owns the route table.
    fn builder(&mut self) -> &mut RouterBuilder;

    /// Registers `handler` for `method` at `path`, after `middleware`.
    fn handle(
        &mut self,
        method: Method,
        path: &str,
        middleware: impl IntoIterator<Item = BoxedHandler>,
        handler: BoxedHandler,
    ) -> Result<&mut Self>
    where
        Self: Sized,
    {
        let pattern = path::join(self.base_path(), path);
        let chain = Chain::new(
            self.middleware().iter().cloned().chain(middleware),
            handler,
        );
        self.builder().register(method, &pattern, chain)?;
        Ok(self)
    }

    method_routes! {
        get, get_with => Get;
        head, head_with => Head;
        post, post_with => Post;
        put, put_with => Put;
        patch, patch_with => Patch;
        delete, delete_with => Delete;
        options, options_with => Options;
    }

    /// Opens a nested group under `prefix` with extra `middleware`.
    fn scope(
        &mut self,
        prefix: &str,
        middleware: impl IntoIterator<Item = BoxedHandler>,
    ) -> Scope<'_>
    where
        Self: Sized,
    {
        let prefix = path::join(self.base_path(), prefix);
        let middleware = self.middleware().iter().cloned().chain(middleware).collect();
        Scope {
            router: self.builder(),
            prefix,
            middleware,
        }
    }
}

/// A route group sharing a path prefix and middleware.
///
/// Registration goes straight into the parent [`RouterBuilder`]; a scope holds
/// no routes of its own.
pub struct Scope<'r> {
    router: &'r mut RouterBuilder,
    prefix: String,
    middleware: Vec<BoxedHandler>,
}

impl Scope<'_> {
    /// Appends middleware for routes registered after this call.
    pub fn use_middleware(&mut self, middleware: BoxedHandler) -> &mut Self {
        self.middleware.push(middleware);
        self
    }

    /// Returns the normalized prefix of this scope.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Routes for Scope<'_> {
    fn base_path(&self) -> &str {
        &self.prefix
    }

    fn middleware(&self) -> &[BoxedHandler] {
        &self.middleware
    }

    fn builder(&mut self) -> &mut RouterBuilder {
        &mut *self.router
    }
}

impl std::fmt::Debug for Scope<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("prefix", &self.prefix)
            .field("middleware", &self.middleware.len())
            .finish()
    }
}
