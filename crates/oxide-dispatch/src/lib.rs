//! # oxide-dispatch
//!
//! Request routing and middleware dispatch.
//!
//! This crate provides:
//! - A segment trie matching static paths, `:name` parameters and `*name`
//!   wildcards, with static segments taking precedence
//! - Handler chains with implicit continuation: a middleware that returns
//!   without calling [`Context::next`] hands over to the next unit
//! - Route groups ([`Scope`]) sharing a prefix and middleware
//! - A pool of reusable request contexts
//! - A hyper-based HTTP/1 server adapter
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use oxide_dispatch::prelude::*;
//!
//! fn show_user(ctx: &mut Context) -> BoxFuture<'_, ()> {
//!     Box::pin(async move {
//!         let id = ctx.param("id").to_string();
//!         ctx.json(200, &serde_json::json!({ "id": id }));
//!     })
//! }
//!
//! let mut app = Router::builder();
//! app.plug(Logger::new().boxed());
//! app.plug(Recovery.boxed());
//! app.get("/users/:id", show_user)?;
//!
//! let router = Arc::new(app.build());
//! oxide_dispatch::server::run(([127, 0, 0, 1], 3000).into(), router).await?;
//! ```
//!
//! ## Middleware
//!
//! Middleware and handlers share one signature. A unit that needs to run code
//! after the rest of the chain awaits [`Context::next`]; a unit that rejects a
//! request writes a response and calls [`Context::abort`]:
//!
//! ```ignore
//! let auth = handler_fn(|ctx| {
//!     Box::pin(async move {
//!         match ctx.header("Authorization") {
//!             Some(token) if token.starts_with("Bearer ") => {
//!                 let user = token["Bearer ".len()..].to_string();
//!                 ctx.set("user", user);
//!             }
//!             _ => ctx.fail(401, "unauthorized"),
//!         }
//!     })
//! });
//!
//! let mut api = app.scope("/api", [auth]);
//! api.get("/me", |ctx| Box::pin(async move {
//!     let user = ctx.get::<String>("user").cloned().unwrap_or_default();
//!     ctx.text(200, user);
//! }))?;
//! ```

mod config;
mod context;
mod error;
mod handler;
pub mod middleware;
mod params;
mod path;
mod pool;
mod request;
mod response;
mod router;
mod scope;
pub mod server;
mod trie;

pub use config::RouterConfig;
pub use context::{Context, ExecutionState};
pub use error::{BoxError, HttpError, Result, RouterError};
pub use handler::{handler_fn, BoxFuture, BoxedHandler, Chain, Handler};
pub use middleware::{ErrorHandler, Logger, Recovery, RequestLog};
pub use params::{Params, PathParams};
pub use path::{PathPattern, PathSegment};
pub use pool::{ContextPool, PooledContext};
pub use request::{Method, MethodSet, Request};
pub use response::{status_text, Response, ResponseWriter};
pub use router::{Route, RouteMatch, Router, RouterBuilder};
pub use scope::{Routes, Scope};

/// The types needed to declare routes and write handlers.
pub mod prelude {
    pub use crate::{
        handler_fn, BoxFuture, BoxedHandler, Context, ErrorHandler, Handler, HttpError, Logger,
        Method, Recovery, Request, Response, Router, RouterBuilder, Routes,
    };
}
