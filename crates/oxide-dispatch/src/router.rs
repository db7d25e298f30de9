//! Route table, lookup and request dispatch.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::config::RouterConfig;
use crate::context::Context;
use crate::error::Result;
use crate::handler::{BoxFuture, BoxedHandler, Chain, Handler};
use crate::params::Params;
use crate::path::PathPattern;
use crate::pool::ContextPool;
use crate::request::{Method, MethodSet, Request};
use crate::response::Response;
use crate::scope::Routes;
use crate::trie::{Node, Trie};

/// A registered route.
#[derive(Debug)]
pub struct Route {
    method: Method,
    pattern: Arc<str>,
    chain: Chain,
}

impl Route {
    /// HTTP method of the route.
    pub fn method(&self) -> Method {
        self.method
    }

    /// Normalized pattern, e.g. `/users/:id`.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The full handler chain.
    pub fn chain(&self) -> &Chain {
        &self.chain
    }
}

/// Outcome of a route lookup.
#[derive(Debug)]
pub enum RouteMatch<'r, 'p> {
    /// A route exists for the path and method.
    Found {
        /// The matched route.
        route: &'r Route,
        /// Parameters bound from the path.
        params: Params<'r, 'p>,
    },
    /// The path exists, but not for this method.
    MethodNotAllowed {
        /// Methods the path does accept.
        allowed: MethodSet,
    },
    /// No route matches the path.
    NotFound,
}

/// Mutable route table. Turn it into a [`Router`] with [`build`](Self::build).
#[derive(Default)]
pub struct RouterBuilder {
    trie: Trie,
    routes: Vec<Route>,
    global: Vec<BoxedHandler>,
    config: RouterConfig,
}

impl RouterBuilder {
    /// Creates an empty builder with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty builder with `config`.
    pub fn with_config(config: RouterConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Adds middleware that wraps every route, including the built-in 404
    /// and 405 responses.
    ///
    /// Global middleware runs before any scope middleware regardless of when
    /// it is added.
    pub fn plug(&mut self, middleware: BoxedHandler) -> &mut Self {
        self.global.push(middleware);
        self
    }

    pub(crate) fn register(&mut self, method: Method, pattern: &str, chain: Chain) -> Result<()> {
        let parsed = PathPattern::parse(pattern)?;
        self.trie.insert(method, &parsed, self.routes.len())?;
        debug!(
            method = %method,
            pattern = parsed.pattern(),
            handlers = chain.len(),
            "route registered"
        );
        self.routes.push(Route {
            method,
            pattern: Arc::from(parsed.pattern()),
            chain,
        });
        Ok(())
    }

    /// Freezes the route table.
    pub fn build(self) -> Router {
        let global = self.global;
        let routes: Vec<Route> = self
            .routes
            .into_iter()
            .map(|route| Route {
                chain: route.chain.wrapped(&global),
                ..route
            })
            .collect();
        debug!(
            routes = routes.len(),
            global_middleware = global.len(),
            "router built"
        );

        Router {
            trie: self.trie,
            routes,
            not_found: Chain::new(global.iter().cloned(), NotFoundHandler.boxed()),
            method_not_allowed: Chain::new(global.iter().cloned(), MethodNotAllowedHandler.boxed()),
            pool: ContextPool::new(self.config.max_idle_contexts),
            config: self.config,
        }
    }
}

impl Routes for RouterBuilder {
    fn base_path(&self) -> &str {
        ""
    }

    fn middleware(&self) -> &[BoxedHandler] {
        &[]
    }

    fn builder(&mut self) -> &mut RouterBuilder {
        self
    }
}

impl fmt::Debug for RouterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterBuilder")
            .field("routes", &self.routes)
            .field("global", &self.global.len())
            .field("config", &self.config)
            .finish()
    }
}

/// Immutable route table with a context pool. Share it behind an `Arc`.
#[derive(Debug)]
pub struct Router {
    trie: Trie,
    routes: Vec<Route>,
    not_found: Chain,
    method_not_allowed: Chain,
    pool: ContextPool,
    config: RouterConfig,
}

impl Router {
    /// Starts a new route table.
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Registered routes in registration order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// The configuration the router was built with.
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// The pool contexts are drawn from.
    pub fn pool(&self) -> &ContextPool {
        &self.pool
    }

    /// Resolves `method` and `path` to a route.
    ///
    /// The walk keeps backtracking until it reaches a node that serves
    /// `method`, so `/users/:id` can answer a POST that the static
    /// `/users/new` only registers for GET. A HEAD request falls back to
    /// the GET route when `auto_head` is on. When no node serves the method,
    /// the first node in precedence order that carries any route supplies
    /// the `Allow` set.
    pub fn lookup<'r, 'p>(&'r self, method: Method, path: &'p str) -> RouteMatch<'r, 'p> {
        let head_falls_back = method == Method::Head && self.config.auto_head;
        let serves = |node: &Node| {
            node.route(method).is_some() || (head_falls_back && node.route(Method::Get).is_some())
        };
        if let Some((node, params)) = self.trie.find(path, serves) {
            let index = node.route(method).or_else(|| node.route(Method::Get));
            if let Some(index) = index {
                return RouteMatch::Found {
                    route: &self.routes[index],
                    params,
                };
            }
        }

        if !self.config.handle_method_not_allowed {
            return RouteMatch::NotFound;
        }
        // The first terminal node in precedence order answers for the path.
        let Some((node, _)) = self.trie.find(path, Node::has_routes) else {
            return RouteMatch::NotFound;
        };
        let mut allowed = node.methods();
        if self.config.auto_head && allowed.contains(Method::Get) {
            allowed.insert(Method::Head);
        }
        RouteMatch::MethodNotAllowed { allowed }
    }

    /// Dispatches `request` through its chain and returns the response.
    pub async fn serve(&self, request: Request) -> Response {
        let method = request.method;
        let mut ctx = self.pool.acquire(request);

        let target = {
            let (request, params) = ctx.parts_mut();
            match self.lookup(request.method, &request.path) {
                RouteMatch::Found { route, params: bound } => {
                    params.fill(&bound);
                    Target::Route(route)
                }
                RouteMatch::MethodNotAllowed { allowed } => Target::MethodNotAllowed(allowed),
                RouteMatch::NotFound => Target::NotFound,
            }
        };

        let chain = match target {
            Target::Route(route) => {
                ctx.set_route(Arc::clone(&route.pattern));
                route.chain.clone()
            }
            Target::MethodNotAllowed(allowed) => {
                ctx.set_header("Allow", allowed.to_header_value());
                self.method_not_allowed.clone()
            }
            Target::NotFound => self.not_found.clone(),
        };
        trace!(method = %method, path = ctx.path(), route = ?ctx.full_path(), "dispatching");

        ctx.run(chain).await;

        let mut response = ctx.take_response();
        if method == Method::Head {
            response.body.clear();
        }
        response
    }
}

enum Target<'r> {
    Route(&'r Route),
    MethodNotAllowed(MethodSet),
    NotFound,
}

struct NotFoundHandler;

impl Handler for NotFoundHandler {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            ctx.text(404, "404 page not found");
        })
    }
}

struct MethodNotAllowedHandler;

impl Handler for MethodNotAllowedHandler {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            ctx.text(405, "405 method not allowed");
        })
    }
}
