//! A small JSON API showing scopes, global middleware and the request store.
//!
//! ```text
//! cargo run -p oxide-dispatch --example scoped_api -- --addr 127.0.0.1:3000
//! curl localhost:3000/health
//! curl -H 'Authorization: Bearer alice' localhost:3000/api/v1/products/42
//! curl -H 'Authorization: Bearer alice' -d '{"name":"lamp"}' localhost:3000/api/v1/products
//! RUST_LOG=debug cargo run -p oxide-dispatch --example scoped_api
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use oxide_dispatch::prelude::*;

/// Example API server.
#[derive(Parser)]
#[command(name = "scoped_api")]
#[command(about, long_about = None)]
struct Cli {
    /// Address to listen on.
    #[arg(short, long, env = "OXIDE_ADDR", default_value = "127.0.0.1:3000")]
    addr: SocketAddr,

    /// Enable verbose output. Ignored when `RUST_LOG` is set.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct Product {
    id: u64,
    name: String,
    owner: String,
}

#[derive(Deserialize)]
struct NewProduct {
    name: String,
}

/// Accepts `Authorization: Bearer <user>` and stores the user.
fn bearer_auth(ctx: &mut Context) -> BoxFuture<'_, ()> {
    Box::pin(async move {
        let user = ctx
            .header("Authorization")
            .and_then(|value| value.strip_prefix("Bearer "))
            .filter(|token| !token.is_empty())
            .map(str::to_string);
        match user {
            Some(user) => ctx.set("user", user),
            None => ctx.fail(401, "missing bearer token"),
        }
    })
}

fn health(ctx: &mut Context) -> BoxFuture<'_, ()> {
    Box::pin(async move {
        ctx.text(200, "ok");
    })
}

fn show_product(ctx: &mut Context) -> BoxFuture<'_, ()> {
    Box::pin(async move {
        let Ok(id) = ctx.param("id").parse::<u64>() else {
            ctx.problem(400, "invalid product id", "the id must be a positive integer");
            return;
        };
        let owner = ctx.get::<String>("user").cloned().unwrap_or_default();
        let product = Product {
            id,
            name: format!("product #{id}"),
            owner,
        };
        ctx.json(200, &product);
    })
}

fn create_product(ctx: &mut Context) -> BoxFuture<'_, ()> {
    Box::pin(async move {
        let new = match ctx.request().json::<NewProduct>() {
            Ok(new) => new,
            Err(err) => {
                ctx.problem(400, "invalid product", &err.to_string());
                return;
            }
        };
        let owner = ctx.get::<String>("user").cloned().unwrap_or_default();
        let product = Product {
            id: 1,
            name: new.name,
            owner,
        };
        ctx.set_header("Location", format!("/api/v1/products/{}", product.id));
        ctx.json(201, &product);
    })
}

fn download(ctx: &mut Context) -> BoxFuture<'_, ()> {
    Box::pin(async move {
        let file = ctx.param_decoded("file").into_owned();
        ctx.text(200, format!("would send {file}"));
    })
}

fn build_router() -> oxide_dispatch::Result<Router> {
    let mut app = Router::builder();
    app.plug(Logger::new().boxed());
    app.plug(Recovery.boxed());
    app.plug(ErrorHandler::new().boxed());

    app.get("/health", health)?;
    app.get("/files/*file", download)?;

    let mut api = app.scope("/api/v1", [handler_fn(bearer_auth)]);
    api.post("/products", create_product)?;
    let mut products = api.scope("/products", []);
    products
        .get("/:id", show_product)?
        .delete("/:id", |ctx| {
            Box::pin(async move {
                ctx.set_error(HttpError::new(403, "products are read-only"));
            })
        })?;

    Ok(app.build())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let router = Arc::new(build_router()?);
    oxide_dispatch::server::run(cli.addr, router).await?;
    Ok(())
}
