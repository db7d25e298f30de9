//! Reuse of request contexts.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tracing::warn;

use crate::context::Context;
use crate::request::Request;

/// A pool of idle [`Context`] values.
///
/// Contexts are reset when acquired, so nothing from a previous request is
/// visible to the next one. A context whose guard is dropped while the thread
/// is panicking is discarded instead of returned.
#[derive(Debug)]
pub struct ContextPool {
    idle: Mutex<Vec<Box<Context>>>,
    max_idle: usize,
    created: AtomicUsize,
}

impl ContextPool {
    /// Creates a pool that keeps at most `max_idle` contexts around.
    pub fn new(max_idle: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            max_idle,
            created: AtomicUsize::new(0),
        }
    }

    /// Takes a context from the pool, or creates one, bound to `request`.
    pub fn acquire(&self, request: Request) -> PooledContext<'_> {
        let reused = self.idle.lock().pop();
        let ctx = match reused {
            Some(mut ctx) => {
                ctx.reset(request);
                ctx
            }
            None => {
                self.created.fetch_add(1, Ordering::Relaxed);
                Box::new(Context::new(request))
            }
        };
        PooledContext {
            pool: self,
            ctx: Some(ctx),
        }
    }

    fn release(&self, mut ctx: Box<Context>) {
        if std::thread::panicking() {
            warn!("discarding context released during a panic");
            return;
        }
        ctx.recycle();
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(ctx);
        }
    }

    /// Number of contexts waiting for reuse.
    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }

    /// Number of contexts allocated over the pool's lifetime.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }
}

impl Default for ContextPool {
    fn default() -> Self {
        Self::new(1024)
    }
}

/// A context on loan from a [`ContextPool`]; returned when dropped.
pub struct PooledContext<'p> {
    pool: &'p ContextPool,
    ctx: Option<Box<Context>>,
}

impl Deref for PooledContext<'_> {
    type Target = Context;

    fn deref(&self) -> &Context {
        self.ctx.as_deref().expect("context is present until drop")
    }
}

impl DerefMut for PooledContext<'_> {
    fn deref_mut(&mut self) -> &mut Context {
        self.ctx.as_deref_mut().expect("context is present until drop")
    }
}

impl Drop for PooledContext<'_> {
    fn drop(&mut self) {
        if let Some(ctx) = self.ctx.take() {
            self.pool.release(ctx);
        }
    }
}

impl std::fmt::Debug for PooledContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledContext").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reuses_released_context() {
        let pool = ContextPool::new(4);
        {
            let mut ctx = pool.acquire(Request::get("/first"));
            ctx.set("user", "alice".to_string());
            ctx.text(200, "hello");
        }
        assert_eq!(pool.idle(), 1);

        let ctx = pool.acquire(Request::get("/second"));
        assert_eq!(pool.created(), 1);
        assert_eq!(pool.idle(), 0);
        assert_eq!(ctx.path(), "/second");
        assert!(!ctx.contains("user"));
        assert!(!ctx.written());
    }

    #[test]
    fn test_idle_limit() {
        let pool = ContextPool::new(1);
        let a = pool.acquire(Request::default());
        let b = pool.acquire(Request::default());
        drop(a);
        drop(b);
        assert_eq!(pool.created(), 2);
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn test_zero_capacity_never_keeps() {
        let pool = ContextPool::new(0);
        drop(pool.acquire(Request::default()));
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn test_panicking_release_discards() {
        let pool = ContextPool::new(4);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ctx = pool.acquire(Request::default());
            panic!("handler blew up");
        }));
        assert!(result.is_err());
        assert_eq!(pool.idle(), 0);
        assert_eq!(pool.created(), 1);
    }
}
