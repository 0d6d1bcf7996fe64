//! Middleware wraps command handlers in layers, outermost first.
//!
//! A middleware receives the context and a [`Next`] continuation. Calling [`Next::run`] runs the
//! rest of the chain and finally the handler; returning without calling it stops the invocation.

use std::sync::Arc;

use anyhow::Result;

use super::context::CommandContext;

/// A command handler after it has been registered.
pub type HandlerFn<S> =
    Arc<dyn for<'a> Fn(&mut CommandContext<'a, S>) -> Result<()> + Send + Sync>;

/// A registered middleware.
pub type MiddlewareFn<S> =
    Arc<dyn for<'a, 'c> Fn(&mut CommandContext<'a, S>, Next<'c, S>) -> Result<()> + Send + Sync>;

pub(crate) fn handler_fn<S, F>(handler: F) -> HandlerFn<S>
where
    F: for<'a> Fn(&mut CommandContext<'a, S>) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(handler)
}

pub(crate) fn middleware_fn<S, F>(middleware: F) -> MiddlewareFn<S>
where
    F: for<'a, 'c> Fn(&mut CommandContext<'a, S>, Next<'c, S>) -> Result<()>
        + Send
        + Sync
        + 'static,
{
    Arc::new(middleware)
}

/// The remainder of a middleware chain.
pub struct Next<'c, S> {
    links: &'c [MiddlewareFn<S>],
    handler: &'c HandlerFn<S>,
}

impl<'c, S> Next<'c, S> {
    pub(crate) fn new(links: &'c [MiddlewareFn<S>], handler: &'c HandlerFn<S>) -> Self {
        Next { links, handler }
    }

    /// Runs the next middleware, or the handler once every middleware has run.
    ///
    /// Errors from further down the chain are returned as they are.
    pub fn run(self, ctx: &mut CommandContext<'_, S>) -> Result<()> {
        match self.links.split_first() {
            Some((link, rest)) => link(ctx, Next::new(rest, self.handler)),
            None => (self.handler)(ctx),
        }
    }

    /// Number of middleware left before the handler.
    pub fn remaining(&self) -> usize {
        self.links.len()
    }
}
