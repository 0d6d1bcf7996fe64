pub mod context;
pub mod middleware;

mod dispatch;
mod router;
mod slash;

pub use context::CommandContext;
pub use dispatch::{DispatchConfig, Dispatcher, ErrorHandler, Frame, FrameSink, default_error_handler};
pub use middleware::{HandlerFn, MiddlewareFn, Next};
pub use router::{CommandRouter, GroupMut};
