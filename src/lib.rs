//! Routes Discord application command interactions to handlers.
//!
//! Commands are registered on a [`CommandRouter`], optionally inside up to two levels of
//! groups, each of which can carry middleware. Building the router yields a [`Dispatcher`] that
//! resolves the invoked command, type checks and maps its options, runs the middleware chain and
//! the handler, and returns the interaction response.

pub mod arguments;
pub mod builder;
pub mod commands;
pub mod error;
pub mod executor;
pub mod options;
pub mod resolvable;

mod argument_converters;

pub use arguments::{Choices, FromOptions, ToOption};
pub use builder::{CommandBuilder, MessageCommandBuilder, TextCommandBuilder, UserCommandBuilder};
pub use commands::{Command, CommandGroup, CommandId, CommandKind, GroupId, MAX_DEPTH, Node};
pub use error::RouterError;
pub use executor::{
    CommandContext, CommandRouter, DispatchConfig, Dispatcher, Frame, GroupMut, Next,
    default_error_handler,
};
pub use options::{OptionMap, OptionValue, TARGET_KEY};
pub use resolvable::{
    ResolvableChannel, ResolvableMentionable, ResolvableMessage, ResolvableRole, ResolvableUser,
};

// Re-export macros
#[cfg(feature = "derive")]
pub use twilight_command_router_derive::{Choices, FromOptions};
