use twilight_model::application::{command::CommandOptionType, interaction::InteractionType};

/// Errors produced by the router itself, as opposed to errors returned by handlers.
///
/// Registration errors (`DepthExceeded`, `InvalidName`) are returned to the caller building the
/// tree. Everything else is raised during dispatch and handed to the configured error handler
/// wrapped in an [`anyhow::Error`], so handlers can recover it with `downcast_ref`.
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum RouterError {
    #[error("sub-command group `{0}` would be nested too deep")]
    DepthExceeded(String),
    #[error("command and group names must not be empty")]
    InvalidName,
    #[error("no command registered at `{0}`")]
    UnknownCommandPath(String),
    #[error("option `{0}` does not exist on this command")]
    UnknownOption(String),
    #[error("option `{name}` was declared as {expected:?} but received {received:?}")]
    TypeMismatch {
        name: String,
        expected: CommandOptionType,
        received: CommandOptionType,
    },
    #[error("wrong or no target specified")]
    MissingTarget,
    #[error("handler panicked: {0}")]
    RecoveredPanic(String),
    #[error("interaction type {0:?} is not routed by the command router")]
    UnsupportedInteraction(InteractionType),
    #[error("interaction carries no application command data")]
    MissingData,
}
