use std::{
    any::Any,
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};
use twilight_model::{
    application::{
        command::Command as ApplicationCommand,
        interaction::{Interaction, InteractionData, InteractionType},
    },
    channel::message::{AllowedMentions, MessageFlags},
    http::interaction::{InteractionResponse, InteractionResponseData, InteractionResponseType},
};
use twilight_util::builder::message::{ContainerBuilder, TextDisplayBuilder};

use crate::{commands::Tree, error::RouterError, options};

use super::{
    context::{CommandContext, ResponseKind},
    middleware::{HandlerFn, MiddlewareFn, Next, handler_fn},
};

/// Turns a failed invocation into the response sent back, if any.
pub type ErrorHandler = Arc<dyn Fn(anyhow::Error) -> Option<InteractionResponse> + Send + Sync>;

/// Receives a [`Frame`] after every dispatch.
pub type FrameSink = Arc<dyn Fn(Frame) + Send + Sync>;

/// One dispatched interaction and its outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub request: Interaction,
    pub response: Option<InteractionResponse>,
    pub error: Option<String>,
}

/// Everything a [`Dispatcher`] needs besides the command tree.
pub struct DispatchConfig<S> {
    state: Arc<S>,
    error_handler: Option<ErrorHandler>,
    allowed_mentions: Option<AllowedMentions>,
    frame_sink: Option<FrameSink>,
}

impl<S> DispatchConfig<S> {
    pub fn new(state: Arc<S>) -> Self {
        DispatchConfig {
            state,
            error_handler: None,
            allowed_mentions: None,
            frame_sink: None,
        }
    }

    /// Replaces [`default_error_handler`].
    ///
    /// A custom handler receives autocomplete failures too and has to answer them with a
    /// response Discord accepts for autocomplete, or `None`.
    pub fn error_handler<F>(mut self, error_handler: F) -> Self
    where
        F: Fn(anyhow::Error) -> Option<InteractionResponse> + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(error_handler));
        self
    }

    /// Mention policy for commands that do not set their own.
    pub fn allowed_mentions(mut self, allowed_mentions: AllowedMentions) -> Self {
        self.allowed_mentions = Some(allowed_mentions);
        self
    }

    /// Records every dispatched interaction together with its response or error.
    pub fn capture_frames<F>(mut self, sink: F) -> Self
    where
        F: Fn(Frame) + Send + Sync + 'static,
    {
        self.frame_sink = Some(Arc::new(sink));
        self
    }
}

impl<S> fmt::Debug for DispatchConfig<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchConfig")
            .field("allowed_mentions", &self.allowed_mentions)
            .field("custom_error_handler", &self.error_handler.is_some())
            .field("capture_frames", &self.frame_sink.is_some())
            .finish_non_exhaustive()
    }
}

/// Replies with an ephemeral red container describing the error.
///
/// Only used for command invocations. When no handler is configured, a failed autocomplete
/// request is answered with an empty choice list instead.
pub fn default_error_handler(error: anyhow::Error) -> Option<InteractionResponse> {
    let container = ContainerBuilder::new()
        .accent_color(Some(0xAA0000))
        .component(TextDisplayBuilder::new(format!("An error occurred: {error}")).build())
        .build();

    Some(InteractionResponse {
        kind: InteractionResponseType::ChannelMessageWithSource,
        data: Some(InteractionResponseData {
            components: Some(vec![container.into()]),
            flags: Some(MessageFlags::EPHEMERAL | MessageFlags::IS_COMPONENTS_V2),
            ..Default::default()
        }),
    })
}

/// A frozen command tree that routes interactions to their handlers.
///
/// Dispatch never mutates the tree, so a dispatcher can be shared behind an `Arc` and used from
/// any number of threads at once.
pub struct Dispatcher<S> {
    tree: Tree<S>,
    config: DispatchConfig<S>,
    noop: HandlerFn<S>,
}

impl<S> Dispatcher<S>
where
    S: Send + Sync + 'static,
{
    pub(crate) fn new(tree: Tree<S>, config: DispatchConfig<S>) -> Self {
        Dispatcher {
            tree,
            config,
            noop: handler_fn(|_| Ok(())),
        }
    }

    pub fn state(&self) -> &Arc<S> {
        &self.config.state
    }

    /// Routes an interaction by its type.
    ///
    /// Application commands and autocomplete requests are dispatched. Any other type is passed to
    /// the error handler as [`RouterError::UnsupportedInteraction`].
    pub fn handle(&self, interaction: &Interaction) -> Option<InteractionResponse> {
        match interaction.kind {
            InteractionType::ApplicationCommand => self.execute(interaction),
            InteractionType::ApplicationCommandAutocomplete => self.autocomplete(interaction),
            kind => self.finish(
                interaction,
                ResponseKind::Message,
                Err(RouterError::UnsupportedInteraction(kind).into()),
            ),
        }
    }

    /// Runs the command an application command interaction refers to.
    pub fn execute(&self, interaction: &Interaction) -> Option<InteractionResponse> {
        self.dispatch(interaction, ResponseKind::Message)
    }

    /// Runs the autocomplete handler of the command being typed. Commands without one answer
    /// with no choices.
    pub fn autocomplete(&self, interaction: &Interaction) -> Option<InteractionResponse> {
        self.dispatch(interaction, ResponseKind::Autocomplete)
    }

    /// The commands to register with Discord.
    pub fn build_commands(&self) -> Vec<ApplicationCommand> {
        self.tree.build_commands()
    }

    #[instrument(skip_all, fields(interaction = %interaction.id, command = tracing::field::Empty))]
    fn dispatch(&self, interaction: &Interaction, kind: ResponseKind) -> Option<InteractionResponse> {
        let result = self.run(interaction, kind);
        self.finish(interaction, kind, result)
    }

    fn run(
        &self,
        interaction: &Interaction,
        kind: ResponseKind,
    ) -> anyhow::Result<InteractionResponse> {
        let Some(InteractionData::ApplicationCommand(data)) = &interaction.data else {
            return Err(RouterError::MissingData.into());
        };

        let (id, supplied) = self.tree.resolve(data)?;
        let command = self.tree.command(id);
        let qualified_name = self.tree.qualified_name(id);
        tracing::Span::current().record("command", qualified_name.as_str());
        debug!(?kind, "dispatching");

        let options = options::map(&command.options, data, supplied)?;
        let handler = match kind {
            ResponseKind::Message => command.handler.as_ref(),
            ResponseKind::Autocomplete => command.autocomplete.as_ref(),
        }
        .unwrap_or(&self.noop);

        let chain = self
            .tree
            .lineage(command.parent)
            .into_iter()
            .flat_map(|group| self.tree.group(group).middleware.iter().cloned())
            .collect::<Vec<MiddlewareFn<S>>>();

        let allowed_mentions = command
            .allowed_mentions
            .clone()
            .or_else(|| self.config.allowed_mentions.clone());

        let mut ctx = CommandContext::new(
            interaction,
            data,
            options,
            &self.tree,
            id,
            Arc::clone(&self.config.state),
            allowed_mentions,
        );

        match panic::catch_unwind(AssertUnwindSafe(|| Next::new(&chain, handler).run(&mut ctx))) {
            Ok(Ok(())) => {
                debug!("command finished");
                Ok(ctx.into_response(kind))
            }
            Ok(Err(error)) => Err(error),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(panic = %message, "recovered from a panic while running command");
                Err(RouterError::RecoveredPanic(message).into())
            }
        }
    }

    /// Hands errors to the error handler and reports the frame.
    ///
    /// A panicking error handler yields no response. A panicking frame sink is logged and
    /// otherwise ignored.
    fn finish(
        &self,
        interaction: &Interaction,
        kind: ResponseKind,
        result: anyhow::Result<InteractionResponse>,
    ) -> Option<InteractionResponse> {
        let (response, error) = match result {
            Ok(response) => (Some(response), None),
            Err(error) => {
                let message = format!("{error:#}");
                warn!(error = %message, "command failed");
                (self.handle_error(kind, error), Some(message))
            }
        };

        if let Some(sink) = &self.config.frame_sink {
            let frame = Frame {
                request: interaction.clone(),
                response: response.clone(),
                error,
            };
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| sink(frame))) {
                error!(panic = %panic_message(payload.as_ref()), "frame sink panicked");
            }
        }

        response
    }

    fn handle_error(&self, kind: ResponseKind, error: anyhow::Error) -> Option<InteractionResponse> {
        let Some(handler) = &self.config.error_handler else {
            return match kind {
                ResponseKind::Message => default_error_handler(error),
                ResponseKind::Autocomplete => Some(no_choices()),
            };
        };

        match panic::catch_unwind(AssertUnwindSafe(|| handler(error))) {
            Ok(response) => response,
            Err(payload) => {
                error!(panic = %panic_message(payload.as_ref()), "error handler panicked");
                None
            }
        }
    }
}

impl<S> fmt::Debug for Dispatcher<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("root", self.tree.group(self.tree.root()))
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn no_choices() -> InteractionResponse {
    InteractionResponse {
        kind: InteractionResponseType::ApplicationCommandAutocompleteResult,
        data: Some(InteractionResponseData {
            choices: Some(Vec::new()),
            ..Default::default()
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_error_handler_is_ephemeral() {
        let response = default_error_handler(anyhow::anyhow!("boom")).unwrap();
        assert_eq!(response.kind, InteractionResponseType::ChannelMessageWithSource);

        let data = response.data.unwrap();
        let flags = data.flags.unwrap();
        assert!(flags.contains(MessageFlags::EPHEMERAL));
        assert!(flags.contains(MessageFlags::IS_COMPONENTS_V2));
        assert_eq!(data.components.map(|c| c.len()), Some(1));
    }

    #[test]
    fn panic_payloads_become_messages() {
        let payload = panic::catch_unwind(|| panic!("static message")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "static message");

        let payload = panic::catch_unwind(|| panic!("formatted {}", 42)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "formatted 42");

        let payload = panic::catch_unwind(|| std::panic::panic_any(7u8)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }
}
