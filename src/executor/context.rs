use std::sync::Arc;

use anyhow::Result;
use twilight_model::{
    application::{
        command::CommandOptionChoice,
        interaction::{Interaction, InteractionMember, application_command::CommandData},
    },
    channel::{
        Message,
        message::{AllowedMentions, Component, Embed, MessageFlags},
    },
    http::interaction::{InteractionResponse, InteractionResponseData, InteractionResponseType},
    user::User,
};

use crate::{
    arguments::{FromOptions, OptionalArgumentConverter, parse},
    commands::{Command, CommandGroup, CommandId, Tree},
    options::{OptionMap, OptionValue},
};

/// Everything a handler or middleware knows about the invocation it is running for.
///
/// The context also collects the response: handlers set content, embeds and flags on it, and
/// the dispatcher turns whatever was set into an [`InteractionResponse`] once the chain returns.
pub struct CommandContext<'a, S> {
    interaction: &'a Interaction,
    data: &'a CommandData,
    options: OptionMap<'a>,
    tree: &'a Tree<S>,
    command: CommandId,
    state: Arc<S>,
    allowed_mentions: Option<AllowedMentions>,
    response: ResponseState,
}

#[derive(Debug, Clone, Default)]
struct ResponseState {
    content: Option<String>,
    embeds: Vec<Embed>,
    components: Vec<Component>,
    flags: Option<MessageFlags>,
    tts: bool,
    allowed_mentions: Option<AllowedMentions>,
    deferred: bool,
    choices: Option<Vec<CommandOptionChoice>>,
}

/// Which kind of response the dispatcher should build from the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResponseKind {
    Message,
    Autocomplete,
}

impl<'a, S> CommandContext<'a, S> {
    pub(crate) fn new(
        interaction: &'a Interaction,
        data: &'a CommandData,
        options: OptionMap<'a>,
        tree: &'a Tree<S>,
        command: CommandId,
        state: Arc<S>,
        allowed_mentions: Option<AllowedMentions>,
    ) -> Self {
        CommandContext {
            interaction,
            data,
            options,
            tree,
            command,
            state,
            allowed_mentions,
            response: ResponseState::default(),
        }
    }

    pub fn interaction(&self) -> &'a Interaction {
        self.interaction
    }

    pub fn data(&self) -> &'a CommandData {
        self.data
    }

    pub fn options(&self) -> &OptionMap<'a> {
        &self.options
    }

    /// Reads a single option. Use `Option<T>` for options that are not required.
    pub fn option<T: OptionalArgumentConverter<'a>>(&self, name: &str) -> Result<T> {
        parse(&self.options, name)
    }

    /// Reads all options into `T` at once.
    pub fn bind<T: FromOptions<'a>>(&self) -> Result<T> {
        T::from_options(&self.options)
    }

    /// The shared state handed to the router when it was built, typically holding the HTTP
    /// client used to call back into Discord.
    pub fn state(&self) -> &Arc<S> {
        &self.state
    }

    pub fn command(&self) -> &'a Command<S> {
        self.tree.command(self.command)
    }

    /// The groups the command belongs to, starting at the router's root group.
    pub fn groups(&self) -> Vec<&'a CommandGroup<S>> {
        let tree = self.tree;
        tree.lineage(self.command().parent)
            .into_iter()
            .map(|id| tree.group(id))
            .collect()
    }

    /// The full command path, for example `admin users kick`.
    pub fn qualified_name(&self) -> String {
        self.tree.qualified_name(self.command)
    }

    /// Name of the option being autocompleted.
    pub fn focused(&self) -> Option<&'a str> {
        self.options.focused()
    }

    /// The message a message command was invoked on.
    pub fn target_message(&self) -> Option<&'a Message> {
        match self.options.target() {
            Some(OptionValue::Message(message)) => message.resolve(),
            _ => None,
        }
    }

    /// The user a user command was invoked on.
    pub fn target_user(&self) -> Option<&'a User> {
        match self.options.target() {
            Some(OptionValue::User(user)) => user.resolve(),
            _ => None,
        }
    }

    /// The guild member a user command was invoked on.
    pub fn target_member(&self) -> Option<&'a InteractionMember> {
        match self.options.target() {
            Some(OptionValue::User(user)) => user.resolve_member(),
            _ => None,
        }
    }

    pub fn set_content(&mut self, content: impl Into<String>) -> &mut Self {
        self.response.content = Some(content.into());
        self
    }

    pub fn add_embed(&mut self, embed: Embed) -> &mut Self {
        self.response.embeds.push(embed);
        self
    }

    pub fn set_embeds(&mut self, embeds: Vec<Embed>) -> &mut Self {
        self.response.embeds = embeds;
        self
    }

    pub fn add_component(&mut self, component: impl Into<Component>) -> &mut Self {
        self.response.components.push(component.into());
        self
    }

    /// Only show the response to the invoking user.
    pub fn ephemeral(&mut self) -> &mut Self {
        self.add_flags(MessageFlags::EPHEMERAL)
    }

    pub fn add_flags(&mut self, flags: MessageFlags) -> &mut Self {
        self.response.flags = Some(self.response.flags.unwrap_or(MessageFlags::empty()) | flags);
        self
    }

    pub fn set_tts(&mut self, tts: bool) -> &mut Self {
        self.response.tts = tts;
        self
    }

    /// Overrides both the command's and the router's mention policy for this response.
    pub fn set_allowed_mentions(&mut self, allowed_mentions: AllowedMentions) -> &mut Self {
        self.response.allowed_mentions = Some(allowed_mentions);
        self
    }

    /// Acknowledge now and send the message later through a followup.
    pub fn defer(&mut self) -> &mut Self {
        self.response.deferred = true;
        self
    }

    /// Choices returned from an autocomplete handler.
    pub fn set_choices(&mut self, choices: Vec<CommandOptionChoice>) -> &mut Self {
        self.response.choices = Some(choices);
        self
    }

    pub(crate) fn into_response(self, kind: ResponseKind) -> InteractionResponse {
        let response = self.response;
        if kind == ResponseKind::Autocomplete {
            return InteractionResponse {
                kind: InteractionResponseType::ApplicationCommandAutocompleteResult,
                data: Some(InteractionResponseData {
                    choices: Some(response.choices.unwrap_or_default()),
                    ..Default::default()
                }),
            };
        }

        let kind = if response.deferred {
            InteractionResponseType::DeferredChannelMessageWithSource
        } else {
            InteractionResponseType::ChannelMessageWithSource
        };

        InteractionResponse {
            kind,
            data: Some(InteractionResponseData {
                allowed_mentions: response.allowed_mentions.or(self.allowed_mentions),
                components: (!response.components.is_empty()).then_some(response.components),
                content: response.content,
                embeds: (!response.embeds.is_empty()).then_some(response.embeds),
                flags: response.flags,
                tts: response.tts.then_some(true),
                ..Default::default()
            }),
        }
    }
}
