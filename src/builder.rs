//! Fluent construction of commands.
//!
//! [`CommandBuilder`] starts out as a chat-input command. Calling `text_command`,
//! `message_command` or `user_command` narrows it to a builder that only offers what is valid for
//! that kind of command; context-menu commands, for instance, take no options and their handlers
//! receive the targeted object directly.

use anyhow::Result;
use twilight_model::{
    application::{
        command::{CommandOption, CommandOptionChoice},
        interaction::InteractionMember,
    },
    channel::{Message, message::AllowedMentions},
};

use crate::{
    arguments::FromOptions,
    commands::{Command, CommandId, CommandKind, GroupId, Tree},
    error::RouterError,
    executor::{
        context::CommandContext,
        middleware::{HandlerFn, handler_fn},
    },
    options::OptionValue,
};

/// Builds a command and registers it in the group it was created from.
///
/// Nothing is inserted until [`build`](Self::build) is called. Building a command with a name
/// already used in the group replaces the earlier entry.
pub struct CommandBuilder<'t, S> {
    tree: &'t mut Tree<S>,
    command: Command<S>,
}

impl<'t, S> CommandBuilder<'t, S>
where
    S: Send + Sync + 'static,
{
    pub(crate) fn new(tree: &'t mut Tree<S>, parent: GroupId, name: &str) -> Self {
        CommandBuilder {
            tree,
            command: Command {
                kind: CommandKind::ChatInput,
                name: name.to_string(),
                description: String::new(),
                default_permission: false,
                allowed_mentions: None,
                options: Vec::new(),
                handler: None,
                autocomplete: None,
                parent,
            },
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.command.description = description.into();
        self
    }

    pub fn option(mut self, option: impl Into<CommandOption>) -> Self {
        self.command.options.push(option.into());
        self
    }

    pub fn options<O: Into<CommandOption>>(mut self, options: impl IntoIterator<Item = O>) -> Self {
        self.command
            .options
            .extend(options.into_iter().map(Into::into));
        self
    }

    /// Enables the command for everyone by default. Has no effect on commands inside a group,
    /// where Discord only looks at the top-level command.
    pub fn default_permission(mut self) -> Self {
        self.command.default_permission = true;
        self
    }

    /// Mention policy for this command's responses, overriding the router's.
    pub fn allowed_mentions(mut self, allowed_mentions: AllowedMentions) -> Self {
        self.command.allowed_mentions = Some(allowed_mentions);
        self
    }

    pub fn handler<F>(mut self, handler: F) -> Self
    where
        F: for<'a> Fn(&mut CommandContext<'a, S>) -> Result<()> + Send + Sync + 'static,
    {
        self.command.handler = Some(handler_fn(handler));
        self
    }

    pub fn text_command(mut self) -> TextCommandBuilder<'t, S> {
        self.command.kind = CommandKind::ChatInput;
        TextCommandBuilder(self)
    }

    pub fn message_command(mut self) -> MessageCommandBuilder<'t, S> {
        self.command.kind = CommandKind::Message;
        MessageCommandBuilder(self)
    }

    pub fn user_command(mut self) -> UserCommandBuilder<'t, S> {
        self.command.kind = CommandKind::User;
        UserCommandBuilder(self)
    }

    /// Inserts the command into its group.
    pub fn build(self) -> Result<CommandId, RouterError> {
        self.tree.add_command(self.command)
    }

    /// Like [`build`](Self::build), but panics on failure. Meant for wiring up the router at
    /// startup.
    pub fn must_build(self) -> CommandId {
        self.build()
            .unwrap_or_else(|error| panic!("failed to build command: {error}"))
    }

    fn set_handler(mut self, handler: HandlerFn<S>) -> Self {
        self.command.handler = Some(handler);
        self
    }
}

/// Builder for a chat-input (slash) command.
pub struct TextCommandBuilder<'t, S>(CommandBuilder<'t, S>);

impl<'t, S> TextCommandBuilder<'t, S>
where
    S: Send + Sync + 'static,
{
    pub fn description(self, description: impl Into<String>) -> Self {
        Self(self.0.description(description))
    }

    pub fn option(self, option: impl Into<CommandOption>) -> Self {
        Self(self.0.option(option))
    }

    pub fn options<O: Into<CommandOption>>(self, options: impl IntoIterator<Item = O>) -> Self {
        Self(self.0.options(options))
    }

    pub fn default_permission(self) -> Self {
        Self(self.0.default_permission())
    }

    pub fn allowed_mentions(self, allowed_mentions: AllowedMentions) -> Self {
        Self(self.0.allowed_mentions(allowed_mentions))
    }

    pub fn handler<F>(self, handler: F) -> Self
    where
        F: for<'a> Fn(&mut CommandContext<'a, S>) -> Result<()> + Send + Sync + 'static,
    {
        Self(self.0.handler(handler))
    }

    /// Declares the options of `T` and binds them before calling `handler`.
    ///
    /// The options of `T` replace any declared earlier, so `T` has to describe every option of
    /// the command.
    pub fn typed_handler<T, F>(mut self, handler: F) -> Self
    where
        T: for<'o> FromOptions<'o> + 'static,
        F: for<'a> Fn(&mut CommandContext<'a, S>, T) -> Result<()> + Send + Sync + 'static,
    {
        self.0.command.options = T::options().into_iter().map(Into::into).collect();
        Self(self.0.set_handler(handler_fn(move |ctx| {
            let arguments = ctx.bind::<T>()?;
            handler(ctx, arguments)
        })))
    }

    /// Handler for autocomplete requests on this command. The returned choices are sent back as
    /// suggestions for the focused option.
    pub fn autocomplete<F>(mut self, autocomplete: F) -> Self
    where
        F: for<'a> Fn(&mut CommandContext<'a, S>) -> Result<Vec<CommandOptionChoice>>
            + Send
            + Sync
            + 'static,
    {
        self.0.command.autocomplete = Some(handler_fn(move |ctx| {
            let choices = autocomplete(ctx)?;
            ctx.set_choices(choices);
            Ok(())
        }));
        self
    }

    pub fn build(self) -> Result<CommandId, RouterError> {
        self.0.build()
    }

    pub fn must_build(self) -> CommandId {
        self.0.must_build()
    }
}

/// Builder for a context-menu command on a message.
pub struct MessageCommandBuilder<'t, S>(CommandBuilder<'t, S>);

impl<'t, S> MessageCommandBuilder<'t, S>
where
    S: Send + Sync + 'static,
{
    pub fn default_permission(self) -> Self {
        Self(self.0.default_permission())
    }

    pub fn allowed_mentions(self, allowed_mentions: AllowedMentions) -> Self {
        Self(self.0.allowed_mentions(allowed_mentions))
    }

    /// The handler receives the targeted message. If Discord did not resolve it the invocation
    /// fails with [`RouterError::MissingTarget`] and `handler` is not called.
    pub fn handler<F>(self, handler: F) -> Self
    where
        F: for<'a> Fn(&mut CommandContext<'a, S>, &'a Message) -> Result<()>
            + Send
            + Sync
            + 'static,
    {
        Self(self.0.set_handler(message_target(handler)))
    }

    pub fn build(self) -> Result<CommandId, RouterError> {
        self.0.build()
    }

    pub fn must_build(self) -> CommandId {
        self.0.must_build()
    }
}

/// Builder for a context-menu command on a user.
pub struct UserCommandBuilder<'t, S>(CommandBuilder<'t, S>);

impl<'t, S> UserCommandBuilder<'t, S>
where
    S: Send + Sync + 'static,
{
    pub fn default_permission(self) -> Self {
        Self(self.0.default_permission())
    }

    pub fn allowed_mentions(self, allowed_mentions: AllowedMentions) -> Self {
        Self(self.0.allowed_mentions(allowed_mentions))
    }

    /// The handler receives the targeted guild member. Fails with
    /// [`RouterError::MissingTarget`] when no member was resolved, such as in direct messages.
    pub fn handler<F>(self, handler: F) -> Self
    where
        F: for<'a> Fn(&mut CommandContext<'a, S>, &'a InteractionMember) -> Result<()>
            + Send
            + Sync
            + 'static,
    {
        Self(self.0.set_handler(member_target(handler)))
    }

    pub fn build(self) -> Result<CommandId, RouterError> {
        self.0.build()
    }

    pub fn must_build(self) -> CommandId {
        self.0.must_build()
    }
}

fn message_target<S, F>(handler: F) -> HandlerFn<S>
where
    S: 'static,
    F: for<'a> Fn(&mut CommandContext<'a, S>, &'a Message) -> Result<()> + Send + Sync + 'static,
{
    handler_fn(move |ctx| {
        let message = match ctx.options().target() {
            Some(OptionValue::Message(message)) => message.resolve(),
            _ => None,
        }
        .ok_or(RouterError::MissingTarget)?;
        handler(ctx, message)
    })
}

fn member_target<S, F>(handler: F) -> HandlerFn<S>
where
    S: 'static,
    F: for<'a> Fn(&mut CommandContext<'a, S>, &'a InteractionMember) -> Result<()>
        + Send
        + Sync
        + 'static,
{
    handler_fn(move |ctx| {
        let member = match ctx.options().target() {
            Some(OptionValue::User(user)) => user.resolve_member(),
            _ => None,
        }
        .ok_or(RouterError::MissingTarget)?;
        handler(ctx, member)
    })
}
