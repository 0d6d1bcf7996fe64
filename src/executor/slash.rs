use tracing::warn;
use twilight_model::{
    application::{
        command::{Command as ApplicationCommand, CommandType},
        interaction::InteractionContextType,
    },
    guild::Permissions,
    oauth::ApplicationIntegrationType,
};
use twilight_util::builder::command::{CommandBuilder, SubCommandBuilder, SubCommandGroupBuilder};

use crate::commands::{Command, CommandGroup, CommandKind, GroupId, Node, Tree};

const CONTEXTS: [InteractionContextType; 3] = [
    InteractionContextType::Guild,
    InteractionContextType::BotDm,
    InteractionContextType::PrivateChannel,
];

impl<S> Tree<S> {
    /// Realizes the tree into the commands to register with Discord.
    ///
    /// Top-level groups become chat-input commands whose options are the subcommands and
    /// subcommand groups below them.
    pub(crate) fn build_commands(&self) -> Vec<ApplicationCommand> {
        let mut commands = Vec::new();

        for (_, node) in self.group(self.root()).subcommands() {
            let command = match node {
                Node::Command(id) => self.top_level_command(self.command(id)),
                Node::Group(id) => self.group_command(id),
            };
            commands.push(command.build());
        }

        commands
    }

    fn top_level_command(&self, command: &Command<S>) -> CommandBuilder {
        let kind = CommandType::from(command.kind);
        // Context menu commands must not carry a description.
        let description = match command.kind {
            CommandKind::ChatInput => command.description.as_str(),
            CommandKind::Message | CommandKind::User => "",
        };

        let mut builder = with_permission(
            CommandBuilder::new(&command.name, description, kind).contexts(CONTEXTS),
            command.default_permission,
        );
        match command.kind {
            CommandKind::ChatInput => {
                for option in &command.options {
                    builder = builder.option(option.clone());
                }
            }
            CommandKind::Message | CommandKind::User => {
                builder = builder.integration_types([
                    ApplicationIntegrationType::UserInstall,
                    ApplicationIntegrationType::GuildInstall,
                ]);
            }
        }
        builder
    }

    fn group_command(&self, id: GroupId) -> CommandBuilder {
        let group = self.group(id);
        let mut builder = with_permission(
            CommandBuilder::new(&group.name, &group.description, CommandType::ChatInput)
                .contexts(CONTEXTS),
            group.default_permission,
        );

        for (name, node) in group.subcommands() {
            match node {
                Node::Command(id) => {
                    if let Some(subcommand) = self.subcommand(group, self.command(id)) {
                        builder = builder.option(subcommand.build());
                    }
                }
                Node::Group(id) => {
                    let nested = self.group(id);
                    let subcommands = nested
                        .subcommands()
                        .filter_map(|(_, node)| match node {
                            Node::Command(id) => self.subcommand(nested, self.command(id)),
                            Node::Group(_) => None,
                        })
                        .collect::<Vec<_>>();
                    builder = builder.option(
                        SubCommandGroupBuilder::new(name, &nested.description)
                            .subcommands(subcommands)
                            .build(),
                    );
                }
            }
        }

        builder
    }

    fn subcommand(&self, group: &CommandGroup<S>, command: &Command<S>) -> Option<SubCommandBuilder> {
        if command.kind != CommandKind::ChatInput {
            warn!(
                group = %group.name,
                command = %command.name,
                kind = ?command.kind,
                "context menu commands cannot be nested in a group, skipping registration"
            );
            return None;
        }

        let mut subcommand = SubCommandBuilder::new(&command.name, &command.description);
        for option in &command.options {
            subcommand = subcommand.option(option.clone());
        }
        Some(subcommand)
    }
}

fn with_permission(builder: CommandBuilder, default_permission: bool) -> CommandBuilder {
    if default_permission {
        builder
    } else {
        builder.default_member_permissions(Permissions::empty())
    }
}
