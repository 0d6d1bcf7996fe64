//! Nodes of the command tree.
//!
//! The tree is owned top-down by the router in two arenas. Parents are referred to by
//! [`GroupId`], so a node never owns the group it belongs to.

use std::{collections::BTreeMap, fmt};

use tracing::debug;
use twilight_model::{
    application::{
        command::{CommandOption, CommandType},
        interaction::application_command::{CommandData, CommandDataOption, CommandOptionValue},
    },
    channel::message::AllowedMentions,
};

use crate::{
    error::RouterError,
    executor::middleware::{HandlerFn, MiddlewareFn},
};

/// Discord allows a command to sit at most two groups below the root.
pub const MAX_DEPTH: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(usize);

/// An entry in a group's subcommand map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    Group(GroupId),
    Command(CommandId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandKind {
    /// A slash command.
    #[default]
    ChatInput,
    /// A context-menu command on a message.
    Message,
    /// A context-menu command on a user.
    User,
}

impl From<CommandKind> for CommandType {
    fn from(kind: CommandKind) -> Self {
        match kind {
            CommandKind::ChatInput => CommandType::ChatInput,
            CommandKind::Message => CommandType::Message,
            CommandKind::User => CommandType::User,
        }
    }
}

/// A leaf of the tree. Built with a [`CommandBuilder`](crate::builder::CommandBuilder).
pub struct Command<S> {
    pub(crate) kind: CommandKind,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) default_permission: bool,
    pub(crate) allowed_mentions: Option<AllowedMentions>,
    pub(crate) options: Vec<CommandOption>,
    pub(crate) handler: Option<HandlerFn<S>>,
    pub(crate) autocomplete: Option<HandlerFn<S>>,
    pub(crate) parent: GroupId,
}

impl<S> Command<S> {
    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn default_permission(&self) -> bool {
        self.default_permission
    }

    /// Mention policy overriding the router's global policy for this command.
    pub fn allowed_mentions(&self) -> Option<&AllowedMentions> {
        self.allowed_mentions.as_ref()
    }

    pub fn options(&self) -> &[CommandOption] {
        &self.options
    }

    pub fn parent(&self) -> GroupId {
        self.parent
    }

    pub fn has_autocomplete(&self) -> bool {
        self.autocomplete.is_some()
    }
}

impl<S> fmt::Debug for Command<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("description", &self.description)
            .field("default_permission", &self.default_permission)
            .field("options", &self.options.len())
            .field("parent", &self.parent)
            .finish_non_exhaustive()
    }
}

/// An interior node: a named set of subcommands and nested groups sharing middleware.
pub struct CommandGroup<S> {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) default_permission: bool,
    pub(crate) middleware: Vec<MiddlewareFn<S>>,
    pub(crate) subcommands: BTreeMap<String, Node>,
    pub(crate) depth: u8,
    pub(crate) parent: Option<GroupId>,
}

impl<S> CommandGroup<S> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn default_permission(&self) -> bool {
        self.default_permission
    }

    /// 0 for the router's root group, 1 for top-level groups and 2 for nested groups.
    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn parent(&self) -> Option<GroupId> {
        self.parent
    }

    pub fn middleware_len(&self) -> usize {
        self.middleware.len()
    }

    pub fn get(&self, name: &str) -> Option<Node> {
        self.subcommands.get(name).copied()
    }

    pub fn subcommands(&self) -> impl Iterator<Item = (&str, Node)> {
        self.subcommands
            .iter()
            .map(|(name, node)| (name.as_str(), *node))
    }
}

impl<S> fmt::Debug for CommandGroup<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandGroup")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("default_permission", &self.default_permission)
            .field("middleware", &self.middleware.len())
            .field("subcommands", &self.subcommands)
            .field("depth", &self.depth)
            .field("parent", &self.parent)
            .finish()
    }
}

pub(crate) struct Tree<S> {
    groups: Vec<CommandGroup<S>>,
    commands: Vec<Command<S>>,
}

impl<S> Tree<S> {
    pub(crate) fn new() -> Self {
        let root = CommandGroup {
            name: String::new(),
            description: String::new(),
            default_permission: false,
            middleware: Vec::new(),
            subcommands: BTreeMap::new(),
            depth: 0,
            parent: None,
        };
        Tree {
            groups: vec![root],
            commands: Vec::new(),
        }
    }

    pub(crate) fn root(&self) -> GroupId {
        GroupId(0)
    }

    // Ids are only handed out by this tree, so indexing cannot go out of bounds for ids that
    // came from it.
    pub(crate) fn group(&self, id: GroupId) -> &CommandGroup<S> {
        &self.groups[id.0]
    }

    pub(crate) fn group_mut(&mut self, id: GroupId) -> &mut CommandGroup<S> {
        &mut self.groups[id.0]
    }

    pub(crate) fn command(&self, id: CommandId) -> &Command<S> {
        &self.commands[id.0]
    }

    pub(crate) fn get_group(&self, id: GroupId) -> Option<&CommandGroup<S>> {
        self.groups.get(id.0)
    }

    pub(crate) fn get_command(&self, id: CommandId) -> Option<&Command<S>> {
        self.commands.get(id.0)
    }

    pub(crate) fn add_group(
        &mut self,
        parent: GroupId,
        name: &str,
        description: &str,
        default_permission: bool,
    ) -> Result<GroupId, RouterError> {
        if name.is_empty() {
            return Err(RouterError::InvalidName);
        }
        let depth = self.group(parent).depth;
        if depth >= MAX_DEPTH {
            return Err(RouterError::DepthExceeded(name.to_string()));
        }

        let id = GroupId(self.groups.len());
        self.groups.push(CommandGroup {
            name: name.to_string(),
            description: description.to_string(),
            default_permission,
            middleware: Vec::new(),
            subcommands: BTreeMap::new(),
            depth: depth + 1,
            parent: Some(parent),
        });
        self.insert(parent, name, Node::Group(id));
        Ok(id)
    }

    pub(crate) fn add_command(&mut self, command: Command<S>) -> Result<CommandId, RouterError> {
        if command.name.is_empty() {
            return Err(RouterError::InvalidName);
        }
        let id = CommandId(self.commands.len());
        let (parent, name) = (command.parent, command.name.clone());
        self.commands.push(command);
        self.insert(parent, &name, Node::Command(id));
        Ok(id)
    }

    /// Registering a name twice replaces the earlier entry.
    fn insert(&mut self, parent: GroupId, name: &str, node: Node) {
        if let Some(previous) = self
            .group_mut(parent)
            .subcommands
            .insert(name.to_string(), node)
        {
            debug!(name, ?previous, ?node, "replacing previously registered entry");
        }
    }

    /// The groups from the root down to and including `id`.
    pub(crate) fn lineage(&self, id: GroupId) -> Vec<GroupId> {
        let mut lineage = Vec::new();
        let mut current = Some(id);
        while let Some(id) = current {
            lineage.push(id);
            current = self.group(id).parent;
        }
        lineage.reverse();
        lineage
    }

    /// Space separated path of a command, as Discord displays it.
    pub(crate) fn qualified_name(&self, id: CommandId) -> String {
        let command = self.command(id);
        self.lineage(command.parent)
            .into_iter()
            .skip(1)
            .map(|group| self.group(group).name.as_str())
            .chain(std::iter::once(command.name.as_str()))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Follows the command name and any subcommand group / subcommand options down to a command.
    ///
    /// Returns the command together with the options that belong to it.
    pub(crate) fn resolve<'d>(
        &self,
        data: &'d CommandData,
    ) -> Result<(CommandId, &'d [CommandDataOption]), RouterError> {
        let mut path = vec![data.name.as_str()];
        let mut group = self.root();
        let mut options = data.options.as_slice();

        loop {
            let name = path[path.len() - 1];
            match self.group(group).subcommands.get(name) {
                Some(Node::Command(id)) => return Ok((*id, options)),
                Some(Node::Group(child)) => {
                    group = *child;
                    let next = options.iter().find_map(|option| match &option.value {
                        CommandOptionValue::SubCommand(inner)
                        | CommandOptionValue::SubCommandGroup(inner) => {
                            Some((option.name.as_str(), inner.as_slice()))
                        }
                        _ => None,
                    });
                    let Some((name, inner)) = next else {
                        return Err(RouterError::UnknownCommandPath(path.join(" ")));
                    };
                    path.push(name);
                    options = inner;
                }
                None => return Err(RouterError::UnknownCommandPath(path.join(" "))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(parent: GroupId, name: &str) -> Command<()> {
        Command {
            kind: CommandKind::ChatInput,
            name: name.to_string(),
            description: String::new(),
            default_permission: false,
            allowed_mentions: None,
            options: Vec::new(),
            handler: None,
            autocomplete: None,
            parent,
        }
    }

    #[test]
    fn groups_nest_two_levels_deep() {
        let mut tree = Tree::<()>::new();
        let root = tree.root();
        assert_eq!(tree.group(root).depth(), 0);

        let admin = tree.add_group(root, "admin", "Admin", true).unwrap();
        assert_eq!(tree.group(admin).depth(), 1);
        assert_eq!(tree.group(admin).parent(), Some(root));
        assert!(tree.group(admin).default_permission());

        let users = tree.add_group(admin, "users", "Users", false).unwrap();
        assert_eq!(tree.group(users).depth(), 2);

        assert_eq!(
            tree.add_group(users, "deeper", "", false),
            Err(RouterError::DepthExceeded("deeper".to_string()))
        );
        assert_eq!(tree.group(users).subcommands().count(), 0);
        assert_eq!(tree.groups.len(), 3);
    }

    #[test]
    fn last_registration_wins() {
        let mut tree = Tree::<()>::new();
        let root = tree.root();
        let first = tree.add_command(command(root, "ping")).unwrap();
        let second = tree.add_command(command(root, "ping")).unwrap();

        assert_ne!(first, second);
        assert_eq!(tree.group(root).get("ping"), Some(Node::Command(second)));
        assert_eq!(tree.group(root).subcommands().count(), 1);
    }

    #[test]
    fn empty_names_are_rejected() {
        let mut tree = Tree::<()>::new();
        let root = tree.root();
        assert_eq!(tree.add_command(command(root, "")), Err(RouterError::InvalidName));
        assert_eq!(tree.add_group(root, "", "", false), Err(RouterError::InvalidName));
    }

    #[test]
    fn lineage_runs_root_to_self() {
        let mut tree = Tree::<()>::new();
        let root = tree.root();
        let admin = tree.add_group(root, "admin", "", false).unwrap();
        let users = tree.add_group(admin, "users", "", false).unwrap();
        let kick = tree.add_command(command(users, "kick")).unwrap();

        assert_eq!(tree.lineage(users), vec![root, admin, users]);
        assert_eq!(tree.lineage(root), vec![root]);
        assert_eq!(tree.qualified_name(kick), "admin users kick");
    }

    #[test]
    fn resolves_nested_paths() {
        let mut tree = Tree::<()>::new();
        let root = tree.root();
        let admin = tree.add_group(root, "admin", "", false).unwrap();
        let users = tree.add_group(admin, "users", "", false).unwrap();
        let kick = tree.add_command(command(users, "kick")).unwrap();

        let data: CommandData = serde_json::from_value(serde_json::json!({
            "id": "1",
            "name": "admin",
            "type": 1,
            "options": [{
                "name": "users",
                "type": 2,
                "options": [{
                    "name": "kick",
                    "type": 1,
                    "options": [{ "name": "reason", "type": 3, "value": "spam" }]
                }]
            }]
        }))
        .unwrap();

        let (id, options) = tree.resolve(&data).unwrap();
        assert_eq!(id, kick);
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].name, "reason");

        let missing: CommandData = serde_json::from_value(serde_json::json!({
            "id": "1",
            "name": "admin",
            "type": 1,
            "options": [{ "name": "roles", "type": 2, "options": [] }]
        }))
        .unwrap();
        assert_eq!(
            tree.resolve(&missing).map(|(id, _)| id),
            Err(RouterError::UnknownCommandPath("admin roles".to_string()))
        );
    }
}
