use anyhow::Result;
use twilight_model::application::command::Command as ApplicationCommand;

use crate::{
    builder::CommandBuilder,
    commands::{Command, CommandGroup, CommandId, GroupId, Tree},
    error::RouterError,
};

use super::{
    context::CommandContext,
    dispatch::{DispatchConfig, Dispatcher},
    middleware::{Next, middleware_fn},
};

/// The root of a command tree.
///
/// Commands and groups are registered up front; [`build`](Self::build) then consumes the router
/// and returns a [`Dispatcher`] that can no longer be modified, so the tree is never mutated
/// while interactions are being dispatched.
///
/// ```rust,ignore
/// let mut router = CommandRouter::<State>::new();
/// router.use_middleware(|ctx, next| {
///     tracing::info!(command = %ctx.qualified_name(), "running command");
///     next.run(ctx)
/// });
/// router
///     .new_command_builder("ping")
///     .description("Checks that the bot is alive")
///     .text_command()
///     .handler(|ctx| {
///         ctx.set_content("pong");
///         Ok(())
///     })
///     .must_build();
///
/// let dispatcher = router.build(DispatchConfig::new(Arc::new(state)));
/// ```
pub struct CommandRouter<S> {
    tree: Tree<S>,
}

impl<S> CommandRouter<S>
where
    S: Send + Sync + 'static,
{
    pub fn new() -> Self {
        CommandRouter { tree: Tree::new() }
    }

    /// The implicit group holding top-level commands and router middleware.
    pub fn root(&self) -> GroupId {
        self.tree.root()
    }

    /// Adds middleware that runs before every command, outside of any group middleware.
    pub fn use_middleware<F>(&mut self, middleware: F) -> &mut Self
    where
        F: for<'a, 'c> Fn(&mut CommandContext<'a, S>, Next<'c, S>) -> Result<()>
            + Send
            + Sync
            + 'static,
    {
        let root = self.tree.root();
        self.tree
            .group_mut(root)
            .middleware
            .push(middleware_fn(middleware));
        self
    }

    pub fn new_command_group(
        &mut self,
        name: &str,
        description: &str,
        default_permission: bool,
    ) -> Result<GroupMut<'_, S>, RouterError> {
        let root = self.tree.root();
        let id = self
            .tree
            .add_group(root, name, description, default_permission)?;
        Ok(GroupMut::new(&mut self.tree, id))
    }

    pub fn must_new_command_group(
        &mut self,
        name: &str,
        description: &str,
        default_permission: bool,
    ) -> GroupMut<'_, S> {
        self.new_command_group(name, description, default_permission)
            .unwrap_or_else(|error| panic!("failed to create command group: {error}"))
    }

    /// Starts a top-level command.
    pub fn new_command_builder(&mut self, name: &str) -> CommandBuilder<'_, S> {
        let root = self.tree.root();
        CommandBuilder::new(&mut self.tree, root, name)
    }

    pub fn group(&self, id: GroupId) -> Option<&CommandGroup<S>> {
        self.tree.get_group(id)
    }

    /// Reopens a group created earlier to add middleware, commands or subgroups.
    pub fn group_mut(&mut self, id: GroupId) -> Option<GroupMut<'_, S>> {
        self.tree.get_group(id)?;
        Some(GroupMut::new(&mut self.tree, id))
    }

    pub fn command(&self, id: CommandId) -> Option<&Command<S>> {
        self.tree.get_command(id)
    }

    /// The groups a command belongs to, from the root down.
    pub fn command_groups(&self, id: CommandId) -> Vec<GroupId> {
        self.tree
            .get_command(id)
            .map(|command| self.tree.lineage(command.parent))
            .unwrap_or_default()
    }

    /// The commands to register with Discord.
    pub fn build_commands(&self) -> Vec<ApplicationCommand> {
        self.tree.build_commands()
    }

    /// Freezes the tree into a dispatcher.
    pub fn build(self, config: DispatchConfig<S>) -> Dispatcher<S> {
        Dispatcher::new(self.tree, config)
    }
}

impl<S> Default for CommandRouter<S>
where
    S: Send + Sync + 'static,
{
    fn default() -> Self {
        CommandRouter::new()
    }
}

impl<S> From<&CommandRouter<S>> for Vec<ApplicationCommand>
where
    S: Send + Sync + 'static,
{
    fn from(router: &CommandRouter<S>) -> Self {
        router.build_commands()
    }
}

/// Mutable access to one group of a [`CommandRouter`].
pub struct GroupMut<'t, S> {
    tree: &'t mut Tree<S>,
    id: GroupId,
}

impl<'t, S> GroupMut<'t, S>
where
    S: Send + Sync + 'static,
{
    fn new(tree: &'t mut Tree<S>, id: GroupId) -> Self {
        GroupMut { tree, id }
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn group(&self) -> &CommandGroup<S> {
        self.tree.group(self.id)
    }

    pub fn depth(&self) -> u8 {
        self.group().depth()
    }

    /// Creates a group nested inside this one.
    ///
    /// Fails with [`RouterError::DepthExceeded`] when this group is already nested twice, in
    /// which case nothing is added.
    pub fn new_subgroup(
        &mut self,
        name: &str,
        description: &str,
        default_permission: bool,
    ) -> Result<GroupMut<'_, S>, RouterError> {
        let id = self
            .tree
            .add_group(self.id, name, description, default_permission)?;
        Ok(GroupMut::new(self.tree, id))
    }

    pub fn must_new_subgroup(
        &mut self,
        name: &str,
        description: &str,
        default_permission: bool,
    ) -> GroupMut<'_, S> {
        self.new_subgroup(name, description, default_permission)
            .unwrap_or_else(|error| panic!("failed to create command group: {error}"))
    }

    /// Adds middleware that runs for every command in this group and its subgroups, after the
    /// middleware of enclosing groups.
    pub fn use_middleware<F>(&mut self, middleware: F) -> &mut Self
    where
        F: for<'a, 'c> Fn(&mut CommandContext<'a, S>, Next<'c, S>) -> Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.tree
            .group_mut(self.id)
            .middleware
            .push(middleware_fn(middleware));
        self
    }

    pub fn new_command_builder(&mut self, name: &str) -> CommandBuilder<'_, S> {
        CommandBuilder::new(self.tree, self.id, name)
    }

    /// This group and its ancestors, starting at the router's root.
    pub fn groups(&self) -> Vec<GroupId> {
        self.tree.lineage(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Node;

    #[test]
    fn subgroups_are_one_level_deeper() {
        let mut router = CommandRouter::<()>::new();
        let root = router.root();
        let mut admin = router.new_command_group("admin", "Admin", true).unwrap();
        assert_eq!(admin.depth(), 1);
        let admin_id = admin.id();

        let users = admin.new_subgroup("users", "Users", false).unwrap();
        assert_eq!(users.depth(), 2);
        assert_eq!(users.groups(), vec![root, admin_id, users.id()]);
    }

    #[test]
    fn third_level_fails_and_leaves_tree_untouched() {
        let mut router = CommandRouter::<()>::new();
        let mut admin = router.new_command_group("admin", "Admin", false).unwrap();
        let mut users = admin.must_new_subgroup("users", "Users", false);
        let users_id = users.id();

        let error = users.new_subgroup("deeper", "", false).err();
        assert_eq!(error, Some(RouterError::DepthExceeded("deeper".to_string())));

        let users = router.group(users_id).unwrap();
        assert_eq!(users.subcommands().count(), 0);
    }

    #[test]
    #[should_panic(expected = "nested too deep")]
    fn must_new_subgroup_panics_on_depth() {
        let mut router = CommandRouter::<()>::new();
        let mut admin = router.must_new_command_group("admin", "Admin", false);
        let mut users = admin.must_new_subgroup("users", "Users", false);
        users.must_new_subgroup("deeper", "", false);
    }

    #[test]
    fn middleware_accumulates_in_order() {
        let mut router = CommandRouter::<()>::new();
        router
            .use_middleware(|ctx, next| next.run(ctx))
            .use_middleware(|ctx, next| next.run(ctx));
        let mut admin = router.new_command_group("admin", "", false).unwrap();
        admin.use_middleware(|ctx, next| next.run(ctx));
        let admin_id = admin.id();

        assert_eq!(router.group(router.root()).unwrap().middleware_len(), 2);
        assert_eq!(router.group(admin_id).unwrap().middleware_len(), 1);
    }

    #[test]
    fn rebuilding_a_command_replaces_it() {
        let mut router = CommandRouter::<()>::new();
        let first = router
            .new_command_builder("ping")
            .description("first")
            .must_build();
        let second = router
            .new_command_builder("ping")
            .description("second")
            .must_build();

        let root = router.group(router.root()).unwrap();
        assert_eq!(root.get("ping"), Some(Node::Command(second)));
        assert_ne!(root.get("ping"), Some(Node::Command(first)));
        assert_eq!(router.command(second).unwrap().description(), "second");
    }

    #[test]
    fn command_groups_walk_to_the_root() {
        let mut router = CommandRouter::<()>::new();
        let root = router.root();
        let mut admin = router.new_command_group("admin", "", false).unwrap();
        let admin_id = admin.id();
        let ban = admin
            .new_command_builder("ban")
            .text_command()
            .must_build();

        assert_eq!(router.command_groups(ban), vec![root, admin_id]);
        assert_eq!(router.command(ban).unwrap().parent(), admin_id);
    }

    #[test]
    fn reopened_groups_accept_commands() {
        let mut router = CommandRouter::<()>::new();
        let admin_id = router.new_command_group("admin", "", false).unwrap().id();

        let mut admin = router.group_mut(admin_id).unwrap();
        let kick = admin.new_command_builder("kick").must_build();

        assert_eq!(
            router.group(admin_id).unwrap().get("kick"),
            Some(Node::Command(kick))
        );
    }
}
