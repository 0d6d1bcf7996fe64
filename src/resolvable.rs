//! Deferred references to objects carried in an interaction's resolved data.
//!
//! Discord sends the full user, member, channel, role and message objects for every id referenced
//! by an interaction in a side table. A resolvable keeps the id together with a borrow of that
//! table so handlers can look the object up only if they need it.

use std::fmt;

use serde::{Serialize, Serializer};
use twilight_model::{
    application::interaction::{InteractionChannel, InteractionDataResolved, InteractionMember},
    channel::Message,
    guild::Role,
    id::{
        Id,
        marker::{ChannelMarker, GenericMarker, MessageMarker, RoleMarker, UserMarker},
    },
    user::User,
};

macro_rules! resolvable {
    ($(#[$meta:meta])* $name:ident, $marker:ty, $target:ty, $table:ident, $key:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq)]
        pub struct $name<'a> {
            id: Id<$marker>,
            resolved: Option<&'a InteractionDataResolved>,
        }

        impl<'a> $name<'a> {
            pub fn new(id: Id<$marker>, resolved: Option<&'a InteractionDataResolved>) -> Self {
                Self { id, resolved }
            }

            pub fn id(&self) -> Id<$marker> {
                self.id
            }

            /// Looks the object up in the resolved data. Returns `None` if Discord did not send it.
            pub fn resolve(&self) -> Option<&'a $target> {
                self.resolved?.$table.get(&self.id.cast::<$key>())
            }
        }

        impl fmt::Display for $name<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.id, f)
            }
        }

        impl Serialize for $name<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                self.id.serialize(serializer)
            }
        }
    };
}

resolvable!(
    /// A user referenced by a `User` option or targeted by a user context-menu command.
    ResolvableUser,
    UserMarker,
    User,
    users,
    UserMarker
);

resolvable!(
    ResolvableChannel,
    ChannelMarker,
    InteractionChannel,
    channels,
    ChannelMarker
);

resolvable!(ResolvableRole, RoleMarker, Role, roles, RoleMarker);

resolvable!(
    /// The message targeted by a message context-menu command.
    ResolvableMessage,
    MessageMarker,
    Message,
    messages,
    MessageMarker
);

resolvable!(
    /// A `Mentionable` option, which Discord fills with either a user or a role id.
    ResolvableMentionable,
    GenericMarker,
    User,
    users,
    UserMarker
);

impl<'a> ResolvableUser<'a> {
    /// The guild member for this user. Only present when the interaction happened in a guild.
    pub fn resolve_member(&self) -> Option<&'a InteractionMember> {
        self.resolved?.members.get(&self.id)
    }
}

impl<'a> ResolvableMentionable<'a> {
    pub fn resolve_member(&self) -> Option<&'a InteractionMember> {
        self.resolved?.members.get(&self.id.cast::<UserMarker>())
    }

    pub fn resolve_role(&self) -> Option<&'a Role> {
        self.resolved?.roles.get(&self.id.cast::<RoleMarker>())
    }
}
