//! Conversion of the options supplied with an interaction into an [`OptionMap`].

use std::collections::HashMap;

use anyhow::Result;
use tracing::debug;
use twilight_model::{
    application::{
        command::CommandOption,
        interaction::application_command::{CommandData, CommandDataOption, CommandOptionValue},
    },
    id::marker::{MessageMarker, UserMarker},
};

use crate::{
    arguments::{OptionalArgumentConverter, parse},
    error::RouterError,
    resolvable::{
        ResolvableChannel, ResolvableMentionable, ResolvableMessage, ResolvableRole,
        ResolvableUser,
    },
};

/// Key under which the target of a context-menu command is stored. The leading slash keeps it
/// from colliding with option names, which Discord restricts to word characters.
pub const TARGET_KEY: &str = "/target";

/// A single option value after type checking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OptionValue<'a> {
    String(&'a str),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    User(ResolvableUser<'a>),
    Channel(ResolvableChannel<'a>),
    Role(ResolvableRole<'a>),
    Mentionable(ResolvableMentionable<'a>),
    Message(ResolvableMessage<'a>),
}

/// The options of one invocation, keyed by option name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionMap<'a> {
    values: HashMap<&'a str, OptionValue<'a>>,
    focused: Option<&'a str>,
}

impl<'a> OptionMap<'a> {
    pub fn get(&self, name: &str) -> Option<&OptionValue<'a>> {
        self.values.get(name)
    }

    /// Converts the named option into `T`. See [`parse`].
    pub fn parse<T: OptionalArgumentConverter<'a>>(&self, name: &str) -> Result<T> {
        parse(self, name)
    }

    /// The target of a context-menu command, if one was resolved.
    pub fn target(&self) -> Option<&OptionValue<'a>> {
        self.values.get(TARGET_KEY)
    }

    /// Name of the option the user is typing into, for autocomplete interactions.
    pub fn focused(&self) -> Option<&'a str> {
        self.focused
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &OptionValue<'a>)> {
        self.values.iter().map(|(name, value)| (*name, value))
    }

    pub fn insert(&mut self, name: &'a str, value: OptionValue<'a>) {
        self.values.insert(name, value);
    }
}

/// Builds the option map for an invocation.
///
/// Context-menu invocations carry a `target_id` and are mapped from the resolved data alone;
/// chat-input invocations are checked option by option against `declared`.
pub(crate) fn map<'a>(
    declared: &[CommandOption],
    data: &'a CommandData,
    supplied: &'a [CommandDataOption],
) -> Result<OptionMap<'a>, RouterError> {
    if data.target_id.is_some() {
        Ok(map_target(data))
    } else {
        map_options(declared, data, supplied)
    }
}

fn map_target(data: &CommandData) -> OptionMap<'_> {
    let mut map = OptionMap::default();
    let (Some(target), Some(resolved)) = (data.target_id, data.resolved.as_ref()) else {
        return map;
    };

    let message = target.cast::<MessageMarker>();
    let user = target.cast::<UserMarker>();
    if resolved.messages.contains_key(&message) {
        map.insert(
            TARGET_KEY,
            OptionValue::Message(ResolvableMessage::new(message, Some(resolved))),
        );
    } else if resolved.users.contains_key(&user) || resolved.members.contains_key(&user) {
        map.insert(
            TARGET_KEY,
            OptionValue::User(ResolvableUser::new(user, Some(resolved))),
        );
    }

    map
}

fn map_options<'a>(
    declared: &[CommandOption],
    data: &'a CommandData,
    supplied: &'a [CommandDataOption],
) -> Result<OptionMap<'a>, RouterError> {
    let resolved = data.resolved.as_ref();
    let mut map = OptionMap::default();

    for option in supplied {
        let declaration = declared
            .iter()
            .find(|declaration| declaration.name == option.name)
            .ok_or_else(|| RouterError::UnknownOption(option.name.clone()))?;

        let received = option.value.kind();
        if received != declaration.kind {
            return Err(RouterError::TypeMismatch {
                name: option.name.clone(),
                expected: declaration.kind,
                received,
            });
        }

        let value = match &option.value {
            CommandOptionValue::Focused(partial, _) => {
                map.focused = Some(option.name.as_str());
                OptionValue::String(partial)
            }
            CommandOptionValue::String(value) => OptionValue::String(value),
            CommandOptionValue::Integer(value) => OptionValue::Integer(*value),
            CommandOptionValue::Number(value) => OptionValue::Number(*value),
            CommandOptionValue::Boolean(value) => OptionValue::Boolean(*value),
            CommandOptionValue::User(id) => OptionValue::User(ResolvableUser::new(*id, resolved)),
            CommandOptionValue::Channel(id) => {
                OptionValue::Channel(ResolvableChannel::new(*id, resolved))
            }
            CommandOptionValue::Role(id) => OptionValue::Role(ResolvableRole::new(*id, resolved)),
            CommandOptionValue::Mentionable(id) => {
                OptionValue::Mentionable(ResolvableMentionable::new(*id, resolved))
            }
            // Attachments and nested subcommands have no mapping and are left out of the map
            // rather than rejected.
            _ => {
                debug!(option = %option.name, kind = ?received, "skipping unmapped option type");
                continue;
            }
        };
        map.insert(option.name.as_str(), value);
    }

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use twilight_model::{
        application::command::CommandOptionType,
        id::{Id, marker::RoleMarker},
    };
    use twilight_util::builder::command::{
        AttachmentBuilder, BooleanBuilder, ChannelBuilder, IntegerBuilder, MentionableBuilder,
        NumberBuilder, RoleBuilder, StringBuilder, UserBuilder,
    };

    fn command_data(value: serde_json::Value) -> CommandData {
        serde_json::from_value(value).expect("valid command data")
    }

    fn declared() -> Vec<CommandOption> {
        vec![
            StringBuilder::new("reason", "why").build(),
            IntegerBuilder::new("days", "how long").build(),
            NumberBuilder::new("ratio", "how much").build(),
            BooleanBuilder::new("silent", "quietly").build(),
            UserBuilder::new("user", "who").build(),
            RoleBuilder::new("role", "which role").build(),
            ChannelBuilder::new("channel", "where").build(),
            MentionableBuilder::new("mention", "anyone").build(),
            AttachmentBuilder::new("proof", "evidence").build(),
        ]
    }

    #[test]
    fn maps_flat_options_by_declared_type() {
        let data = command_data(json!({
            "id": "1",
            "name": "ban",
            "type": 1,
            "options": [
                { "name": "reason", "type": 3, "value": "spam" },
                { "name": "days", "type": 4, "value": 7 },
                { "name": "ratio", "type": 10, "value": 0.5 },
                { "name": "silent", "type": 5, "value": true },
                { "name": "user", "type": 6, "value": "123" },
                { "name": "role", "type": 8, "value": "456" }
            ]
        }));

        let map = map(&declared(), &data, &data.options).expect("options should map");

        assert_eq!(map.len(), 6);
        assert_eq!(map.get("reason"), Some(&OptionValue::String("spam")));
        assert_eq!(map.get("days"), Some(&OptionValue::Integer(7)));
        assert_eq!(map.get("ratio"), Some(&OptionValue::Number(0.5)));
        assert_eq!(map.get("silent"), Some(&OptionValue::Boolean(true)));
        assert!(matches!(
            map.get("user"),
            Some(OptionValue::User(user)) if user.id() == Id::new(123)
        ));
        assert!(matches!(
            map.get("role"),
            Some(OptionValue::Role(role)) if role.id() == Id::<RoleMarker>::new(456)
        ));
        assert!(map.target().is_none());
    }

    #[test]
    fn channels_and_mentionables_become_resolvables() {
        let data = command_data(json!({
            "id": "1",
            "name": "announce",
            "type": 1,
            "options": [
                { "name": "channel", "type": 7, "value": "5" },
                { "name": "mention", "type": 9, "value": "6" }
            ]
        }));

        let map = map(&declared(), &data, &data.options).expect("options should map");

        assert_eq!(map.len(), 2);
        assert!(matches!(
            map.get("channel"),
            Some(OptionValue::Channel(channel)) if channel.id() == Id::new(5)
        ));
        assert!(matches!(
            map.get("mention"),
            Some(OptionValue::Mentionable(mention)) if mention.id() == Id::new(6)
        ));
    }

    #[test]
    fn unknown_option_fails() {
        let data = command_data(json!({
            "id": "1",
            "name": "ban",
            "type": 1,
            "options": [{ "name": "nope", "type": 3, "value": "x" }]
        }));

        assert_eq!(
            map(&declared(), &data, &data.options),
            Err(RouterError::UnknownOption("nope".to_string()))
        );
    }

    #[test]
    fn type_mismatch_produces_no_mapping() {
        let data = command_data(json!({
            "id": "1",
            "name": "ban",
            "type": 1,
            "options": [
                { "name": "reason", "type": 3, "value": "spam" },
                { "name": "days", "type": 3, "value": "seven" }
            ]
        }));

        assert_eq!(
            map(&declared(), &data, &data.options),
            Err(RouterError::TypeMismatch {
                name: "days".to_string(),
                expected: CommandOptionType::Integer,
                received: CommandOptionType::String,
            })
        );
    }

    // Attachments are accepted but never make it into the map. Handlers that need them have to
    // read the raw command data.
    #[test]
    fn attachment_options_are_silently_skipped() {
        let data = command_data(json!({
            "id": "1",
            "name": "ban",
            "type": 1,
            "options": [{ "name": "proof", "type": 11, "value": "789" }]
        }));

        let map = map(&declared(), &data, &data.options).expect("attachments are not an error");
        assert!(map.is_empty());
    }

    #[test]
    fn focused_option_is_recorded() {
        let declared = vec![StringBuilder::new("query", "search").autocomplete(true).build()];
        let data = command_data(json!({
            "id": "1",
            "name": "search",
            "type": 1,
            "options": [{ "name": "query", "type": 3, "value": "fer", "focused": true }]
        }));

        let map = map(&declared, &data, &data.options).expect("focused option should map");
        assert_eq!(map.focused(), Some("query"));
        assert_eq!(map.get("query"), Some(&OptionValue::String("fer")));
    }

    #[test]
    fn target_prefers_messages_then_users_then_members() {
        let data = command_data(json!({
            "id": "1",
            "name": "Inspect",
            "type": 2,
            "target_id": "123",
            "resolved": {
                "members": {
                    "123": {
                        "flags": 0,
                        "joined_at": "2021-01-01T00:00:00.000000+00:00",
                        "pending": false,
                        "permissions": "0",
                        "roles": []
                    }
                }
            }
        }));

        let map = map(&[], &data, &data.options).expect("targets never fail to map");
        assert_eq!(map.len(), 1);
        assert!(matches!(map.target(), Some(OptionValue::User(user)) if user.id() == Id::new(123)));
    }

    #[test]
    fn unresolved_target_creates_no_entry() {
        let data = command_data(json!({
            "id": "1",
            "name": "Inspect",
            "type": 3,
            "target_id": "123",
            "resolved": {}
        }));

        let map = map(&[], &data, &data.options).expect("targets never fail to map");
        assert!(map.is_empty());
    }
}
