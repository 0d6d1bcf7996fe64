#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use serde_json::{Value, json};
use twilight_model::{
    application::interaction::Interaction,
    http::interaction::{InteractionResponse, InteractionResponseData},
};

pub const PING: u8 = 1;
pub const APPLICATION_COMMAND: u8 = 2;
pub const AUTOCOMPLETE: u8 = 4;

pub fn interaction(kind: u8, data: Option<Value>) -> Interaction {
    let mut interaction = json!({
        "id": "100",
        "application_id": "200",
        "type": kind,
        "token": "token",
        "channel_id": "300",
        "locale": "en-US",
        "authorizing_integration_owners": {},
        "entitlements": []
    });
    if let Some(data) = data {
        interaction["data"] = data;
    }
    serde_json::from_value(interaction).expect("valid interaction")
}

/// A chat-input invocation of `name` with `options` as sent by Discord.
pub fn slash(name: &str, options: Value) -> Interaction {
    interaction(
        APPLICATION_COMMAND,
        Some(json!({ "id": "1", "name": name, "type": 1, "options": options })),
    )
}

pub fn user_json(id: &str, username: &str) -> Value {
    json!({
        "id": id,
        "username": username,
        "discriminator": "0001",
        "avatar": null
    })
}

pub fn member_json(nick: &str) -> Value {
    json!({
        "flags": 0,
        "joined_at": "2021-01-01T00:00:00.000000+00:00",
        "nick": nick,
        "pending": false,
        "permissions": "0",
        "roles": []
    })
}

pub fn message_json(id: &str, content: &str) -> Value {
    json!({
        "id": id,
        "channel_id": "300",
        "author": user_json("7", "author"),
        "content": content,
        "edited_timestamp": null,
        "embeds": [],
        "mention_everyone": false,
        "mention_roles": [],
        "mentions": [],
        "pinned": false,
        "timestamp": "2021-01-01T00:00:00.000000+00:00",
        "tts": false,
        "type": 0,
        "attachments": [],
        "components": []
    })
}

/// Collects every error passed to the error handler.
#[derive(Clone, Default)]
pub struct Errors(Arc<Mutex<Vec<anyhow::Error>>>);

impl Errors {
    pub fn handler(&self) -> impl Fn(anyhow::Error) -> Option<InteractionResponse> + Send + Sync + 'static {
        let errors = Arc::clone(&self.0);
        move |error| {
            errors.lock().unwrap().push(error);
            None
        }
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn messages(&self) -> Vec<String> {
        self.0.lock().unwrap().iter().map(|e| format!("{e:#}")).collect()
    }

    pub fn router_errors(&self) -> Vec<twilight_command_router::RouterError> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| e.downcast_ref::<twilight_command_router::RouterError>().cloned())
            .collect()
    }
}

pub fn data(response: &InteractionResponse) -> &InteractionResponseData {
    response.data.as_ref().expect("response carries data")
}
