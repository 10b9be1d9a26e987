use rand::{Rng, distr::Alphanumeric};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

pub const CHAT_MESSAGE: &str = "chat message";
pub const CONNECT: &str = "connect";

/// Field of a broadcast payload owned by the hub.
pub const SENDER_FIELD: &str = "id";
/// Field that carries a non-object payload once it is stamped.
pub const VALUE_FIELD: &str = "value";

const ID_LEN: usize = 20;

/// Opaque identifier the hub hands out to a connection.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn random() -> Self {
        let id = rand::rng()
            .sample_iter(Alphanumeric)
            .take(ID_LEN)
            .map(char::from)
            .collect::<String>();
        ConnectionId(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
impl From<&str> for ConnectionId {
    fn from(value: &str) -> Self {
        ConnectionId(value.to_owned())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One text frame on the channel, `{"event": .., "data": ..}`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Frame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl Frame {
    pub fn connect(id: &ConnectionId) -> Self {
        let mut data = Map::new();
        data.insert(SENDER_FIELD.to_owned(), Value::String(id.to_string()));
        Frame {
            event: CONNECT.to_owned(),
            data: Value::Object(data),
        }
    }
}

/// A client payload stamped with its sender.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(transparent)]
pub struct ChatMessage(Map<String, Value>);

impl ChatMessage {
    pub fn into_frame(self) -> Frame {
        Frame {
            event: CHAT_MESSAGE.to_owned(),
            data: Value::Object(self.0),
        }
    }
}

impl From<(ConnectionId, Value)> for ChatMessage {
    fn from(value: (ConnectionId, Value)) -> Self {
        let (sender, payload) = value;
        let mut body = match payload {
            Value::Object(m) => m,
            other => {
                let mut m = Map::new();
                m.insert(VALUE_FIELD.to_owned(), other);
                m
            }
        };
        if let Some(prev) = body.insert(SENDER_FIELD.to_owned(), Value::String(sender.0)) {
            // a client wrote into a field the hub owns
            tracing::debug!("overwrote client supplied {}: {}", SENDER_FIELD, prev);
        }
        ChatMessage(body)
    }
}
