//! Messages carried through the queue backends

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier assigned to a message when it is enqueued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A message as stored in and returned from a queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueMessage {
    pub id: MessageId,
    pub payload: String,
    pub enqueued_at: DateTime<Utc>,
}

impl QueueMessage {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            payload: payload.into(),
            enqueued_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_json_shape() {
        let message = QueueMessage::new("hello");
        let json = serde_json::to_value(&message).unwrap();

        assert_eq!(json["id"], message.id.to_string());
        assert_eq!(json["payload"], "hello");

        let parsed: QueueMessage = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, message);
    }

    #[test]
    fn test_message_id_parse_rejects_garbage() {
        assert!("not-a-uuid".parse::<MessageId>().is_err());
    }
}
