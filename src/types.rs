use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// A single message inside a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub text: String,
    pub sender: Sender,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Build a transient assistant placeholder with a locally generated id.
    ///
    /// The id uses a `local-` prefix so it can never collide with the
    /// server's id scheme.
    pub fn placeholder(conversation_id: &str) -> Self {
        Self {
            id: format!("local-{}", Uuid::new_v4()),
            conversation_id: conversation_id.to_string(),
            text: String::new(),
            sender: Sender::Bot,
            created_at: Utc::now(),
        }
    }
}

/// A titled, ordered thread of messages owned by one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    #[serde(rename = "userId")]
    pub owner_id: String,
    pub title: String,
    /// The list endpoint omits message bodies; default to empty.
    #[serde(default)]
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A message entry as held by the store.
///
/// `Pending` entries are locally synthesized placeholders whose text grows
/// while a response streams in; `Committed` entries are server-confirmed and
/// append-only. Only `Pending` text may ever be mutated in place.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageEntry {
    Pending(Message),
    Committed(Message),
}

impl MessageEntry {
    pub fn message(&self) -> &Message {
        match self {
            MessageEntry::Pending(m) | MessageEntry::Committed(m) => m,
        }
    }

    pub fn id(&self) -> &str {
        &self.message().id
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, MessageEntry::Pending(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_wire_shape_is_camel_case() {
        let json = r#"{
            "id": "m1",
            "conversationId": "c1",
            "text": "hello",
            "sender": "user",
            "createdAt": "2024-05-01T12:00:00Z"
        }"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.conversation_id, "c1");
        assert_eq!(msg.sender, Sender::User);

        let out = serde_json::to_value(&msg).unwrap();
        assert_eq!(out["conversationId"], "c1");
        assert_eq!(out["sender"], "user");
    }

    #[test]
    fn conversation_tolerates_missing_messages() {
        let json = r#"{
            "id": "c1",
            "userId": "u1",
            "title": "Learning Rust",
            "createdAt": "2024-05-01T12:00:00Z",
            "updatedAt": "2024-05-01T12:00:00Z"
        }"#;
        let conv: Conversation = serde_json::from_str(json).unwrap();
        assert_eq!(conv.owner_id, "u1");
        assert!(conv.messages.is_empty());
    }

    #[test]
    fn placeholder_uses_local_id_scheme() {
        let p = Message::placeholder("c1");
        assert!(p.id.starts_with("local-"));
        assert_eq!(p.sender, Sender::Bot);
        assert!(p.text.is_empty());
    }

    #[test]
    fn sender_round_trips_through_strum() {
        assert_eq!(Sender::Bot.to_string(), "bot");
        assert_eq!("user".parse::<Sender>().unwrap(), Sender::User);
    }
}
