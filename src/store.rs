//! In-memory cache of conversations and their messages; the single source of
//! truth for what the client renders.

use std::collections::HashMap;

use crate::error::StoreError;
use crate::types::{Conversation, Message, MessageEntry};

/// Locally cached state for one conversation.
#[derive(Debug, Clone)]
pub struct ConversationState {
    pub meta: Conversation,
    entries: Vec<MessageEntry>,
}

impl ConversationState {
    fn new(conversation: Conversation) -> Self {
        let mut meta = conversation;
        let messages = std::mem::take(&mut meta.messages);
        let entries = messages.into_iter().map(MessageEntry::Committed).collect();
        Self { meta, entries }
    }

    pub fn id(&self) -> &str {
        &self.meta.id
    }

    pub fn title(&self) -> &str {
        &self.meta.title
    }

    /// Message entries in append order, oldest first.
    pub fn entries(&self) -> &[MessageEntry] {
        &self.entries
    }

    pub fn has_messages(&self) -> bool {
        !self.entries.is_empty()
    }
}

/// All loaded conversations, addressable by id. Mutations are synchronous and
/// last-writer-wins; callers coordinate any async interleaving themselves.
#[derive(Debug, Default)]
pub struct ConversationStore {
    conversations: HashMap<String, ConversationState>,
    /// Display order; newest conversations first, matching the server list.
    order: Vec<String>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole local collection with a freshly fetched one.
    pub fn replace_all(&mut self, conversations: Vec<Conversation>) {
        self.conversations.clear();
        self.order.clear();
        for conv in conversations {
            self.order.push(conv.id.clone());
            self.conversations
                .insert(conv.id.clone(), ConversationState::new(conv));
        }
    }

    /// Insert a newly created conversation at the front of the list.
    pub fn insert(&mut self, conversation: Conversation) {
        let id = conversation.id.clone();
        self.order.retain(|existing| existing != &id);
        self.order.insert(0, id.clone());
        self.conversations
            .insert(id, ConversationState::new(conversation));
    }

    pub fn contains(&self, conversation_id: &str) -> bool {
        self.conversations.contains_key(conversation_id)
    }

    pub fn get(&self, conversation_id: &str) -> Option<&ConversationState> {
        self.conversations.get(conversation_id)
    }

    /// Conversations in display order.
    pub fn iter(&self) -> impl Iterator<Item = &ConversationState> {
        self.order
            .iter()
            .filter_map(|id| self.conversations.get(id))
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Overwrite a conversation's messages with a fetched list.
    pub fn set_messages(
        &mut self,
        conversation_id: &str,
        messages: Vec<Message>,
    ) -> Result<(), StoreError> {
        let state = self.get_mut(conversation_id)?;
        state.entries = messages.into_iter().map(MessageEntry::Committed).collect();
        Ok(())
    }

    /// Append a server-confirmed message at the tail.
    pub fn append_committed(
        &mut self,
        conversation_id: &str,
        message: Message,
    ) -> Result<(), StoreError> {
        let state = self.get_mut(conversation_id)?;
        state.entries.push(MessageEntry::Committed(message));
        Ok(())
    }

    /// Append a placeholder at the tail.
    pub fn append_pending(
        &mut self,
        conversation_id: &str,
        message: Message,
    ) -> Result<(), StoreError> {
        let state = self.get_mut(conversation_id)?;
        state.entries.push(MessageEntry::Pending(message));
        Ok(())
    }

    /// Grow a placeholder's text in place. Refuses to touch committed
    /// entries, so a late write from a stale operation can never corrupt a
    /// finalized message.
    pub fn update_pending_text(
        &mut self,
        conversation_id: &str,
        message_id: &str,
        text: &str,
    ) -> Result<(), StoreError> {
        let state = self.get_mut(conversation_id)?;
        match state.entries.iter_mut().find(|e| e.id() == message_id) {
            Some(MessageEntry::Pending(message)) => {
                message.text = text.to_string();
                Ok(())
            }
            Some(MessageEntry::Committed(_)) => Err(StoreError::NotPending(message_id.to_string())),
            None => Err(StoreError::MessageNotFound(message_id.to_string())),
        }
    }

    /// Substitute the entry with id `old_id` by a committed message,
    /// preserving its position in the sequence.
    pub fn replace_message(
        &mut self,
        conversation_id: &str,
        old_id: &str,
        message: Message,
    ) -> Result<(), StoreError> {
        let state = self.get_mut(conversation_id)?;
        match state.entries.iter_mut().find(|e| e.id() == old_id) {
            Some(entry) => {
                *entry = MessageEntry::Committed(message);
                Ok(())
            }
            None => Err(StoreError::MessageNotFound(old_id.to_string())),
        }
    }

    /// Drop a conversation locally. Call only after the server confirmed the
    /// deletion.
    pub fn remove(&mut self, conversation_id: &str) {
        self.conversations.remove(conversation_id);
        self.order.retain(|id| id != conversation_id);
    }

    fn get_mut(&mut self, conversation_id: &str) -> Result<&mut ConversationState, StoreError> {
        self.conversations
            .get_mut(conversation_id)
            .ok_or_else(|| StoreError::UnknownConversation(conversation_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Sender;
    use chrono::Utc;

    fn conversation(id: &str) -> Conversation {
        Conversation {
            id: id.to_string(),
            owner_id: "u1".to_string(),
            title: format!("Conversation {id}"),
            messages: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn message(id: &str, conversation_id: &str, text: &str, sender: Sender) -> Message {
        Message {
            id: id.to_string(),
            conversation_id: conversation_id.to_string(),
            text: text.to_string(),
            sender,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn append_preserves_prior_messages_and_order() {
        let mut store = ConversationStore::new();
        store.insert(conversation("c1"));

        store
            .append_committed("c1", message("m1", "c1", "first", Sender::User))
            .unwrap();
        store
            .append_committed("c1", message("m2", "c1", "second", Sender::Bot))
            .unwrap();
        store
            .append_committed("c1", message("m3", "c1", "third", Sender::User))
            .unwrap();

        let ids: Vec<&str> = store.get("c1").unwrap().entries().iter().map(|e| e.id()).collect();
        assert_eq!(ids, ["m1", "m2", "m3"]);
    }

    #[test]
    fn append_to_unknown_conversation_errors() {
        let mut store = ConversationStore::new();
        let err = store
            .append_committed("nope", message("m1", "nope", "hi", Sender::User))
            .unwrap_err();
        assert_eq!(err, StoreError::UnknownConversation("nope".to_string()));
    }

    #[test]
    fn update_pending_text_grows_placeholder_only() {
        let mut store = ConversationStore::new();
        store.insert(conversation("c1"));
        let placeholder = Message::placeholder("c1");
        let id = placeholder.id.clone();
        store.append_pending("c1", placeholder).unwrap();

        store.update_pending_text("c1", &id, "Hel").unwrap();
        store.update_pending_text("c1", &id, "Hello").unwrap();
        assert_eq!(store.get("c1").unwrap().entries()[0].message().text, "Hello");

        // A committed entry must never be mutated in place.
        store
            .append_committed("c1", message("m1", "c1", "saved", Sender::Bot))
            .unwrap();
        assert_eq!(
            store.update_pending_text("c1", "m1", "nope").unwrap_err(),
            StoreError::NotPending("m1".to_string())
        );
    }

    #[test]
    fn replace_message_swaps_in_place() {
        let mut store = ConversationStore::new();
        store.insert(conversation("c1"));
        store
            .append_committed("c1", message("m1", "c1", "first", Sender::User))
            .unwrap();
        let placeholder = Message::placeholder("c1");
        let temp_id = placeholder.id.clone();
        store.append_pending("c1", placeholder).unwrap();

        let saved = message("m2", "c1", "final", Sender::Bot);
        store.replace_message("c1", &temp_id, saved.clone()).unwrap();

        let entries = store.get("c1").unwrap().entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1], MessageEntry::Committed(saved));
    }

    #[test]
    fn replace_missing_message_is_not_found() {
        let mut store = ConversationStore::new();
        store.insert(conversation("c1"));
        let err = store
            .replace_message("c1", "ghost", message("m1", "c1", "x", Sender::Bot))
            .unwrap_err();
        assert_eq!(err, StoreError::MessageNotFound("ghost".to_string()));
    }

    #[test]
    fn insert_puts_new_conversations_first() {
        let mut store = ConversationStore::new();
        store.replace_all(vec![conversation("c1"), conversation("c2")]);
        store.insert(conversation("c3"));

        let ids: Vec<&str> = store.iter().map(|c| c.id()).collect();
        assert_eq!(ids, ["c3", "c1", "c2"]);
    }

    #[test]
    fn remove_deletes_locally() {
        let mut store = ConversationStore::new();
        store.replace_all(vec![conversation("c1"), conversation("c2")]);
        store.remove("c1");
        assert!(!store.contains("c1"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn loaded_messages_become_committed_entries() {
        let mut conv = conversation("c1");
        conv.messages = vec![message("m1", "c1", "hi", Sender::User)];
        let mut store = ConversationStore::new();
        store.insert(conv);

        let state = store.get("c1").unwrap();
        assert!(state.has_messages());
        assert!(!state.entries()[0].is_pending());
    }
}
