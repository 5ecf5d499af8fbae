//! The send workflow: persist the user's message, stream the assistant reply
//! into a placeholder, then reconcile the placeholder with the saved record.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use futures::StreamExt;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use crate::error::{GatewayError, SendError};
use crate::gateway::{InferenceGateway, PersistenceGateway};
use crate::store::ConversationStore;
use crate::title::title_for;
use crate::types::{Message, Sender};

/// Shown in place of an assistant reply when the stream could not be opened,
/// so the transcript always records something for the user's turn.
pub const STREAM_ERROR_TEXT: &str =
    "The assistant could not be reached. Please try sending your message again.";

const DEFAULT_CHUNK_TIMEOUT: Duration = Duration::from_secs(30);

/// Progress of a single send operation. Terminal states are `Done` and
/// `Failed`; no state is ever re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendPhase {
    Idle,
    ResolvingConversation,
    UserMessageSent,
    PlaceholderVisible,
    Streaming,
    Persisting,
    Done,
    Failed,
}

/// What a successful send produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOutcome {
    pub conversation_id: String,
    /// True when the send created the conversation it landed in.
    pub is_new: bool,
}

/// Client session: the conversation store plus gateway handles and the
/// currently selected model. Methods take `&self`; locks are only held
/// between awaits, so overlapping operations interleave safely.
pub struct ChatSession<P, I> {
    store: Mutex<ConversationStore>,
    persistence: P,
    inference: I,
    model: Mutex<String>,
    /// Conversations with a send in flight. A second send targeting the same
    /// conversation fails fast instead of interleaving chunk updates.
    in_flight: Mutex<HashSet<String>>,
    phases: Mutex<HashMap<String, SendPhase>>,
    chunk_timeout: Duration,
}

impl<P, I> ChatSession<P, I>
where
    P: PersistenceGateway,
    I: InferenceGateway,
{
    pub fn new(persistence: P, inference: I, model: &str) -> Self {
        Self {
            store: Mutex::new(ConversationStore::new()),
            persistence,
            inference,
            model: Mutex::new(model.to_string()),
            in_flight: Mutex::new(HashSet::new()),
            phases: Mutex::new(HashMap::new()),
            chunk_timeout: DEFAULT_CHUNK_TIMEOUT,
        }
    }

    /// Override the bounded per-chunk read timeout.
    pub fn with_chunk_timeout(mut self, chunk_timeout: Duration) -> Self {
        self.chunk_timeout = chunk_timeout;
        self
    }

    /// Access the conversation store.
    pub fn store(&self) -> MutexGuard<'_, ConversationStore> {
        self.store.lock().expect("conversation store lock poisoned")
    }

    /// Currently selected model id.
    pub fn model(&self) -> String {
        self.model.lock().expect("model lock poisoned").clone()
    }

    /// Select the model serving subsequent sends. Never retroactive.
    pub fn set_model(&self, model: &str) {
        *self.model.lock().expect("model lock poisoned") = model.to_string();
    }

    /// Send phase of the given conversation's most recent send operation.
    pub fn phase(&self, conversation_id: &str) -> SendPhase {
        self.phases
            .lock()
            .expect("phase lock poisoned")
            .get(conversation_id)
            .copied()
            .unwrap_or(SendPhase::Idle)
    }

    fn set_phase(&self, conversation_id: &str, phase: SendPhase) {
        debug!(conversation_id, ?phase, "send phase");
        self.phases
            .lock()
            .expect("phase lock poisoned")
            .insert(conversation_id.to_string(), phase);
    }

    /// Fetch all conversations and replace the local collection. On failure
    /// the prior state is left untouched.
    pub async fn load_conversations(&self) -> Result<(), GatewayError> {
        let conversations = self.persistence.list_conversations().await?;
        self.store().replace_all(conversations);
        Ok(())
    }

    /// Fetch a conversation's messages if none are cached yet. Idempotent:
    /// a populated conversation is a no-op, not a refresh.
    pub async fn ensure_messages_loaded(&self, conversation_id: &str) -> Result<(), SendError> {
        {
            let store = self.store();
            match store.get(conversation_id) {
                None => {
                    return Err(SendError::ConversationNotFound(conversation_id.to_string()))
                }
                Some(state) if state.has_messages() => return Ok(()),
                Some(_) => {}
            }
        }

        let conversation = self
            .persistence
            .get_conversation(conversation_id)
            .await
            .map_err(|e| SendError::from_gateway(e, SendError::FetchFailed))?;
        self.store()
            .set_messages(conversation_id, conversation.messages)?;
        Ok(())
    }

    /// Delete a conversation server-side, then drop it locally.
    pub async fn delete_conversation(&self, conversation_id: &str) -> Result<(), GatewayError> {
        self.persistence.delete_conversation(conversation_id).await?;
        self.store().remove(conversation_id);
        Ok(())
    }

    /// Send a message and stream the assistant's reply into the store.
    pub async fn send_message(
        &self,
        text: &str,
        conversation_id: Option<&str>,
    ) -> Result<SendOutcome, SendError> {
        self.send_message_with(text, conversation_id, |_| {}).await
    }

    /// Like [`send_message`](Self::send_message), invoking `on_delta` for
    /// each decoded chunk as it is applied to the placeholder.
    pub async fn send_message_with<F>(
        &self,
        text: &str,
        conversation_id: Option<&str>,
        mut on_delta: F,
    ) -> Result<SendOutcome, SendError>
    where
        F: FnMut(&str),
    {
        // Step 1: resolve the target conversation.
        let (conversation_id, is_new) = match conversation_id {
            Some(id) => {
                self.set_phase(id, SendPhase::ResolvingConversation);
                if !self.store().contains(id) {
                    self.set_phase(id, SendPhase::Failed);
                    return Err(SendError::ConversationNotFound(id.to_string()));
                }
                (id.to_string(), false)
            }
            None => {
                let title = title_for(text);
                let created = self
                    .persistence
                    .create_conversation(&title)
                    .await
                    .map_err(|e| SendError::from_gateway(e, SendError::CreateConversationFailed))?;
                let id = created.id.clone();
                self.set_phase(&id, SendPhase::ResolvingConversation);
                self.store().insert(created);
                (id, true)
            }
        };

        {
            let mut in_flight = self.in_flight.lock().expect("in-flight lock poisoned");
            if !in_flight.insert(conversation_id.clone()) {
                return Err(SendError::SendInProgress(conversation_id));
            }
        }

        let result = self.run_send(&conversation_id, text, &mut on_delta).await;

        self.in_flight
            .lock()
            .expect("in-flight lock poisoned")
            .remove(&conversation_id);

        match result {
            Ok(()) => {
                self.set_phase(&conversation_id, SendPhase::Done);
                Ok(SendOutcome {
                    conversation_id,
                    is_new,
                })
            }
            Err(err) => {
                warn!(conversation_id, error = %err, "send failed");
                self.set_phase(&conversation_id, SendPhase::Failed);
                Err(err)
            }
        }
    }

    async fn run_send<F>(
        &self,
        conversation_id: &str,
        text: &str,
        on_delta: &mut F,
    ) -> Result<(), SendError>
    where
        F: FnMut(&str),
    {
        // Step 2: persist the user's message. No optimistic insertion: the
        // store only ever shows what the server confirmed.
        let user_message = self
            .persistence
            .append_message(conversation_id, text, Sender::User)
            .await
            .map_err(|e| SendError::from_gateway(e, SendError::SendUserMessageFailed))?;
        self.store().append_committed(conversation_id, user_message)?;
        self.set_phase(conversation_id, SendPhase::UserMessageSent);

        // Step 3: placeholder for the reply, visible before any bytes arrive.
        let placeholder = Message::placeholder(conversation_id);
        let placeholder_id = placeholder.id.clone();
        self.store().append_pending(conversation_id, placeholder)?;
        self.set_phase(conversation_id, SendPhase::PlaceholderVisible);

        // Step 4: open the reply stream.
        let model = self.model();
        let mut stream = match self.inference.open_stream(&model, conversation_id).await {
            Ok(stream) => stream,
            Err(err) => {
                self.store()
                    .update_pending_text(conversation_id, &placeholder_id, STREAM_ERROR_TEXT)?;
                return Err(SendError::from_gateway(err, SendError::StreamUnavailable));
            }
        };
        self.set_phase(conversation_id, SendPhase::Streaming);

        // Step 5: consume chunks in arrival order, growing the placeholder.
        let mut assistant_text = String::new();
        loop {
            let chunk = match timeout(self.chunk_timeout, stream.next()).await {
                Ok(Some(Ok(bytes))) => bytes,
                Ok(Some(Err(err))) => {
                    // Partial text stays visible; the caller may retry.
                    return Err(SendError::from_gateway(err, SendError::StreamInterrupted));
                }
                Ok(None) => break,
                Err(_) => return Err(SendError::StreamInterrupted(GatewayError::Timeout)),
            };
            let delta = String::from_utf8_lossy(&chunk).into_owned();
            assistant_text.push_str(&delta);
            self.store()
                .update_pending_text(conversation_id, &placeholder_id, &assistant_text)?;
            on_delta(&delta);
        }

        // Step 6: persist the accumulated reply. The saved record, not the
        // local accumulator, is authoritative.
        self.set_phase(conversation_id, SendPhase::Persisting);
        let assistant_message = self
            .persistence
            .append_message(conversation_id, &assistant_text, Sender::Bot)
            .await
            .map_err(|e| SendError::from_gateway(e, SendError::SaveAssistantMessageFailed))?;

        // Step 7: exact id swap of the placeholder for the confirmed record.
        self.store()
            .replace_message(conversation_id, &placeholder_id, assistant_message)?;
        Ok(())
    }
}
