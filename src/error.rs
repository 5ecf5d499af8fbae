use thiserror::Error;

/// Failures talking to the chat service over HTTP.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("not authenticated with the chat service")]
    Unauthorized,

    #[error("resource not found")]
    NotFound,

    #[error("gateway returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("stream read timed out")]
    Timeout,
}

impl GatewayError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, GatewayError::Unauthorized)
    }
}

/// Failures of the synchronous in-memory store operations.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum StoreError {
    #[error("conversation {0} is not loaded")]
    UnknownConversation(String),

    #[error("message {0} not found")]
    MessageNotFound(String),

    #[error("message {0} is already committed and cannot be mutated")]
    NotPending(String),
}

/// Everything that can go wrong while sending a message and streaming the
/// reply. Each variant maps to one step of the send workflow; callers get a
/// `Result` rather than a panic or a torn store.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("conversation {0} not found")]
    ConversationNotFound(String),

    #[error("a send is already in flight for conversation {0}")]
    SendInProgress(String),

    #[error("failed to create conversation: {0}")]
    CreateConversationFailed(#[source] GatewayError),

    #[error("failed to send user message: {0}")]
    SendUserMessageFailed(#[source] GatewayError),

    #[error("assistant stream unavailable: {0}")]
    StreamUnavailable(#[source] GatewayError),

    #[error("assistant stream interrupted: {0}")]
    StreamInterrupted(#[source] GatewayError),

    #[error("failed to save assistant message: {0}")]
    SaveAssistantMessageFailed(#[source] GatewayError),

    #[error("failed to fetch from the chat service: {0}")]
    FetchFailed(#[source] GatewayError),

    #[error("not authenticated with the chat service")]
    Unauthorized,

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl SendError {
    /// Collapse 401s from any gateway call into the dedicated variant.
    pub(crate) fn from_gateway(err: GatewayError, wrap: fn(GatewayError) -> SendError) -> Self {
        if err.is_unauthorized() {
            SendError::Unauthorized
        } else {
            wrap(err)
        }
    }
}
