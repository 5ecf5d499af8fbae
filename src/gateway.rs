//! Typed HTTP clients for the chat service: the persistence API that owns
//! durable conversation state, and the inference proxy that streams assistant
//! replies. Both sit behind traits so the send workflow can be exercised
//! against in-process fakes.

use futures::stream::BoxStream;
use futures::StreamExt;
use serde::Serialize;
use tokio::time::Duration;
use tracing::debug;

use crate::error::GatewayError;
use crate::types::{Conversation, Message, Sender};

/// Ordered byte chunks of an assistant reply.
pub type ReplyStream = BoxStream<'static, Result<Vec<u8>, GatewayError>>;

/// Durable conversation/message state over HTTP.
#[allow(async_fn_in_trait)]
pub trait PersistenceGateway {
    async fn list_conversations(&self) -> Result<Vec<Conversation>, GatewayError>;
    async fn get_conversation(&self, conversation_id: &str) -> Result<Conversation, GatewayError>;
    async fn create_conversation(&self, title: &str) -> Result<Conversation, GatewayError>;
    async fn append_message(
        &self,
        conversation_id: &str,
        text: &str,
        sender: Sender,
    ) -> Result<Message, GatewayError>;
    async fn delete_conversation(&self, conversation_id: &str) -> Result<(), GatewayError>;
}

/// The streaming inference proxy: model id in, ordered text chunks out.
#[allow(async_fn_in_trait)]
pub trait InferenceGateway {
    async fn open_stream(
        &self,
        model: &str,
        conversation_id: &str,
    ) -> Result<ReplyStream, GatewayError>;
}

#[derive(Serialize)]
struct CreateConversationBody<'a> {
    title: &'a str,
}

#[derive(Serialize)]
struct NewMessageBody<'a> {
    text: &'a str,
    sender: Sender,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StreamRequestBody<'a> {
    selected_model: &'a str,
    conversation_id: &'a str,
}

/// Map a non-success response to a gateway error, consuming the body for
/// context the way the service reports errors.
async fn error_for(response: reqwest::Response) -> GatewayError {
    let status = response.status();
    match status.as_u16() {
        401 => GatewayError::Unauthorized,
        404 => GatewayError::NotFound,
        code => {
            let body = response.text().await.unwrap_or_default();
            GatewayError::Http { status: code, body }
        }
    }
}

/// reqwest-backed persistence gateway.
#[derive(Clone)]
pub struct HttpPersistence {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpPersistence {
    pub fn new(base_url: &str, auth_token: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.client.request(method, url);
        if let Some(token) = &self.auth_token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        builder
    }
}

impl PersistenceGateway for HttpPersistence {
    async fn list_conversations(&self) -> Result<Vec<Conversation>, GatewayError> {
        debug!("listing conversations");
        let response = self
            .request(reqwest::Method::GET, "/api/conversations")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_for(response).await);
        }
        Ok(response.json().await?)
    }

    async fn get_conversation(&self, conversation_id: &str) -> Result<Conversation, GatewayError> {
        debug!(conversation_id, "fetching conversation");
        let path = format!("/api/conversations/{}", conversation_id);
        let response = self.request(reqwest::Method::GET, &path).send().await?;
        if !response.status().is_success() {
            return Err(error_for(response).await);
        }
        Ok(response.json().await?)
    }

    async fn create_conversation(&self, title: &str) -> Result<Conversation, GatewayError> {
        debug!(title, "creating conversation");
        let response = self
            .request(reqwest::Method::POST, "/api/conversations")
            .json(&CreateConversationBody { title })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_for(response).await);
        }
        Ok(response.json().await?)
    }

    async fn append_message(
        &self,
        conversation_id: &str,
        text: &str,
        sender: Sender,
    ) -> Result<Message, GatewayError> {
        debug!(conversation_id, %sender, "appending message");
        let path = format!("/api/conversations/{}/messages", conversation_id);
        let response = self
            .request(reqwest::Method::POST, &path)
            .json(&NewMessageBody { text, sender })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_for(response).await);
        }
        Ok(response.json().await?)
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<(), GatewayError> {
        debug!(conversation_id, "deleting conversation");
        let path = format!("/api/conversations/{}", conversation_id);
        let response = self.request(reqwest::Method::DELETE, &path).send().await?;
        if !response.status().is_success() {
            return Err(error_for(response).await);
        }
        Ok(())
    }
}

/// reqwest-backed inference gateway. No overall request timeout: a reply
/// stream may legitimately run for minutes; the session bounds per-chunk
/// reads instead.
#[derive(Clone)]
pub struct HttpInference {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpInference {
    pub fn new(base_url: &str, auth_token: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token,
        }
    }
}

impl InferenceGateway for HttpInference {
    async fn open_stream(
        &self,
        model: &str,
        conversation_id: &str,
    ) -> Result<ReplyStream, GatewayError> {
        debug!(model, conversation_id, "opening reply stream");
        let url = format!("{}/api/chat/stream", self.base_url);
        let mut builder = self.client.post(&url).json(&StreamRequestBody {
            selected_model: model,
            conversation_id,
        });
        if let Some(token) = &self.auth_token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(error_for(response).await);
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(GatewayError::from))
            .boxed();
        Ok(stream)
    }
}
