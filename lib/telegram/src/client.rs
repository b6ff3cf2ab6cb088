//! HTTP client for the Telegram Bot API.

use crate::publish::{RenderPlan, render_plan};
use async_trait::async_trait;
use serde_json::{Value, json};
use telepost_core::{MessageId, MessagePublisher, Post, PublishError};
use tracing::{debug, info, warn};

const DEFAULT_BASE_URL: &str = "https://api.telegram.org";
const PARSE_MODE: &str = "HTML";

/// Client for one bot and its default destination channel.
pub struct TelegramClient {
    http: reqwest::Client,
    token: String,
    default_channel: String,
    base_url: String,
}

impl TelegramClient {
    /// Creates a client for the given bot token and default channel
    /// (`@name` or a numeric chat id).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(
        token: impl Into<String>,
        default_channel: impl Into<String>,
    ) -> telepost_core::Result<Self, PublishError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| PublishError::transport(e.to_string()))?;
        Ok(Self {
            http,
            token: token.into(),
            default_channel: default_channel.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Validates and publishes one post with its type-specific rendering.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Validation`] before any transport call for
    /// malformed content, [`PublishError::Transport`] for provider errors.
    pub async fn publish(&self, post: &Post) -> Result<MessageId, PublishError> {
        let plan = render_plan(post)?;
        let channel = post.channel_or(&self.default_channel);
        info!(id = %post.id, title = %post.title, kind = %post.post_type, channel, "publishing post");

        let message_id = match plan {
            RenderPlan::Text { text } => self.send_text(channel, &text).await?,
            RenderPlan::Image { url, caption } => {
                self.send_photo(channel, &url, &caption).await?
            }
            RenderPlan::Poll { question, options } => {
                self.send_poll(channel, &question, &options).await?
            }
        };

        info!(id = %post.id, %message_id, "post published");
        Ok(message_id)
    }

    /// Sends a plain text message.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the provider rejects the send.
    pub async fn send_text(&self, chat_id: &str, text: &str) -> Result<MessageId, PublishError> {
        self.send(
            "sendMessage",
            &json!({
                "chat_id": chat_id,
                "text": text,
                "parse_mode": PARSE_MODE,
            }),
        )
        .await
    }

    /// Sends an image with a caption.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the provider rejects the send.
    pub async fn send_photo(
        &self,
        chat_id: &str,
        photo_url: &str,
        caption: &str,
    ) -> Result<MessageId, PublishError> {
        self.send(
            "sendPhoto",
            &json!({
                "chat_id": chat_id,
                "photo": photo_url,
                "caption": caption,
                "parse_mode": PARSE_MODE,
            }),
        )
        .await
    }

    /// Sends an anonymous single-answer poll.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the provider rejects the send.
    pub async fn send_poll(
        &self,
        chat_id: &str,
        question: &str,
        options: &[String],
    ) -> Result<MessageId, PublishError> {
        self.send(
            "sendPoll",
            &json!({
                "chat_id": chat_id,
                "question": question,
                "options": options,
                "is_anonymous": true,
                "allows_multiple_answers": false,
            }),
        )
        .await
    }

    /// Verifies the bot token and probes the default channel.
    ///
    /// The channel probe sends and deletes a marker message; a failing
    /// probe is logged but does not fail the check, since the bot may be
    /// valid while the channel grant is still pending.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the bot identity call fails.
    pub async fn check_connection(&self) -> Result<(), PublishError> {
        let me = self.call("getMe", &json!({})).await?;
        let username = me.get("username").and_then(Value::as_str).unwrap_or("?");
        info!(bot = username, "bot token ok");

        match self
            .send_text(&self.default_channel, "Probe message from telepost")
            .await
        {
            Ok(message_id) => {
                if let Err(err) = self.delete_message(&self.default_channel, message_id).await {
                    warn!(error = %err, "could not delete probe message");
                }
                info!(channel = %self.default_channel, "channel reachable");
            }
            Err(err) => {
                warn!(channel = %self.default_channel, error = %err, "channel probe failed");
            }
        }

        Ok(())
    }

    /// Deletes a previously sent message.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the provider rejects the call.
    pub async fn delete_message(
        &self,
        chat_id: &str,
        message_id: MessageId,
    ) -> Result<(), PublishError> {
        self.call(
            "deleteMessage",
            &json!({ "chat_id": chat_id, "message_id": message_id.value() }),
        )
        .await
        .map(|_| ())
    }

    /// Sends one message-producing method and extracts the message id.
    async fn send(&self, method: &str, payload: &Value) -> Result<MessageId, PublishError> {
        let result = self.call(method, payload).await?;
        result
            .get("message_id")
            .and_then(Value::as_i64)
            .map(MessageId::new)
            .ok_or_else(|| {
                PublishError::transport(format!("{method} answered without a message id"))
            })
    }

    /// Calls one Bot API method and unwraps the response envelope.
    async fn call(&self, method: &str, payload: &Value) -> Result<Value, PublishError> {
        let url = format!("{}/bot{}/{}", self.base_url, self.token, method);
        debug!(method, "calling bot api");

        let response = self
            .http
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| PublishError::transport(e.to_string()))?;

        // Provider errors come back as HTTP errors with a JSON body; the
        // envelope's description is the useful part either way.
        let envelope: Value = response
            .json()
            .await
            .map_err(|e| PublishError::transport(e.to_string()))?;

        if envelope.get("ok").and_then(Value::as_bool) != Some(true) {
            let description = envelope
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("unknown provider error");
            return Err(PublishError::transport(format!("{method}: {description}")));
        }

        Ok(envelope.get("result").cloned().unwrap_or(Value::Null))
    }
}

#[async_trait]
impl MessagePublisher for TelegramClient {
    async fn publish(&self, post: &Post) -> Result<MessageId, PublishError> {
        TelegramClient::publish(self, post).await
    }
}
