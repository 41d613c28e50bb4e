pub mod telegram;

use async_trait::async_trait;

use crate::error::SinkError;

/// A text message seen by the bot, new or edited
#[derive(Debug, Clone, Default)]
pub struct ChatMessage {
    /// Platform user ID, absent for channel posts
    pub sender_id: Option<u64>,
    pub chat_id: i64,
    pub chat_is_private: bool,
    /// The message text, empty when the message carried none
    pub text: String,
}

/// An inline query typed as `@bot <query>` in any chat
#[derive(Debug, Clone, Default)]
pub struct InlineRequest {
    pub query_id: String,
    pub sender_id: u64,
    pub query: String,
}

/// One inbound platform event. Built from updates in the fixed priority order
/// message, edited message, inline query, anything else.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    Message(ChatMessage),
    EditedMessage(ChatMessage),
    InlineQuery(InlineRequest),
    /// Not actionable; carries a description for the log
    Other(String),
}

impl InboundEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            InboundEvent::Message(_) => "message",
            InboundEvent::EditedMessage(_) => "edited_message",
            InboundEvent::InlineQuery(_) => "inline_query",
            InboundEvent::Other(_) => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InlineItem {
    pub id: String,
    pub title: String,
    pub body: String,
}

/// Something the bot wants to send back
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyIntent {
    Text { chat_id: i64, body: String },
    InlineAnswer { query_id: String, items: Vec<InlineItem> },
}

/// Where replies go. Delivery is best effort; failures are reported, not retried.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn deliver(&self, reply: ReplyIntent) -> Result<(), SinkError>;
}
