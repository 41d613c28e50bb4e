use std::fmt::Debug;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use teloxide::prelude::*;
use teloxide::types::{
    InlineQueryId, InlineQueryResult, InlineQueryResultArticle, InputMessageContent,
    InputMessageContentText, UpdateKind,
};
use teloxide::update_listeners::{polling_default, webhooks, UpdateListener};
use tracing::{error, info};

use crate::backend::SearchBackend;
use crate::config::{Config, WebhookConfig};
use crate::dispatch::EventDispatcher;
use crate::error::SinkError;
use crate::platform::{ChatMessage, InboundEvent, InlineItem, InlineRequest, ReplyIntent, ReplySink};

fn chat_message(msg: &Message) -> ChatMessage {
    ChatMessage {
        sender_id: msg.from.as_ref().map(|user| user.id.0),
        chat_id: msg.chat.id.0,
        chat_is_private: msg.chat.is_private(),
        text: msg.text().unwrap_or_default().to_string(),
    }
}

/// Convert a Telegram update into the bot's event type.
pub fn to_event(update: Update) -> InboundEvent {
    match update.kind {
        UpdateKind::Message(msg) => InboundEvent::Message(chat_message(&msg)),
        UpdateKind::EditedMessage(msg) => InboundEvent::EditedMessage(chat_message(&msg)),
        UpdateKind::InlineQuery(query) => InboundEvent::InlineQuery(InlineRequest {
            query_id: query.id.to_string(),
            sender_id: query.from.id.0,
            query: query.query,
        }),
        other => InboundEvent::Other(format!("update {:?}: {:?}", update.id, other)),
    }
}

/// Sends replies through the Bot API.
pub struct TelegramSink {
    bot: Bot,
}

impl TelegramSink {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn article(item: InlineItem) -> InlineQueryResult {
    InlineQueryResult::Article(
        InlineQueryResultArticle::new(
            item.id,
            item.title,
            InputMessageContent::Text(InputMessageContentText::new(item.body.clone())),
        )
        .description(item.body),
    )
}

#[async_trait]
impl ReplySink for TelegramSink {
    async fn deliver(&self, reply: ReplyIntent) -> Result<(), SinkError> {
        match reply {
            ReplyIntent::Text { chat_id, body } => self
                .bot
                .send_message(ChatId(chat_id), body)
                .await
                .map(|_| ())
                .map_err(|e| SinkError::DeliveryFailed(format!("send to chat {}: {}", chat_id, e))),
            ReplyIntent::InlineAnswer { query_id, items } => {
                let results: Vec<InlineQueryResult> = items.into_iter().map(article).collect();
                self.bot
                    .answer_inline_query(InlineQueryId(query_id.clone()), results)
                    .await
                    .map(|_| ())
                    .map_err(|e| {
                        SinkError::DeliveryFailed(format!("answer inline query {}: {}", query_id, e))
                    })
            }
        }
    }
}

/// Feed every update from `listener` to the dispatcher until the listener stops.
async fn consume<L>(mut listener: L, dispatcher: &EventDispatcher)
where
    L: UpdateListener,
    L::Err: Debug,
{
    let events = listener.as_stream().filter_map(|update| async move {
        match update {
            Ok(update) => Some(to_event(update)),
            Err(e) => {
                error!("Update listener error: {:?}", e);
                None
            }
        }
    });
    dispatcher.run(events).await;
}

/// Run the Telegram bot platform
pub async fn run(config: &Config, backend: Arc<dyn SearchBackend>) -> Result<()> {
    let bot = Bot::new(&config.telegram.bot_token);

    let me = bot.get_me().await.context("Failed to authorize with Telegram")?;
    let reported = me.user.username.clone().unwrap_or_default();
    info!("Authorized on account {}", reported);

    let bot_username = config.telegram.bot_username.clone().unwrap_or(reported);

    let dispatcher = EventDispatcher::new(
        backend,
        Arc::new(TelegramSink::new(bot.clone())),
        bot_username,
        config.dispatch.workers,
    );

    info!("Starting Telegram platform...");

    match &config.telegram.webhook {
        Some(webhook) => {
            let listener = webhook_listener(bot, webhook, &config.telegram.bot_token).await?;
            consume(listener, &dispatcher).await;
        }
        None => {
            info!("Receiving updates by long polling");
            let listener = polling_default(bot).await;
            consume(listener, &dispatcher).await;
        }
    }

    Ok(())
}

async fn webhook_listener(
    bot: Bot,
    webhook: &WebhookConfig,
    token: &str,
) -> Result<impl UpdateListener<Err = std::convert::Infallible>> {
    let url = reqwest::Url::parse(&webhook.url(token))
        .with_context(|| format!("Invalid webhook URL for host {}", webhook.host))?;

    info!(
        "Listening for webhook on {} at {}{}<token>",
        webhook.listen, webhook.host, webhook.root
    );

    webhooks::axum(bot, webhooks::Options::new(webhook.listen, url))
        .await
        .context("Failed to set up webhook")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // Update's deserializer needs a borrowed string source, not a Value.
    fn update(value: serde_json::Value) -> Update {
        serde_json::from_str(&value.to_string()).unwrap()
    }

    fn user() -> serde_json::Value {
        json!({ "id": 42, "is_bot": false, "first_name": "Ada" })
    }

    #[test]
    fn test_private_message() {
        let event = to_event(update(json!({
            "update_id": 1,
            "message": {
                "message_id": 5, "date": 1600000000,
                "chat": { "id": 42, "type": "private", "first_name": "Ada" },
                "from": user(),
                "text": "/query foo"
            }
        })));
        match event {
            InboundEvent::Message(msg) => {
                assert_eq!(msg.sender_id, Some(42));
                assert_eq!(msg.chat_id, 42);
                assert!(msg.chat_is_private);
                assert_eq!(msg.text, "/query foo");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_edited_group_message() {
        let event = to_event(update(json!({
            "update_id": 2,
            "edited_message": {
                "message_id": 6, "date": 1600000000, "edit_date": 1600000100,
                "chat": { "id": -1001, "type": "supergroup", "title": "Scene" },
                "from": user(),
                "text": "hello"
            }
        })));
        match event {
            InboundEvent::EditedMessage(msg) => {
                assert_eq!(msg.chat_id, -1001);
                assert!(!msg.chat_is_private);
                assert_eq!(msg.text, "hello");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_inline_query() {
        let event = to_event(update(json!({
            "update_id": 3,
            "inline_query": { "id": "q-77", "from": user(), "query": "foo", "offset": "" }
        })));
        match event {
            InboundEvent::InlineQuery(request) => {
                assert_eq!(request.query_id, "q-77");
                assert_eq!(InlineQueryId(request.query_id.clone()).to_string(), "q-77");
                assert_eq!(request.sender_id, 42);
                assert_eq!(request.query, "foo");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_channel_post_is_other() {
        let event = to_event(update(json!({
            "update_id": 4,
            "channel_post": {
                "message_id": 1, "date": 1600000000,
                "chat": { "id": -100, "type": "channel", "title": "News" },
                "text": "x"
            }
        })));
        assert_eq!(event.kind(), "other");
    }
}
