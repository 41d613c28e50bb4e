use std::fmt::Display;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::backend::SearchBackend;
use crate::classify::{self, Action};
use crate::commands;
use crate::error::BackendError;
use crate::platform::{ChatMessage, InboundEvent, InlineRequest, ReplyIntent, ReplySink};
use crate::render;

/// Result bound for inline queries.
pub const INLINE_MAX: usize = 1;

/// Consumes inbound events and turns them into replies. Holds no per-event
/// state; the backend and sink handles are shared by every worker.
pub struct EventDispatcher {
    backend: Arc<dyn SearchBackend>,
    sink: Arc<dyn ReplySink>,
    bot_username: String,
    workers: usize,
}

impl EventDispatcher {
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        sink: Arc<dyn ReplySink>,
        bot_username: String,
        workers: usize,
    ) -> Self {
        Self {
            backend,
            sink,
            bot_username,
            workers: workers.max(1),
        }
    }

    /// Handle events until the stream ends. Events are taken in arrival
    /// order; up to `workers` of them are in flight at once.
    pub async fn run<S>(&self, events: S)
    where
        S: Stream<Item = InboundEvent>,
    {
        info!(
            "Dispatching events with {} worker(s) via {} backend",
            self.workers,
            self.backend.name()
        );
        events
            .for_each_concurrent(self.workers, |event| self.handle(event))
            .await;
        info!("Event source closed");
    }

    /// Handle one event. Errors are logged here and never propagate.
    pub async fn handle(&self, event: InboundEvent) {
        debug!("Inbound {}: {:?}", event.kind(), event);
        match event {
            InboundEvent::Message(msg) | InboundEvent::EditedMessage(msg) => {
                self.handle_message(msg).await
            }
            InboundEvent::InlineQuery(request) => self.handle_inline(request).await,
            InboundEvent::Other(description) => {
                debug!("Dropping unsupported update: {}", description);
            }
        }
    }

    async fn handle_message(&self, msg: ChatMessage) {
        if msg.text.is_empty() {
            return;
        }

        let (result, query) = match classify::classify(&msg, &self.bot_username) {
            Action::Ignore => return,
            Action::Command { command, args } => {
                debug!(
                    "Command {:?} from user {:?} in chat {}",
                    command, msg.sender_id, msg.chat_id
                );
                let result = commands::execute(
                    command,
                    &args,
                    &msg,
                    &self.bot_username,
                    self.backend.as_ref(),
                )
                .await;
                (result, args)
            }
            Action::Search { text, max } => {
                let result =
                    commands::search_replies(&msg, &text, max, self.backend.as_ref()).await;
                (result, text)
            }
        };

        match result {
            Ok(replies) => self.deliver_all(replies).await,
            Err(e) => log_backend_failure("message", msg.chat_id, &query, &e),
        }
    }

    async fn handle_inline(&self, request: InlineRequest) {
        let rows = match self.backend.search(&request.query, INLINE_MAX).await {
            Ok(rows) => rows,
            Err(e) => {
                log_backend_failure("inline_query", request.sender_id, &request.query, &e);
                return;
            }
        };

        let items = rows
            .iter()
            .enumerate()
            .map(|(i, row)| render::inline_item(i, row))
            .collect();

        self.deliver_all(vec![ReplyIntent::InlineAnswer {
            query_id: request.query_id,
            items,
        }])
        .await;
    }

    /// Deliver replies one after another; the first failure drops the rest.
    async fn deliver_all(&self, replies: Vec<ReplyIntent>) {
        let total = replies.len();
        for (sent, reply) in replies.into_iter().enumerate() {
            if let Err(e) = self.sink.deliver(reply).await {
                warn!("{} ({} of {} replies sent)", e, sent, total);
                return;
            }
        }
    }
}

fn log_backend_failure(kind: &str, origin: impl Display, query: &str, e: &BackendError) {
    warn!(
        "Search failed for {} from {} (query {:?}): {}",
        kind, origin, query, e
    );
}
