use crate::backend::SearchBackend;
use crate::error::BackendError;
use crate::platform::{ChatMessage, ReplyIntent};
use crate::render;

/// Result bound for `/query`.
pub const QUERY_MAX: usize = 3;

pub const HELP_TEXT: &str = "/ping : Check if I'm still alive\n\
                             /query <string> : Query for release name";

pub const PONG_TEXT: &str = "Pong";

pub const UNKNOWN_TEXT: &str = "I didn't understand that. List available commands with /help";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Ping,
    Query,
    Unknown,
}

impl Command {
    pub fn from_name(name: &str) -> Self {
        match name {
            "start" => Command::Start,
            "help" => Command::Help,
            "ping" => Command::Ping,
            "query" => Command::Query,
            _ => Command::Unknown,
        }
    }
}

pub fn start_text(bot_username: &str) -> String {
    format!(
        "Hello !\n\
         This bot has inline mode activated, feel free to query me :\n\
         @{} <query>\n\
         Type /help for available commands.",
        bot_username
    )
}

fn text(msg: &ChatMessage, body: impl Into<String>) -> ReplyIntent {
    ReplyIntent::Text {
        chat_id: msg.chat_id,
        body: body.into(),
    }
}

/// Run a command and return the replies to send, in order.
pub async fn execute(
    command: Command,
    args: &str,
    msg: &ChatMessage,
    bot_username: &str,
    backend: &dyn SearchBackend,
) -> Result<Vec<ReplyIntent>, BackendError> {
    let replies = match command {
        // /start only makes sense in a private chat
        Command::Start if msg.chat_is_private => vec![text(msg, start_text(bot_username))],
        Command::Start => Vec::new(),
        Command::Help => vec![text(msg, HELP_TEXT)],
        Command::Ping => vec![text(msg, PONG_TEXT)],
        Command::Query => search_replies(msg, args, QUERY_MAX, backend).await?,
        Command::Unknown => vec![text(msg, UNKNOWN_TEXT)],
    };
    Ok(replies)
}

/// Search and turn each row into its own text reply, in backend order.
pub async fn search_replies(
    msg: &ChatMessage,
    query: &str,
    max: usize,
    backend: &dyn SearchBackend,
) -> Result<Vec<ReplyIntent>, BackendError> {
    let rows = backend.search(query, max).await?;
    Ok(rows.iter().map(|row| text(msg, render::short(row))).collect())
}
