use crate::commands::Command;
use crate::platform::ChatMessage;

/// Result bound for free text sent to the bot in a private chat.
pub const DIRECT_SEARCH_MAX: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Ignore,
    Command { command: Command, args: String },
    Search { text: String, max: usize },
}

/// A `/command[@bot] args` line split into its parts.
#[derive(Debug, PartialEq)]
struct ParsedCommand<'a> {
    name: &'a str,
    mention: Option<&'a str>,
    args: &'a str,
}

fn parse_command(text: &str) -> Option<ParsedCommand<'_>> {
    let rest = text.strip_prefix('/')?;
    let token = rest.split_whitespace().next().unwrap_or("");
    if !rest.starts_with(token) || token.is_empty() {
        return None;
    }
    let (name, mention) = match token.split_once('@') {
        Some((name, mention)) => (name, Some(mention)),
        None => (token, None),
    };
    if name.is_empty() {
        return None;
    }
    // Whatever follows the command token, minus the one separator character
    let after = &rest[token.len()..];
    let mut chars = after.chars();
    let args = match chars.next() {
        Some(c) if c.is_whitespace() => chars.as_str(),
        _ => after,
    };
    Some(ParsedCommand {
        name,
        mention,
        args,
    })
}

/// Decide what to do with a message.
///
/// Commands are honoured in private chats, and in groups only when addressed
/// to this bot as `/command@bot_username`. Free text is searched in private
/// chats only.
pub fn classify(msg: &ChatMessage, bot_username: &str) -> Action {
    if msg.text.is_empty() {
        return Action::Ignore;
    }

    if let Some(parsed) = parse_command(&msg.text) {
        let addressed = parsed
            .mention
            .is_some_and(|m| !bot_username.is_empty() && m.eq_ignore_ascii_case(bot_username));
        if !msg.chat_is_private && !addressed {
            return Action::Ignore;
        }
        return Action::Command {
            command: Command::from_name(parsed.name),
            args: parsed.args.to_string(),
        };
    }

    if !msg.chat_is_private {
        return Action::Ignore;
    }

    Action::Search {
        text: msg.text.clone(),
        max: DIRECT_SEARCH_MAX,
    }
}
