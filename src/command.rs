//! Command routing
//!
//! Pure classification of message text into relay intents. Authorization
//! and code validity are resolved inside the handlers, never here, so
//! routing stays a deterministic function of the text alone.

/// Relay command intents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/myid` - echo the chat id back for admin configuration.
    WhoAmI,
    /// `/stats` - admin-only student/quiz counts.
    AdminStats,
    /// `/insights` - admin-only AI digest of recent quiz activity.
    AdminInsights,
    /// `/start [code]` - parent account linking. An empty code means
    /// "show me the instructions", not an error.
    LinkAccount { code: String },
    /// Anything else. Acknowledged without a reply.
    Unhandled,
}

/// Map trimmed message text to an intent. First match wins.
pub fn route(text: &str) -> Command {
    match text {
        "/myid" => return Command::WhoAmI,
        "/stats" => return Command::AdminStats,
        "/insights" => return Command::AdminInsights,
        _ => {}
    }

    // /start is matched as a case-insensitive prefix because Telegram
    // deep links deliver it as "/start <payload>".
    if let Some(prefix) = text.get(..6) {
        if prefix.eq_ignore_ascii_case("/start") {
            return Command::LinkAccount {
                code: text[6..].trim().to_string(),
            };
        }
    }

    Command::Unhandled
}
