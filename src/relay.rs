//! Webhook relay
//!
//! The per-request pipeline: decode the update, route the text to an
//! intent, run the handler, reply. Handlers talk to the outside world
//! only through the injected collaborator seams, so every branch here is
//! testable without a network.
//!
//! Nothing in this module is allowed to fail the request: every path ends
//! in an acknowledgement string for the webhook response, and outbound
//! send failures are logged and swallowed.

use crate::command::{self, Command};
use crate::config::Config;
use crate::insight::{AnthropicClient, InsightError, InsightGenerator};
use crate::store::{QuizRecord, Store, SupabaseStore};
use crate::telegram::{Messenger, ParseMode, TelegramApi};
use crate::update::{self, IncomingMessage};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};

/// Recent-window size for the insights prompt.
const RECENT_QUIZ_WINDOW: usize = 20;

const INSIGHT_SYSTEM_INSTRUCTION: &str = "You are an education analyst reviewing quiz \
results for a tutoring platform administrator. Write for Telegram Markdown: *bold* \
section headers, bullet points, key metrics in *bold*. No conversational filler, no \
preamble. Respond with exactly three sections: *Performance Trends*, *Top Priority \
Topics* (the topics students struggle with most), and *Strategic Recommendation* \
(one concrete action).";

const INSIGHT_BANNER: &str = "📊 *Quiz Insights*";

const LINK_INSTRUCTIONS: &str = "To get progress updates for your student:\n\
1. Open the tutoring app and sign in on your student's profile.\n\
2. Go to *Profile → Parent Link* and tap *Generate Code*.\n\
3. Send the code to me here: `/start YOURCODE`\n\n\
Codes expire after a short while, so use them right away.";

const STORE_CONFIG_ERROR: &str =
    "Data store is not configured. Set SUPABASE_URL and SUPABASE_SERVICE_KEY.";

const STORE_UNAVAILABLE: &str = "Could not reach the data store. Please try again later.";

/// Stateless webhook handler with injected collaborators.
pub struct Relay {
    admin_chat_id: Option<String>,
    messenger: Arc<dyn Messenger>,
    store: Option<Arc<dyn Store>>,
    insights: Option<Arc<dyn InsightGenerator>>,
}

impl Relay {
    pub fn new(
        admin_chat_id: Option<String>,
        messenger: Arc<dyn Messenger>,
        store: Option<Arc<dyn Store>>,
        insights: Option<Arc<dyn InsightGenerator>>,
    ) -> Self {
        Self {
            admin_chat_id,
            messenger,
            store,
            insights,
        }
    }

    /// Build the production relay: Bot API messenger plus whichever
    /// collaborators the configuration provides.
    pub fn from_config(config: &Config) -> Self {
        let messenger: Arc<dyn Messenger> = Arc::new(TelegramApi::new(&config.bot_token));

        let store: Option<Arc<dyn Store>> =
            match (&config.supabase_url, &config.supabase_service_key) {
                (Some(url), Some(key)) => Some(Arc::new(SupabaseStore::new(url, key))),
                _ => None,
            };

        let insights: Option<Arc<dyn InsightGenerator>> = config
            .anthropic_api_key
            .as_deref()
            .map(|key| Arc::new(AnthropicClient::new(key)) as Arc<dyn InsightGenerator>);

        Self::new(config.admin_chat_id.clone(), messenger, store, insights)
    }

    /// Handle one webhook delivery. Always returns an acknowledgement
    /// string; the HTTP layer turns it into a 200 body no matter what.
    pub async fn handle_update(&self, body: &[u8]) -> &'static str {
        let Some(message) = update::decode(body) else {
            debug!("ignoring update without a chat id");
            return "no chat id";
        };

        let cmd = command::route(&message.text);
        debug!(chat_id = message.chat_id, command = ?cmd, "routed update");

        match cmd {
            Command::WhoAmI => self.handle_whoami(&message).await,
            Command::AdminStats => self.handle_stats(&message).await,
            Command::AdminInsights => self.handle_insights(&message).await,
            Command::LinkAccount { code } => self.handle_link(&message, &code).await,
            Command::Unhandled => {}
        }

        "ok"
    }

    /// Admin gate: plain string equality against the configured chat id.
    fn is_admin(&self, chat_id: i64) -> bool {
        self.admin_chat_id.as_deref() == Some(chat_id.to_string().as_str())
    }

    /// Best-effort reply. The webhook acknowledges regardless.
    async fn reply(&self, chat_id: i64, text: &str) {
        if let Err(e) = self.messenger.send(chat_id, text, ParseMode::Markdown).await {
            warn!("reply to chat {} failed: {}", chat_id, e);
        }
    }

    async fn handle_whoami(&self, message: &IncomingMessage) {
        let text = format!(
            "Your chat id: `{}`\nSet it as ADMIN_CHAT_ID to enable admin commands.",
            message.chat_id
        );
        self.reply(message.chat_id, &text).await;
    }

    async fn handle_stats(&self, message: &IncomingMessage) {
        // Non-admins get silence, indistinguishable from an unknown command.
        if !self.is_admin(message.chat_id) {
            debug!("ignoring /stats from non-admin chat {}", message.chat_id);
            return;
        }
        let Some(store) = &self.store else {
            self.reply(message.chat_id, STORE_CONFIG_ERROR).await;
            return;
        };

        let students = match store.count_students().await {
            Ok(n) => n,
            Err(e) => {
                warn!("student count failed: {}", e);
                self.reply(message.chat_id, STORE_UNAVAILABLE).await;
                return;
            }
        };
        let quizzes = match store.count_quizzes().await {
            Ok(n) => n,
            Err(e) => {
                warn!("quiz count failed: {}", e);
                self.reply(message.chat_id, STORE_UNAVAILABLE).await;
                return;
            }
        };

        let text = format!("👥 *Students:* {students}\n📝 *Quizzes taken:* {quizzes}");
        self.reply(message.chat_id, &text).await;
    }

    async fn handle_insights(&self, message: &IncomingMessage) {
        if !self.is_admin(message.chat_id) {
            debug!("ignoring /insights from non-admin chat {}", message.chat_id);
            return;
        }
        let Some(store) = &self.store else {
            self.reply(message.chat_id, STORE_CONFIG_ERROR).await;
            return;
        };

        // Empty-check before the ack, so the no-data path is exactly one
        // message rather than an ack followed by "nothing to do".
        let quizzes = match store.recent_quizzes(RECENT_QUIZ_WINDOW).await {
            Ok(q) => q,
            Err(e) => {
                warn!("quiz history fetch failed: {}", e);
                self.reply(message.chat_id, STORE_UNAVAILABLE).await;
                return;
            }
        };
        if quizzes.is_empty() {
            self.reply(message.chat_id, "No quiz data to analyze yet.")
                .await;
            return;
        }

        self.reply(message.chat_id, "🔎 Crunching the latest quiz data, one moment...")
            .await;

        let Some(generator) = &self.insights else {
            self.reply(
                message.chat_id,
                "AI analysis is not configured. Set ANTHROPIC_API_KEY to enable /insights.",
            )
            .await;
            return;
        };

        let prompt = build_insight_prompt(&quizzes);
        match generator.generate(INSIGHT_SYSTEM_INSTRUCTION, &prompt).await {
            Ok(text) if text.trim().is_empty() => {
                self.reply(message.chat_id, "The analysis came back with empty results. Try again.")
                    .await;
            }
            Ok(text) => {
                self.reply(message.chat_id, &format!("{INSIGHT_BANNER}\n\n{text}"))
                    .await;
            }
            Err(InsightError::Api { status, message: m }) => {
                warn!("insight call failed: {} {}", status, m);
                self.reply(message.chat_id, &format!("AI analysis failed ({status}): {m}"))
                    .await;
            }
            Err(e) => {
                warn!("insight call failed: {}", e);
                self.reply(
                    message.chat_id,
                    "AI analysis failed: could not reach the provider.",
                )
                .await;
            }
        }
    }

    async fn handle_link(&self, message: &IncomingMessage, code: &str) {
        if code.is_empty() {
            self.reply(message.chat_id, LINK_INSTRUCTIONS).await;
            return;
        }
        let Some(store) = &self.store else {
            self.reply(message.chat_id, STORE_CONFIG_ERROR).await;
            return;
        };

        // Claim first: the conditional delete either hands the row to
        // exactly one caller or misses. A miss and an expired row read the
        // same to the user, so probing cannot reveal which codes existed.
        let claimed = match store.claim_link_code(code).await {
            Ok(c) => c,
            Err(e) => {
                warn!("link code claim failed: {}", e);
                self.reply(message.chat_id, STORE_UNAVAILABLE).await;
                return;
            }
        };
        let link = match claimed {
            Some(link) if !link.is_expired(Utc::now()) => link,
            _ => {
                self.reply(
                    message.chat_id,
                    "❌ Invalid or Expired Code. Ask your student to generate a new one in the app.",
                )
                .await;
                return;
            }
        };

        if let Err(e) = store.set_parent_chat(&link.user_id, message.chat_id).await {
            warn!("parent link update for {} failed: {}", link.user_id, e);
            // The code is already spent at this point, so point the parent
            // at a fresh one instead of suggesting a retry of the old code.
            self.reply(
                message.chat_id,
                "Could not complete the link. Please generate a fresh code in the app and try again.",
            )
            .await;
            return;
        }

        self.reply(
            message.chat_id,
            "✅ Connected! You will now receive progress updates for your student here.",
        )
        .await;
    }
}

/// Project quiz rows into the compact shape the insight prompt carries.
fn build_insight_prompt(quizzes: &[QuizRecord]) -> String {
    let rows: Vec<serde_json::Value> = quizzes
        .iter()
        .map(|q| {
            serde_json::json!({
                "subject": q.subject,
                "percentage": format!("{}%", percentage(q.score, q.total_questions)),
                "topics": q.topics,
                "date": q.created_at.date_naive().to_string(),
            })
        })
        .collect();
    format!(
        "Recent quiz results (newest first):\n{}",
        serde_json::Value::Array(rows)
    )
}

fn percentage(score: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    ((score as f64 / total as f64) * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn percentage_rounds() {
        assert_eq!(percentage(8, 10), 80);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(10, 10), 100);
        assert_eq!(percentage(0, 10), 0);
    }

    #[test]
    fn percentage_survives_zero_total() {
        assert_eq!(percentage(5, 0), 0);
    }

    #[test]
    fn insight_prompt_projects_rows() {
        let quizzes = vec![QuizRecord {
            subject: "math".into(),
            score: 8,
            total_questions: 10,
            topics: vec!["fractions".into()],
            created_at: Utc.with_ymd_and_hms(2026, 8, 20, 14, 30, 0).unwrap(),
        }];
        let prompt = build_insight_prompt(&quizzes);
        assert!(prompt.contains("\"subject\":\"math\""));
        assert!(prompt.contains("80%"));
        assert!(prompt.contains("2026-08-20"));
        assert!(prompt.contains("fractions"));
        // Raw timestamps and scores stay out of the prompt.
        assert!(!prompt.contains("14:30"));
    }
}
