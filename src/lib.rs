//! Tutoring-App Telegram Relay
//!
//! Stateless webhook handler connecting the tutoring web app to Telegram.
//!
//! # Features
//!
//! - **/myid**: discover a chat id for admin configuration
//! - **/stats**: admin-only student and quiz counts
//! - **/insights**: admin-only AI digest of recent quiz activity
//! - **/start CODE**: one-time parent/student account linking
//!
//! # Architecture
//!
//! ```text
//! Telegram ──POST /webhook──► decode ──► route ──► handle ──► sendMessage
//!                                                    │
//!                                                    ├── Supabase REST (profiles, quizzes, link codes)
//!                                                    └── Anthropic API (insight digest)
//! ```
//!
//! All cross-request state lives in the external store. Each webhook
//! delivery is decoded, routed, handled and acknowledged independently,
//! and the inbound response is always a 200.

pub mod command;
pub mod config;
pub mod insight;
pub mod relay;
pub mod server;
pub mod store;
pub mod telegram;
pub mod update;


pub use command::{route, Command};
pub use config::Config;
pub use insight::{AnthropicClient, InsightError, InsightGenerator};
pub use relay::Relay;
pub use store::{LinkCode, QuizRecord, Store, StoreError, SupabaseStore};
pub use telegram::{Messenger, ParseMode, SendError, TelegramApi};
pub use update::{decode, IncomingMessage};
