//! Hosted database access
//!
//! PostgREST-style REST client for the three tables the relay touches:
//! student profiles (role counts + parent chat updates), quiz history
//! (read-only recent window), and single-use linking codes. The relay
//! never writes quiz rows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;

const STORE_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from data-store calls.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Single-use parent linking invitation.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkCode {
    pub code: String,
    /// Student account the code belongs to.
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

impl LinkCode {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// One completed quiz attempt.
#[derive(Debug, Clone, Deserialize)]
pub struct QuizRecord {
    pub subject: String,
    pub score: i64,
    pub total_questions: i64,
    #[serde(default)]
    pub topics: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// External store seam for profiles, quiz history and linking codes.
#[async_trait]
pub trait Store: Send + Sync {
    async fn count_students(&self) -> Result<u64, StoreError>;

    async fn count_quizzes(&self) -> Result<u64, StoreError>;

    /// Most recent quiz attempts, newest first.
    async fn recent_quizzes(&self, limit: usize) -> Result<Vec<QuizRecord>, StoreError>;

    /// Atomically claim a linking code: delete the row and return it.
    ///
    /// `None` means the code never existed or was already claimed;
    /// callers must not distinguish the two. At most one concurrent
    /// caller for a given code receives the row.
    async fn claim_link_code(&self, code: &str) -> Result<Option<LinkCode>, StoreError>;

    /// Record the parent chat id on the student profile.
    async fn set_parent_chat(&self, user_id: &str, chat_id: i64) -> Result<(), StoreError>;
}

/// PostgREST client against the hosted database (service-role access).
pub struct SupabaseStore {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl SupabaseStore {
    pub fn new(base_url: &str, service_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
        }
    }

    fn request(&self, method: reqwest::Method, table: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}/rest/v1/{}", self.base_url, table))
            .timeout(STORE_TIMEOUT)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    /// Exact row count without fetching rows: `Prefer: count=exact` plus a
    /// zero-width range, total taken from the `Content-Range` header.
    async fn count(&self, table: &str, filter: Option<(&str, &str)>) -> Result<u64, StoreError> {
        let mut request = self
            .request(reqwest::Method::GET, table)
            .query(&[("select", "id")])
            .header("Prefer", "count=exact")
            .header("Range", "0-0");
        if let Some((column, value)) = filter {
            request = request.query(&[(column, value)]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Api {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let header = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| StoreError::Malformed("missing content-range header".into()))?;
        parse_content_range_total(header)
            .ok_or_else(|| StoreError::Malformed(format!("bad content-range: {header}")))
    }
}

/// Extract the total from a `Content-Range` value such as `0-0/42` or `*/0`.
fn parse_content_range_total(value: &str) -> Option<u64> {
    value.rsplit('/').next()?.trim().parse().ok()
}

#[async_trait]
impl Store for SupabaseStore {
    async fn count_students(&self) -> Result<u64, StoreError> {
        self.count("profiles", Some(("role", "eq.student"))).await
    }

    async fn count_quizzes(&self) -> Result<u64, StoreError> {
        self.count("quiz_results", None).await
    }

    async fn recent_quizzes(&self, limit: usize) -> Result<Vec<QuizRecord>, StoreError> {
        let response = self
            .request(reqwest::Method::GET, "quiz_results")
            .query(&[
                ("select", "subject,score,total_questions,topics,created_at"),
                ("order", "created_at.desc"),
                ("limit", &limit.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Api {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(response.json().await?)
    }

    async fn claim_link_code(&self, code: &str) -> Result<Option<LinkCode>, StoreError> {
        // DELETE with return=representation: the row goes to exactly one
        // caller, which makes the claim the single-use enforcement point.
        let response = self
            .request(reqwest::Method::DELETE, "link_codes")
            .query(&[("code", format!("eq.{code}"))])
            .header("Prefer", "return=representation")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Api {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let mut rows: Vec<LinkCode> = response.json().await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.remove(0))
        })
    }

    async fn set_parent_chat(&self, user_id: &str, chat_id: i64) -> Result<(), StoreError> {
        let response = self
            .request(reqwest::Method::PATCH, "profiles")
            .query(&[("id", format!("eq.{user_id}"))])
            .header("Prefer", "return=minimal")
            .json(&serde_json::json!({ "parent_chat_id": chat_id.to_string() }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Api {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }
}
