//! Storage contract for users, missions, achievements and wallet history
//!
//! Two backends implement [`Store`]: [`SupabaseStore`] talks to the hosted
//! PostgREST API, [`LocalStore`] keeps everything in a DuckDB file. Both
//! enforce one completion per (user, mission) and one grant per
//! (user, achievement) at the storage layer, and both apply a completion
//! or grant together with its reward credit as a single write.

mod local;
mod schema;
mod supabase;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{
    Achievement, CheckinUpdate, EarnedAchievement, Mission, User, WalletTransaction,
};

pub use local::LocalStore;
pub use supabase::SupabaseStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("remote error{}: {message}", status.map(|s| format!(" ({})", s)).unwrap_or_default())]
    Remote { status: Option<u16>, message: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl StoreError {
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            status: None,
            message: message.into(),
        }
    }
}

impl From<duckdb::Error> for StoreError {
    fn from(err: duckdb::Error) -> Self {
        match err {
            duckdb::Error::QueryReturnedNoRows => StoreError::NotFound("row".to_string()),
            other => StoreError::remote(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            StoreError::Decode(err.to_string())
        } else {
            StoreError::Remote {
                status: err.status().map(|s| s.as_u16()),
                message: err.to_string(),
            }
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of an insert-if-absent achievement grant
#[derive(Debug, Clone)]
pub enum GrantOutcome {
    /// Record inserted and reward credited; carries the updated user
    Granted(User),
    /// The user already held the achievement; nothing changed
    AlreadyGranted,
}

/// Result of recording a mission completion
#[derive(Debug, Clone)]
pub enum CompletionOutcome {
    /// Completion recorded and rewards credited; carries the updated user
    Completed(User),
    /// A completion already existed for the pair; nothing changed
    AlreadyCompleted,
}

/// Result of a conditional check-in write
#[derive(Debug, Clone)]
pub enum CheckinWrite {
    /// Points added and streak stored; carries the updated user
    Recorded(User),
    /// `last_checkin` moved since it was read; nothing changed
    Superseded,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn find_user_by_id(&self, id: &str) -> StoreResult<User>;
    async fn find_user_by_wallet(&self, wallet_address: &str) -> StoreResult<User>;

    /// Insert a fresh user; `Conflict` when the wallet already has one
    async fn create_user(&self, wallet_address: &str) -> StoreResult<User>;

    /// Add the check-in points and store the streak, guarded by the
    /// previously read `last_checkin`
    async fn record_checkin(&self, user_id: &str, update: &CheckinUpdate)
        -> StoreResult<CheckinWrite>;

    /// Active missions, highest points reward first
    async fn active_missions(&self) -> StoreResult<Vec<Mission>>;
    async fn find_mission(&self, id: &str) -> StoreResult<Mission>;
    async fn completed_mission_ids(&self, user_id: &str) -> StoreResult<Vec<String>>;

    /// Insert the completion record and credit the mission rewards atomically
    async fn complete_mission(
        &self,
        user_id: &str,
        mission: &Mission,
        at: DateTime<Utc>,
    ) -> StoreResult<CompletionOutcome>;

    async fn active_achievements(&self) -> StoreResult<Vec<Achievement>>;
    async fn find_achievement(&self, id: &str) -> StoreResult<Achievement>;
    async fn earned_achievements(&self, user_id: &str) -> StoreResult<Vec<EarnedAchievement>>;

    /// Insert the grant if absent and credit its points in the same write
    async fn grant_achievement(
        &self,
        user_id: &str,
        achievement: &Achievement,
        at: DateTime<Utc>,
    ) -> StoreResult<GrantOutcome>;

    /// Most recent wallet transactions, newest first
    async fn recent_transactions(
        &self,
        wallet_address: &str,
        limit: usize,
    ) -> StoreResult<Vec<WalletTransaction>>;
}
