use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{CheckinWrite, CompletionOutcome, GrantOutcome, Store, StoreError, StoreResult};
use crate::models::{
    Achievement, CheckinUpdate, EarnedAchievement, Mission, NewUser, User, WalletTransaction,
};

/// Postgres unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// PostgREST client for the hosted Supabase project
#[derive(Clone)]
pub struct SupabaseStore {
    pub url: String,
    client: Client,
    api_key: String,
}

/// Error body returned by PostgREST
#[derive(Debug, Deserialize)]
struct PostgrestError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MissionIdRow {
    mission_id: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResult {
    completed: bool,
    #[serde(default)]
    user: Option<User>,
}

#[derive(Debug, Deserialize)]
struct GrantResult {
    granted: bool,
    #[serde(default)]
    user: Option<User>,
}

#[derive(Debug, Deserialize)]
struct CheckinResult {
    recorded: bool,
    #[serde(default)]
    user: Option<User>,
}

#[derive(Serialize)]
struct RecordCheckinArgs<'a> {
    p_user_id: &'a str,
    p_points: i64,
    p_streak: u32,
    p_previous: Option<DateTime<Utc>>,
    p_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct CompleteMissionArgs<'a> {
    p_user_id: &'a str,
    p_mission_id: &'a str,
    p_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct GrantAchievementArgs<'a> {
    p_user_id: &'a str,
    p_achievement_id: &'a str,
    p_at: DateTime<Utc>,
}

/// PostgREST equality filter value
pub fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

fn truncate(body: &str) -> String {
    body.chars().take(500).collect()
}

/// Map a non-success PostgREST response to a structured error
fn error_from_response(status: StatusCode, body: &str) -> StoreError {
    let parsed: Option<PostgrestError> = serde_json::from_str(body).ok();
    let code = parsed.as_ref().and_then(|e| e.code.clone());
    let message = parsed
        .as_ref()
        .and_then(|e| {
            e.message.clone().map(|m| match &e.details {
                Some(d) if !d.is_empty() => format!("{} ({})", m, d),
                _ => m,
            })
        })
        .unwrap_or_else(|| truncate(body));

    if code.as_deref() == Some(UNIQUE_VIOLATION) || status == StatusCode::CONFLICT {
        return StoreError::Conflict(message);
    }
    if status == StatusCode::NOT_FOUND {
        return StoreError::NotFound(message);
    }

    StoreError::Remote {
        status: Some(status.as_u16()),
        message,
    }
}

impl SupabaseStore {
    pub fn new(url: &str, api_key: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            client,
            api_key,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.url, table)
    }

    fn rpc_url(&self, function: &str) -> String {
        format!("{}/rest/v1/rpc/{}", self.url, function)
    }

    fn build_request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    async fn read_json<T: DeserializeOwned + Send>(resp: Response) -> StoreResult<T> {
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(error_from_response(status, &text));
        }

        serde_json::from_str(&text).map_err(|e| {
            StoreError::Decode(format!("{}. Response: {}", e, truncate(&text)))
        })
    }

    async fn select<T: DeserializeOwned + Send>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> StoreResult<Vec<T>> {
        let resp = self
            .build_request(Method::GET, &self.table_url(table))
            .query(query)
            .send()
            .await?;

        Self::read_json(resp).await
    }

    /// First row matching the filters, `NotFound` when there is none
    async fn select_one<T: DeserializeOwned + Send>(
        &self,
        table: &str,
        query: &[(&str, String)],
        what: &str,
    ) -> StoreResult<T> {
        let mut query = query.to_vec();
        query.push(("limit", "1".to_string()));

        self.select(table, &query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(what.to_string()))
    }

    async fn insert<B: Serialize + Sync, T: DeserializeOwned + Send>(
        &self,
        table: &str,
        body: &B,
    ) -> StoreResult<T> {
        let resp = self
            .build_request(Method::POST, &self.table_url(table))
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;

        let rows: Vec<T> = Self::read_json(resp).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode(format!("insert into {} returned no rows", table)))
    }

    async fn rpc<B: Serialize + Sync, T: DeserializeOwned + Send>(
        &self,
        function: &str,
        args: &B,
    ) -> StoreResult<T> {
        let resp = self
            .build_request(Method::POST, &self.rpc_url(function))
            .json(args)
            .send()
            .await?;

        Self::read_json(resp).await
    }
}

#[async_trait]
impl Store for SupabaseStore {
    async fn find_user_by_id(&self, id: &str) -> StoreResult<User> {
        self.select_one(
            "users",
            &[("select", "*".to_string()), ("id", eq(id))],
            &format!("user {}", id),
        )
        .await
    }

    async fn find_user_by_wallet(&self, wallet_address: &str) -> StoreResult<User> {
        self.select_one(
            "users",
            &[
                ("select", "*".to_string()),
                ("wallet_address", eq(wallet_address)),
            ],
            &format!("user with wallet {}", wallet_address),
        )
        .await
    }

    async fn create_user(&self, wallet_address: &str) -> StoreResult<User> {
        self.insert("users", &NewUser::for_wallet(wallet_address)).await
    }

    async fn record_checkin(
        &self,
        user_id: &str,
        update: &CheckinUpdate,
    ) -> StoreResult<CheckinWrite> {
        let result: CheckinResult = self
            .rpc(
                "record_checkin",
                &RecordCheckinArgs {
                    p_user_id: user_id,
                    p_points: update.points,
                    p_streak: update.streak,
                    p_previous: update.previous_checkin,
                    p_at: update.last_checkin,
                },
            )
            .await?;

        match (result.recorded, result.user) {
            (true, Some(user)) => Ok(CheckinWrite::Recorded(user)),
            (true, None) => Err(StoreError::Decode(
                "record_checkin returned no user".to_string(),
            )),
            (false, _) => Ok(CheckinWrite::Superseded),
        }
    }

    async fn active_missions(&self) -> StoreResult<Vec<Mission>> {
        self.select(
            "missions",
            &[
                ("select", "*".to_string()),
                ("is_active", "eq.true".to_string()),
                ("order", "points_reward.desc".to_string()),
            ],
        )
        .await
    }

    async fn find_mission(&self, id: &str) -> StoreResult<Mission> {
        self.select_one(
            "missions",
            &[("select", "*".to_string()), ("id", eq(id))],
            &format!("mission {}", id),
        )
        .await
    }

    async fn completed_mission_ids(&self, user_id: &str) -> StoreResult<Vec<String>> {
        let rows: Vec<MissionIdRow> = self
            .select(
                "completed_missions",
                &[
                    ("select", "mission_id".to_string()),
                    ("user_id", eq(user_id)),
                ],
            )
            .await?;

        Ok(rows.into_iter().map(|r| r.mission_id).collect())
    }

    async fn complete_mission(
        &self,
        user_id: &str,
        mission: &Mission,
        at: DateTime<Utc>,
    ) -> StoreResult<CompletionOutcome> {
        let result: CompletionResult = self
            .rpc(
                "complete_mission",
                &CompleteMissionArgs {
                    p_user_id: user_id,
                    p_mission_id: &mission.id,
                    p_at: at,
                },
            )
            .await?;

        match (result.completed, result.user) {
            (true, Some(user)) => Ok(CompletionOutcome::Completed(user)),
            (true, None) => Err(StoreError::Decode(
                "complete_mission returned no user".to_string(),
            )),
            (false, _) => Ok(CompletionOutcome::AlreadyCompleted),
        }
    }

    async fn active_achievements(&self) -> StoreResult<Vec<Achievement>> {
        self.select(
            "achievements",
            &[
                ("select", "*".to_string()),
                ("is_active", "eq.true".to_string()),
                ("order", "condition_value.asc".to_string()),
            ],
        )
        .await
    }

    async fn find_achievement(&self, id: &str) -> StoreResult<Achievement> {
        self.select_one(
            "achievements",
            &[("select", "*".to_string()), ("id", eq(id))],
            &format!("achievement {}", id),
        )
        .await
    }

    async fn earned_achievements(&self, user_id: &str) -> StoreResult<Vec<EarnedAchievement>> {
        self.select(
            "user_achievements",
            &[
                ("select", "achieved_at,achievements(*)".to_string()),
                ("user_id", eq(user_id)),
                ("order", "achieved_at.asc".to_string()),
            ],
        )
        .await
    }

    async fn grant_achievement(
        &self,
        user_id: &str,
        achievement: &Achievement,
        at: DateTime<Utc>,
    ) -> StoreResult<GrantOutcome> {
        let result: GrantResult = self
            .rpc(
                "grant_achievement",
                &GrantAchievementArgs {
                    p_user_id: user_id,
                    p_achievement_id: &achievement.id,
                    p_at: at,
                },
            )
            .await?;

        match (result.granted, result.user) {
            (true, Some(user)) => Ok(GrantOutcome::Granted(user)),
            (true, None) => Err(StoreError::Decode(
                "grant_achievement returned no user".to_string(),
            )),
            (false, _) => Ok(GrantOutcome::AlreadyGranted),
        }
    }

    async fn recent_transactions(
        &self,
        wallet_address: &str,
        limit: usize,
    ) -> StoreResult<Vec<WalletTransaction>> {
        self.select(
            "transactions",
            &[
                ("select", "*".to_string()),
                ("wallet_address", eq(wallet_address)),
                ("order", "created_at.desc".to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }
}
