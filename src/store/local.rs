use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use duckdb::{params, Connection, Params, Row};
use std::sync::{Arc, Mutex, MutexGuard};

use super::schema::{DEFAULT_CATALOG, MIGRATIONS};
use super::{CheckinWrite, CompletionOutcome, GrantOutcome, Store, StoreError, StoreResult};
use crate::models::{
    Achievement, CheckinUpdate, ConditionType, EarnedAchievement, Mission, TransactionKind, User,
    WalletTransaction,
};

const USER_COLUMNS: &str = "id, wallet_address, total_points, sun_balance, total_missions_completed, \
     streak, last_checkin, created_at, updated_at";

const MISSION_COLUMNS: &str =
    "id, name, description, mission_type, points_reward, sun_reward, action_url, is_active";

const ACHIEVEMENT_COLUMNS: &str =
    "id, name, description, icon, condition_type, condition_value, points_reward, is_active";

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, duckdb::Error>;
}

impl<T> OptionalExt<T> for Result<T, duckdb::Error> {
    fn optional(self) -> Result<Option<T>, duckdb::Error> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// DuckDB-backed store for running without a Supabase project
#[derive(Clone)]
pub struct LocalStore {
    conn: Arc<Mutex<Connection>>,
}

impl LocalStore {
    pub fn open(path: &str) -> anyhow::Result<Self> {
        let conn = Connection::open(path).context("Failed to open database")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> anyhow::Result<()> {
        let conn = self.lock()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        for (id, (name, sql)) in MIGRATIONS.iter().enumerate() {
            let applied: Option<i32> = conn
                .query_row(
                    "SELECT id FROM _migrations WHERE id = ?",
                    params![id as i32],
                    |row| row.get(0),
                )
                .optional()?;

            if applied.is_none() {
                tracing::info!("Running migration: {}", name);
                conn.execute_batch(sql)?;
                conn.execute(
                    "INSERT INTO _migrations (id, name) VALUES (?, ?)",
                    params![id as i32, *name],
                )?;
            }
        }

        Ok(())
    }

    /// Load the starter catalog when no missions or achievements exist yet
    pub fn seed_default_catalog(&self) -> anyhow::Result<bool> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT (SELECT COUNT(*) FROM missions) + (SELECT COUNT(*) FROM achievements)",
            [],
            |row| row.get(0),
        )?;

        if count > 0 {
            return Ok(false);
        }

        tracing::info!("Seeding default missions and achievements");
        conn.execute_batch(DEFAULT_CATALOG)?;
        Ok(true)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::remote("database lock poisoned"))
    }

    fn query_one<T, P, F>(&self, sql: &str, params: P, f: F) -> StoreResult<Option<T>>
    where
        P: Params,
        F: FnOnce(&Row<'_>) -> Result<T, duckdb::Error>,
    {
        let conn = self.lock()?;
        Ok(conn.query_row(sql, params, f).optional()?)
    }

    fn query_all<T, P, F>(&self, sql: &str, params: P, mut f: F) -> StoreResult<Vec<T>>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> Result<T, duckdb::Error>,
    {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut results = Vec::new();
        while let Some(row) = rows.next()? {
            results.push(f(row)?);
        }
        Ok(results)
    }

    fn user_by(&self, column: &str, value: &str) -> StoreResult<User> {
        let sql = format!("SELECT {} FROM users WHERE {} = ?", USER_COLUMNS, column);
        self.query_one(&sql, params![value], user_from_row)?
            .ok_or_else(|| StoreError::NotFound(format!("user with {} {}", column, value)))
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: Option<String>) -> Option<DateTime<Utc>> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn user_from_row(row: &Row<'_>) -> Result<User, duckdb::Error> {
    let streak: i64 = row.get(5)?;
    Ok(User {
        id: row.get(0)?,
        wallet_address: row.get(1)?,
        total_points: row.get(2)?,
        sun_balance: row.get(3)?,
        total_missions_completed: row.get(4)?,
        streak: u32::try_from(streak).unwrap_or(0),
        last_checkin: parse_timestamp(row.get(6)?),
        created_at: parse_timestamp(row.get(7)?),
        updated_at: parse_timestamp(row.get(8)?),
    })
}

fn mission_from_row(row: &Row<'_>) -> Result<Mission, duckdb::Error> {
    Ok(Mission {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        mission_type: row.get(3)?,
        points_reward: row.get(4)?,
        sun_reward: row.get(5)?,
        action_url: row.get(6)?,
        is_active: row.get(7)?,
    })
}

/// Reads achievement columns starting at `offset`
fn achievement_at(row: &Row<'_>, offset: usize) -> Result<Achievement, duckdb::Error> {
    let condition: Option<String> = row.get(offset + 4)?;
    Ok(Achievement {
        id: row.get(offset)?,
        name: row.get(offset + 1)?,
        description: row.get(offset + 2)?,
        icon: row.get(offset + 3)?,
        condition_type: condition.as_deref().map(ConditionType::parse),
        condition_value: row.get(offset + 5)?,
        points_reward: row.get(offset + 6)?,
        is_active: row.get(offset + 7)?,
    })
}

fn transaction_from_row(row: &Row<'_>) -> Result<WalletTransaction, duckdb::Error> {
    let kind: String = row.get(2)?;
    Ok(WalletTransaction {
        id: row.get(0)?,
        wallet_address: row.get(1)?,
        kind: if kind == "received" {
            TransactionKind::Received
        } else {
            TransactionKind::Sent
        },
        amount: row.get(3)?,
        currency: row.get(4)?,
        status: row.get(5)?,
        created_at: parse_timestamp(row.get(6)?),
    })
}

#[async_trait]
impl Store for LocalStore {
    async fn find_user_by_id(&self, id: &str) -> StoreResult<User> {
        self.user_by("id", id)
    }

    async fn find_user_by_wallet(&self, wallet_address: &str) -> StoreResult<User> {
        self.user_by("wallet_address", wallet_address)
    }

    async fn create_user(&self, wallet_address: &str) -> StoreResult<User> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = timestamp(Utc::now());
        {
            let conn = self.lock()?;
            let existing: i64 = conn.query_row(
                "SELECT COUNT(*) FROM users WHERE wallet_address = ?",
                params![wallet_address],
                |row| row.get(0),
            )?;
            if existing > 0 {
                return Err(StoreError::Conflict(format!(
                    "user with wallet {} already exists",
                    wallet_address
                )));
            }

            conn.execute(
                "INSERT INTO users (id, wallet_address, total_points, sun_balance, total_missions_completed, streak, created_at, updated_at)
                 VALUES (?, ?, 0, 0, 0, 0, ?, ?)",
                params![id, wallet_address, now, now],
            )?;
        }
        self.user_by("id", &id)
    }

    async fn record_checkin(
        &self,
        user_id: &str,
        update: &CheckinUpdate,
    ) -> StoreResult<CheckinWrite> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let ts = timestamp(update.last_checkin);
        let changed = tx.execute(
            "UPDATE users SET
                total_points = total_points + ?,
                streak = ?,
                last_checkin = ?,
                updated_at = ?
             WHERE id = ? AND last_checkin IS NOT DISTINCT FROM ?",
            params![
                update.points,
                i64::from(update.streak),
                ts,
                ts,
                user_id,
                update.previous_checkin.map(timestamp)
            ],
        )?;

        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let user = tx
            .query_row(&sql, params![user_id], user_from_row)
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("user with id {}", user_id)))?;
        tx.commit()?;

        if changed == 0 {
            return Ok(CheckinWrite::Superseded);
        }
        Ok(CheckinWrite::Recorded(user))
    }

    async fn active_missions(&self) -> StoreResult<Vec<Mission>> {
        let sql = format!(
            "SELECT {} FROM missions WHERE is_active = TRUE ORDER BY points_reward DESC, id",
            MISSION_COLUMNS
        );
        self.query_all(&sql, [], mission_from_row)
    }

    async fn find_mission(&self, id: &str) -> StoreResult<Mission> {
        let sql = format!("SELECT {} FROM missions WHERE id = ?", MISSION_COLUMNS);
        self.query_one(&sql, params![id], mission_from_row)?
            .ok_or_else(|| StoreError::NotFound(format!("mission {}", id)))
    }

    async fn completed_mission_ids(&self, user_id: &str) -> StoreResult<Vec<String>> {
        self.query_all(
            "SELECT mission_id FROM completed_missions WHERE user_id = ?",
            params![user_id],
            |row| row.get(0),
        )
    }

    async fn complete_mission(
        &self,
        user_id: &str,
        mission: &Mission,
        at: DateTime<Utc>,
    ) -> StoreResult<CompletionOutcome> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let existing: i64 = tx.query_row(
            "SELECT COUNT(*) FROM completed_missions WHERE user_id = ? AND mission_id = ?",
            params![user_id, mission.id],
            |row| row.get(0),
        )?;
        if existing > 0 {
            return Ok(CompletionOutcome::AlreadyCompleted);
        }

        let ts = timestamp(at);
        tx.execute(
            "INSERT INTO completed_missions (user_id, mission_id, completed_at) VALUES (?, ?, ?)",
            params![user_id, mission.id, ts],
        )?;
        let changed = tx.execute(
            "UPDATE users SET
                total_points = total_points + ?,
                sun_balance = sun_balance + ?,
                total_missions_completed = total_missions_completed + 1,
                updated_at = ?
             WHERE id = ?",
            params![mission.points_reward, mission.sun_reward, ts, user_id],
        )?;
        if changed == 0 {
            // Dropping the transaction rolls back the completion record
            return Err(StoreError::NotFound(format!("user with id {}", user_id)));
        }

        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let user = tx.query_row(&sql, params![user_id], user_from_row)?;
        tx.commit()?;

        Ok(CompletionOutcome::Completed(user))
    }

    async fn active_achievements(&self) -> StoreResult<Vec<Achievement>> {
        let sql = format!(
            "SELECT {} FROM achievements WHERE is_active = TRUE ORDER BY condition_value, id",
            ACHIEVEMENT_COLUMNS
        );
        self.query_all(&sql, [], |row| achievement_at(row, 0))
    }

    async fn find_achievement(&self, id: &str) -> StoreResult<Achievement> {
        let sql = format!("SELECT {} FROM achievements WHERE id = ?", ACHIEVEMENT_COLUMNS);
        self.query_one(&sql, params![id], |row| achievement_at(row, 0))?
            .ok_or_else(|| StoreError::NotFound(format!("achievement {}", id)))
    }

    async fn earned_achievements(&self, user_id: &str) -> StoreResult<Vec<EarnedAchievement>> {
        let sql = "SELECT ua.achieved_at, a.id, a.name, a.description, a.icon, a.condition_type,
                          a.condition_value, a.points_reward, a.is_active
                   FROM user_achievements ua
                   JOIN achievements a ON a.id = ua.achievement_id
                   WHERE ua.user_id = ?
                   ORDER BY ua.achieved_at";
        self.query_all(sql, params![user_id], |row| {
            let achieved_at: Option<String> = row.get(0)?;
            Ok(EarnedAchievement {
                achieved_at: parse_timestamp(achieved_at).unwrap_or_default(),
                achievement: achievement_at(row, 1)?,
            })
        })
    }

    async fn grant_achievement(
        &self,
        user_id: &str,
        achievement: &Achievement,
        at: DateTime<Utc>,
    ) -> StoreResult<GrantOutcome> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let existing: i64 = tx.query_row(
            "SELECT COUNT(*) FROM user_achievements WHERE user_id = ? AND achievement_id = ?",
            params![user_id, achievement.id],
            |row| row.get(0),
        )?;
        if existing > 0 {
            return Ok(GrantOutcome::AlreadyGranted);
        }

        let ts = timestamp(at);
        tx.execute(
            "INSERT INTO user_achievements (user_id, achievement_id, achieved_at) VALUES (?, ?, ?)",
            params![user_id, achievement.id, ts],
        )?;
        let changed = tx.execute(
            "UPDATE users SET total_points = total_points + ?, updated_at = ? WHERE id = ?",
            params![achievement.points_reward, ts, user_id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("user with id {}", user_id)));
        }

        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let user = tx.query_row(&sql, params![user_id], user_from_row)?;
        tx.commit()?;

        Ok(GrantOutcome::Granted(user))
    }

    async fn recent_transactions(
        &self,
        wallet_address: &str,
        limit: usize,
    ) -> StoreResult<Vec<WalletTransaction>> {
        self.query_all(
            "SELECT id, wallet_address, kind, amount, currency, status, created_at
             FROM transactions
             WHERE wallet_address = ?
             ORDER BY created_at DESC
             LIMIT ?",
            params![wallet_address, limit as i64],
            transaction_from_row,
        )
    }
}

#[cfg(test)]
impl LocalStore {
    /// Fresh migrated in-memory store with an empty catalog
    pub(crate) fn for_tests() -> Self {
        let store = Self::open_in_memory().unwrap();
        store.migrate().unwrap();
        store
    }

    pub(crate) fn insert_mission(&self, mission: &Mission) {
        let conn = self.lock().unwrap();
        conn.execute(
            "INSERT INTO missions (id, name, description, mission_type, points_reward, sun_reward, action_url, is_active)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                mission.id,
                mission.name,
                mission.description,
                mission.mission_type,
                mission.points_reward,
                mission.sun_reward,
                mission.action_url,
                mission.is_active
            ],
        )
        .unwrap();
    }

    pub(crate) fn insert_achievement(&self, achievement: &Achievement) {
        let conn = self.lock().unwrap();
        conn.execute(
            "INSERT INTO achievements (id, name, description, icon, condition_type, condition_value, points_reward, is_active)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                achievement.id,
                achievement.name,
                achievement.description,
                achievement.icon,
                achievement.condition_type.map(|c| c.as_str().to_string()),
                achievement.condition_value,
                achievement.points_reward,
                achievement.is_active
            ],
        )
        .unwrap();
    }

    pub(crate) fn insert_transaction(&self, tx: &WalletTransaction) {
        let conn = self.lock().unwrap();
        conn.execute(
            "INSERT INTO transactions (id, wallet_address, kind, amount, currency, status, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                tx.id,
                tx.wallet_address,
                match tx.kind {
                    TransactionKind::Received => "received",
                    TransactionKind::Sent => "sent",
                },
                tx.amount,
                tx.currency,
                tx.status,
                timestamp(tx.created_at.unwrap_or_else(Utc::now))
            ],
        )
        .unwrap();
    }

    /// Overwrite a user's counters and check-in state
    pub(crate) fn set_user_state(
        &self,
        user_id: &str,
        total_points: i64,
        streak: u32,
        last_checkin: Option<DateTime<Utc>>,
    ) {
        let conn = self.lock().unwrap();
        conn.execute(
            "UPDATE users SET total_points = ?, streak = ?, last_checkin = ? WHERE id = ?",
            params![total_points, i64::from(streak), last_checkin.map(timestamp), user_id],
        )
        .unwrap();
    }
}
