//! Data models shared by the store, the flows and the API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Dashboard user, keyed by wallet address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: String,
    pub wallet_address: String,
    #[serde(default, deserialize_with = "de_null_default")]
    pub total_points: i64,
    #[serde(default, deserialize_with = "de_null_default")]
    pub sun_balance: i64,
    #[serde(default, deserialize_with = "de_null_default")]
    pub total_missions_completed: i64,
    #[serde(default, deserialize_with = "de_null_default")]
    pub streak: u32,
    #[serde(default)]
    pub last_checkin: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    /// A first check-in has never happened for this user
    pub fn is_first_checkin(&self) -> bool {
        self.streak == 0 && self.last_checkin.is_none()
    }
}

/// Nullable counters read as zero
fn de_null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Row inserted when a wallet logs in for the first time
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub wallet_address: String,
    pub total_points: i64,
    pub sun_balance: i64,
    pub total_missions_completed: i64,
    pub streak: u32,
}

impl NewUser {
    pub fn for_wallet(wallet_address: &str) -> Self {
        Self {
            wallet_address: wallet_address.to_string(),
            total_points: 0,
            sun_balance: 0,
            total_missions_completed: 0,
            streak: 0,
        }
    }
}

/// A daily check-in write.
///
/// `points` is added to the stored total. The write only applies while the
/// stored `last_checkin` still equals `previous_checkin`.
#[derive(Debug, Clone)]
pub struct CheckinUpdate {
    pub streak: u32,
    pub points: i64,
    pub previous_checkin: Option<DateTime<Utc>>,
    pub last_checkin: DateTime<Utc>,
}

/// A task a user can complete once for a reward
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Mission {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub mission_type: String,
    #[serde(default, deserialize_with = "de_null_default")]
    pub points_reward: i64,
    #[serde(default, deserialize_with = "de_null_default")]
    pub sun_reward: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// User counter an achievement threshold is compared against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConditionType {
    Streak,
    MissionsCompleted,
    Points,
    SunBalance,
    #[serde(other)]
    Unknown,
}

impl ConditionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Streak => "streak",
            Self::MissionsCompleted => "missions_completed",
            Self::Points => "points",
            Self::SunBalance => "sun_balance",
            Self::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "streak" => Self::Streak,
            "missions_completed" => Self::MissionsCompleted,
            "points" => Self::Points,
            "sun_balance" => Self::SunBalance,
            _ => Self::Unknown,
        }
    }
}

/// Threshold-based reward definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Achievement {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default)]
    pub condition_type: Option<ConditionType>,
    #[serde(default, deserialize_with = "de_null_default")]
    pub condition_value: i64,
    #[serde(default, deserialize_with = "de_null_default")]
    pub points_reward: i64,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

/// An achievement the user holds, with the time it was granted
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EarnedAchievement {
    pub achieved_at: DateTime<Utc>,
    #[serde(rename = "achievements")]
    pub achievement: Achievement,
}

/// Direction of a wallet transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Received,
    Sent,
}

/// Wallet transaction shown in the wallet panel
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WalletTransaction {
    pub id: String,
    pub wallet_address: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    #[serde(deserialize_with = "de_amount")]
    pub amount: f64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl WalletTransaction {
    pub fn is_pending(&self) -> bool {
        self.status.as_deref() == Some("pending")
    }
}

/// PostgREST serializes numeric columns as strings, float columns as numbers
fn de_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Number(f64),
        Text(String),
    }

    match Amount::deserialize(deserializer)? {
        Amount::Number(n) => Ok(n),
        Amount::Text(s) => Ok(s.trim().parse().unwrap_or(0.0)),
    }
}

/// Check-in eligibility and countdown for the dashboard header
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckinStatus {
    pub checked_in_today: bool,
    pub streak: u32,
    pub next_checkin_in_seconds: i64,
    pub next_checkin_label: String,
}

/// Mission plus its state for the current user
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MissionView {
    pub mission: Mission,
    pub state: MissionState,
}

/// Lifecycle of a mission button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MissionState {
    Available,
    InProgress,
    Completed,
}

/// One-shot toast describing a granted achievement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub title: String,
    pub achievement_name: String,
    pub points_reward: i64,
}

impl Notification {
    pub fn achievement_unlocked(achievement: &Achievement) -> Self {
        Self {
            title: "Achievement Unlocked!".to_string(),
            achievement_name: achievement.name.clone(),
            points_reward: achievement.points_reward,
        }
    }
}

/// Result of running the achievement evaluator once
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationReport {
    pub granted: Vec<Notification>,
    pub failed: u32,
}

/// Outcome of a successful daily check-in
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckinOutcome {
    pub user: User,
    pub streak: u32,
    pub points_earned: i64,
    pub multiplier: f64,
    pub notifications: Vec<Notification>,
}

/// Outcome of a successful mission completion
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MissionOutcome {
    pub user: User,
    pub mission_id: String,
    pub points_earned: i64,
    pub sun_earned: i64,
    pub notifications: Vec<Notification>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_type_unknown_values() {
        let a: Achievement = serde_json::from_value(serde_json::json!({
            "id": "a1",
            "condition_type": "referrals",
            "condition_value": 3
        }))
        .unwrap();
        assert_eq!(a.condition_type, Some(ConditionType::Unknown));

        let b: Achievement = serde_json::from_value(serde_json::json!({
            "id": "a2",
            "condition_type": null
        }))
        .unwrap();
        assert_eq!(b.condition_type, None);
        assert!(b.is_active);
    }

    #[test]
    fn test_transaction_amount_from_numeric_string() {
        let tx: WalletTransaction = serde_json::from_value(serde_json::json!({
            "id": "t1",
            "wallet_address": "0xabc",
            "type": "received",
            "amount": "12.5000",
            "status": "pending"
        }))
        .unwrap();
        assert_eq!(tx.kind, TransactionKind::Received);
        assert!((tx.amount - 12.5).abs() < f64::EPSILON);
        assert!(tx.is_pending());
    }

    #[test]
    fn test_user_defaults_from_sparse_row() {
        let user: User = serde_json::from_value(serde_json::json!({
            "id": "u1",
            "wallet_address": "0xabc",
            "total_points": null
        }))
        .unwrap();
        assert_eq!(user.total_points, 0);
        assert_eq!(user.streak, 0);
        assert!(user.is_first_checkin());
    }
}
