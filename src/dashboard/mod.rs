//! Dashboard flows: user loading, check-in, missions and achievements
//!
//! Every flow takes an explicit [`UserContext`] instead of reading ambient
//! state, is bounded by the configured timeout, and mutating flows hold an
//! in-flight key for their duration.

pub mod clock;
pub mod guard;

use chrono::{DateTime, Local};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::engine::{achievements, streak};
use crate::error::{DashboardError, DashboardResult};
use crate::models::{
    Achievement, CheckinOutcome, CheckinStatus, CheckinUpdate, EarnedAchievement,
    EvaluationReport, MissionOutcome, MissionState, MissionView, Notification, User,
    WalletTransaction,
};
use crate::session::{normalize_wallet_address, Session, SessionStore};
use crate::store::{CheckinWrite, CompletionOutcome, GrantOutcome, Store, StoreError};

use clock::Clock;
use guard::{InFlight, Operation};

/// Transactions shown in the wallet panel
pub const RECENT_TRANSACTIONS: usize = 3;

#[derive(Debug, Clone)]
pub struct DashboardSettings {
    pub first_login_achievement_id: String,
    pub flow_timeout: Duration,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            first_login_achievement_id: "a1eebc99-9c0b-4ef8-bb6d-6bb9bd380a11".to_string(),
            flow_timeout: Duration::from_secs(15),
        }
    }
}

/// The logged-in wallet and its user record for one request
#[derive(Debug, Clone)]
pub struct UserContext {
    pub wallet_address: String,
    pub user: User,
}

pub struct Dashboard {
    store: Arc<dyn Store>,
    sessions: SessionStore,
    clock: Arc<dyn Clock>,
    in_flight: InFlight,
    settings: DashboardSettings,
}

impl Dashboard {
    pub fn new(
        store: Arc<dyn Store>,
        sessions: SessionStore,
        clock: Arc<dyn Clock>,
        settings: DashboardSettings,
    ) -> Self {
        Self {
            store,
            sessions,
            clock,
            in_flight: InFlight::new(),
            settings,
        }
    }

    fn local_now(&self) -> DateTime<Local> {
        self.clock.now().with_timezone(&Local)
    }

    async fn with_timeout<T, F>(&self, flow: F) -> DashboardResult<T>
    where
        F: Future<Output = DashboardResult<T>>,
    {
        tokio::time::timeout(self.settings.flow_timeout, flow)
            .await
            .map_err(|_| DashboardError::Timeout(self.settings.flow_timeout))?
    }

    /// Store a wallet address as the session and load (or create) its user
    pub async fn login(&self, wallet_input: &str) -> DashboardResult<UserContext> {
        let wallet = normalize_wallet_address(wallet_input).ok_or_else(|| {
            DashboardError::Validation("wallet address must be 8-128 letters or digits".to_string())
        })?;

        let session = self.sessions.login(&wallet)?;
        info!("Wallet {} logged in", wallet);
        self.with_timeout(self.resolve_user(session)).await
    }

    pub fn logout(&self) -> DashboardResult<()> {
        self.sessions.clear()?;
        info!("Session cleared");
        Ok(())
    }

    /// Context for the current session, or `Unauthenticated`
    pub async fn open_context(&self) -> DashboardResult<UserContext> {
        let session = self.sessions.load()?;
        self.with_timeout(self.resolve_user(session)).await
    }

    async fn resolve_user(&self, session: Session) -> DashboardResult<UserContext> {
        let wallet = session.wallet_address.ok_or(DashboardError::Unauthenticated)?;

        let lookup = match session.user_id.as_deref() {
            Some(id) => self.store.find_user_by_id(id).await,
            None => self.store.find_user_by_wallet(&wallet).await,
        };

        let user = match lookup {
            Ok(user) => user,
            Err(StoreError::NotFound(_)) => {
                // A stale cached id may still have a row under the wallet
                let existing = if session.user_id.is_some() {
                    match self.store.find_user_by_wallet(&wallet).await {
                        Ok(user) => Some(user),
                        Err(StoreError::NotFound(_)) => None,
                        Err(e) => return Err(e.into()),
                    }
                } else {
                    None
                };

                match existing {
                    Some(user) => user,
                    None => match self.store.create_user(&wallet).await {
                        Ok(user) => {
                            info!("Created user {} for wallet {}", user.id, wallet);
                            user
                        }
                        // Another login created it first
                        Err(StoreError::Conflict(_)) => {
                            debug!("User for wallet {} already created, reloading", wallet);
                            self.store.find_user_by_wallet(&wallet).await?
                        }
                        Err(e) => return Err(e.into()),
                    },
                }
            }
            Err(e) => return Err(e.into()),
        };

        if session.user_id.as_deref() != Some(user.id.as_str()) {
            self.sessions.set_user_id(&user.id)?;
        }

        Ok(UserContext {
            wallet_address: wallet,
            user,
        })
    }

    pub fn checkin_status(&self, ctx: &UserContext) -> CheckinStatus {
        let now = self.local_now();
        let left = streak::time_until_next_checkin(now);

        CheckinStatus {
            checked_in_today: streak::has_checked_in_today(ctx.user.last_checkin, now),
            streak: ctx.user.streak,
            next_checkin_in_seconds: left.num_seconds(),
            next_checkin_label: streak::format_countdown(left),
        }
    }

    /// Active missions with their state for this user
    pub async fn missions(&self, ctx: &UserContext) -> DashboardResult<Vec<MissionView>> {
        self.with_timeout(async {
            let missions = self.store.active_missions().await?;
            let completed: HashSet<String> = self
                .store
                .completed_mission_ids(&ctx.user.id)
                .await?
                .into_iter()
                .collect();

            Ok(missions
                .into_iter()
                .map(|mission| {
                    let state = if completed.contains(&mission.id) {
                        MissionState::Completed
                    } else if self.in_flight.is_active(&Operation::CompleteMission {
                        user_id: ctx.user.id.clone(),
                        mission_id: mission.id.clone(),
                    }) {
                        MissionState::InProgress
                    } else {
                        MissionState::Available
                    };
                    MissionView { mission, state }
                })
                .collect())
        })
        .await
    }

    pub async fn achievements(&self, ctx: &UserContext) -> DashboardResult<Vec<EarnedAchievement>> {
        self.with_timeout(async { Ok(self.store.earned_achievements(&ctx.user.id).await?) })
            .await
    }

    pub async fn transactions(&self, ctx: &UserContext) -> DashboardResult<Vec<WalletTransaction>> {
        self.with_timeout(async {
            Ok(self
                .store
                .recent_transactions(&ctx.wallet_address, RECENT_TRANSACTIONS)
                .await?)
        })
        .await
    }

    /// Grant one achievement; `None` when the user already held it
    pub async fn grant_achievement(
        &self,
        ctx: &mut UserContext,
        achievement: &Achievement,
    ) -> DashboardResult<Option<Notification>> {
        match self
            .store
            .grant_achievement(&ctx.user.id, achievement, self.clock.now())
            .await?
        {
            GrantOutcome::Granted(user) => {
                info!(
                    "Granted achievement '{}' to user {} (+{} points)",
                    achievement.name, user.id, achievement.points_reward
                );
                ctx.user = user;
                Ok(Some(Notification::achievement_unlocked(achievement)))
            }
            GrantOutcome::AlreadyGranted => {
                debug!("User {} already holds '{}'", ctx.user.id, achievement.name);
                Ok(None)
            }
        }
    }

    /// Grant every active achievement whose threshold the user now meets.
    ///
    /// A failed grant is logged and counted; the rest still run. Each check
    /// sees points credited by the grants before it.
    pub async fn check_achievements(&self, ctx: &mut UserContext) -> DashboardResult<EvaluationReport> {
        let catalog = self.store.active_achievements().await?;
        let earned: HashSet<String> = self
            .store
            .earned_achievements(&ctx.user.id)
            .await?
            .into_iter()
            .map(|e| e.achievement.id)
            .collect();

        let mut report = EvaluationReport::default();
        for achievement in catalog.iter().filter(|a| !earned.contains(&a.id)) {
            if !achievements::is_condition_met(&ctx.user, achievement) {
                continue;
            }

            match self.grant_achievement(ctx, achievement).await {
                Ok(Some(notification)) => report.granted.push(notification),
                Ok(None) => {}
                Err(e) => {
                    warn!("Failed to grant achievement {}: {}", achievement.id, e);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Re-run the evaluator after a committed write; its failure does not
    /// undo the write
    async fn evaluate_after_write(&self, ctx: &mut UserContext) -> Vec<Notification> {
        match self.check_achievements(ctx).await {
            Ok(report) => {
                if report.failed > 0 {
                    warn!("{} achievement grants failed for user {}", report.failed, ctx.user.id);
                }
                report.granted
            }
            Err(e) => {
                warn!("Achievement check failed for user {}: {}", ctx.user.id, e);
                Vec::new()
            }
        }
    }

    pub async fn complete_mission(
        &self,
        ctx: &mut UserContext,
        mission_id: &str,
    ) -> DashboardResult<MissionOutcome> {
        let op = Operation::CompleteMission {
            user_id: ctx.user.id.clone(),
            mission_id: mission_id.to_string(),
        };
        let _guard = self
            .in_flight
            .try_begin(op.clone())
            .ok_or_else(|| DashboardError::Busy(op.to_string()))?;

        self.with_timeout(async {
            let mission = self.store.find_mission(mission_id).await?;
            if !mission.is_active {
                return Err(DashboardError::Validation(format!(
                    "mission {} is not active",
                    mission_id
                )));
            }

            match self
                .store
                .complete_mission(&ctx.user.id, &mission, self.clock.now())
                .await?
            {
                CompletionOutcome::Completed(user) => ctx.user = user,
                CompletionOutcome::AlreadyCompleted => {
                    return Err(DashboardError::AlreadyCompleted(mission_id.to_string()))
                }
            }

            info!(
                "User {} completed mission '{}' (+{} points, +{} SUN)",
                ctx.user.id, mission.name, mission.points_reward, mission.sun_reward
            );

            let notifications = self.evaluate_after_write(ctx).await;
            Ok(MissionOutcome {
                user: ctx.user.clone(),
                mission_id: mission.id,
                points_earned: mission.points_reward,
                sun_earned: mission.sun_reward,
                notifications,
            })
        })
        .await
    }

    pub async fn daily_checkin(&self, ctx: &mut UserContext) -> DashboardResult<CheckinOutcome> {
        let op = Operation::Checkin {
            user_id: ctx.user.id.clone(),
        };
        let _guard = self
            .in_flight
            .try_begin(op.clone())
            .ok_or_else(|| DashboardError::Busy(op.to_string()))?;

        self.with_timeout(async {
            // The context may predate the guard; decide on the stored row
            ctx.user = self.store.find_user_by_id(&ctx.user.id).await?;

            let now = self.clock.now();
            let local_now = now.with_timezone(&Local);
            if streak::has_checked_in_today(ctx.user.last_checkin, local_now) {
                return Err(DashboardError::AlreadyCheckedIn);
            }

            let first_checkin = ctx.user.is_first_checkin();
            let new_streak = streak::calculate_new_streak(
                ctx.user.last_checkin.map(streak::local_date),
                ctx.user.streak,
                local_now.date_naive(),
            );
            let points = streak::checkin_points(new_streak);

            let update = CheckinUpdate {
                streak: new_streak,
                points,
                previous_checkin: ctx.user.last_checkin,
                last_checkin: now,
            };
            match self.store.record_checkin(&ctx.user.id, &update).await? {
                CheckinWrite::Recorded(user) => ctx.user = user,
                CheckinWrite::Superseded => return Err(DashboardError::AlreadyCheckedIn),
            }
            info!(
                "User {} checked in: streak {}, +{} points",
                ctx.user.id, new_streak, points
            );

            let mut notifications = Vec::new();
            if first_checkin {
                if let Some(n) = self.grant_first_login(ctx).await {
                    notifications.push(n);
                }
            }
            notifications.extend(self.evaluate_after_write(ctx).await);

            Ok(CheckinOutcome {
                user: ctx.user.clone(),
                streak: new_streak,
                points_earned: points,
                multiplier: streak::streak_multiplier(new_streak),
                notifications,
            })
        })
        .await
    }

    async fn grant_first_login(&self, ctx: &mut UserContext) -> Option<Notification> {
        let id = &self.settings.first_login_achievement_id;
        let achievement = match self.store.find_achievement(id).await {
            Ok(a) => a,
            Err(e) => {
                warn!("First login achievement {} unavailable: {}", id, e);
                return None;
            }
        };

        match self.grant_achievement(ctx, &achievement).await {
            Ok(n) => n,
            Err(e) => {
                warn!("Failed to grant first login achievement: {}", e);
                None
            }
        }
    }
}
