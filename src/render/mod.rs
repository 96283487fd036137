//! HTML rendering for the dashboard sections
//!
//! Handlers depend on the renderer traits, not on the markup, so each
//! section can be swapped independently. All user-controlled text goes
//! through [`escape`].

pub mod page;

use chrono::Local;
use std::sync::Arc;

use crate::models::{
    EarnedAchievement, MissionState, MissionView, Notification, TransactionKind,
    WalletTransaction,
};

pub trait MissionRenderer: Send + Sync {
    fn missions(&self, missions: &[MissionView]) -> String;
}

pub trait AchievementRenderer: Send + Sync {
    fn achievements(&self, earned: &[EarnedAchievement]) -> String;
    fn notification(&self, notification: &Notification) -> String;
}

pub trait TransactionRenderer: Send + Sync {
    fn transactions(&self, transactions: &[WalletTransaction]) -> String;
}

/// Render targets for each dashboard section
#[derive(Clone)]
pub struct Renderers {
    pub missions: Arc<dyn MissionRenderer>,
    pub achievements: Arc<dyn AchievementRenderer>,
    pub transactions: Arc<dyn TransactionRenderer>,
}

impl Renderers {
    pub fn html() -> Self {
        Self {
            missions: Arc::new(HtmlRenderer),
            achievements: Arc::new(HtmlRenderer),
            transactions: Arc::new(HtmlRenderer),
        }
    }
}

/// Escape text for HTML element content and quoted attributes
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Font Awesome icon name for a mission type
pub fn mission_icon(mission_type: &str) -> &'static str {
    match mission_type {
        "social" => "share-alt",
        "twitter" => "twitter",
        "discord" => "discord",
        "website" => "globe",
        "youtube" => "youtube",
        "telegram" => "telegram",
        "daily" => "calendar-check",
        "feedback" => "comment-alt",
        "checkin" => "calendar-day",
        _ => "tasks",
    }
}

/// Header style: `0xabcd...wxyz`
pub fn shorten_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 10 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Wallet panel style: `0x` dropped, `chars` kept on each side
pub fn shorten_address_compact(address: &str, chars: usize) -> String {
    let clean = address.strip_prefix("0x").unwrap_or(address);
    let all: Vec<char> = clean.chars().collect();
    if all.len() <= chars * 2 {
        return clean.to_string();
    }
    let head: String = all[..chars].iter().collect();
    let tail: String = all[all.len() - chars..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Signed amount with four decimals, e.g. `+12.5000`
pub fn format_amount(kind: TransactionKind, amount: f64) -> String {
    let sign = match kind {
        TransactionKind::Received => '+',
        TransactionKind::Sent => '-',
    };
    format!("{}{:.4}", sign, amount.abs())
}

/// Only plain web links are rendered as mission targets
fn safe_link(url: &str) -> Option<&str> {
    let url = url.trim();
    (url.starts_with("https://") || url.starts_with("http://")).then_some(url)
}

fn empty_state(message: &str) -> String {
    format!(
        r#"<div class="empty-message"><i class="fas fa-info-circle"></i><p>{}</p></div>"#,
        escape(message)
    )
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl HtmlRenderer {
    fn mission_card(&self, view: &MissionView) -> String {
        let mission = &view.mission;
        let id = escape(&mission.id);
        let complete_form = |label: &str| {
            format!(
                r#"<form method="post" action="/actions/missions/{id}/complete"><button type="submit" class="mission-action">{label}</button></form>"#,
                id = id,
                label = label
            )
        };

        let action = match view.state {
            MissionState::Completed => {
                r#"<button class="mission-completed" disabled><i class="fas fa-check-circle"></i> Done</button>"#
                    .to_string()
            }
            MissionState::InProgress => {
                r#"<button class="mission-action" disabled><i class="fas fa-spinner fa-spin"></i></button>"#
                    .to_string()
            }
            MissionState::Available => match mission.action_url.as_deref().and_then(safe_link) {
                Some(url) => format!(
                    r#"<a href="{}" target="_blank" rel="noopener" class="mission-link">Visit Link</a>{}"#,
                    escape(url),
                    complete_form("Complete")
                ),
                None => complete_form("Complete Mission"),
            },
        };

        format!(
            r#"<div class="mission-card{completed}" data-mission-id="{id}">
  <div class="mission-icon-container"><i class="fab fa-{icon} mission-icon"></i></div>
  <h3 class="mission-title">{name}</h3>
  <p class="mission-description">{description}</p>
  <div class="mission-rewards">
    <div class="reward-badge"><span class="reward-label">Points</span><span class="reward-value points">{points}</span></div>
    <div class="reward-badge"><span class="reward-label">SUN</span><span class="reward-value sun">{sun}</span></div>
  </div>
  {action}
</div>"#,
            completed = if view.state == MissionState::Completed { " completed" } else { "" },
            id = id,
            icon = mission_icon(&mission.mission_type),
            name = escape(&mission.name),
            description = escape(&mission.description),
            points = mission.points_reward,
            sun = mission.sun_reward,
            action = action,
        )
    }
}

impl MissionRenderer for HtmlRenderer {
    fn missions(&self, missions: &[MissionView]) -> String {
        if missions.is_empty() {
            return empty_state("No missions available right now.");
        }
        missions.iter().map(|m| self.mission_card(m)).collect::<Vec<_>>().join("\n")
    }
}

impl AchievementRenderer for HtmlRenderer {
    fn achievements(&self, earned: &[EarnedAchievement]) -> String {
        if earned.is_empty() {
            return empty_state("No achievements yet. Check in and complete missions to earn them!");
        }

        earned
            .iter()
            .map(|e| {
                let a = &e.achievement;
                format!(
                    r#"<div class="achievement-card">
  <div class="achievement-icon"><i class="{icon}"></i></div>
  <h3>{name}</h3>
  <p>{description}</p>
  <div class="achievement-reward"><i class="fas fa-award"></i> Reward: {points} points <i class="fas fa-check completed-badge"></i></div>
</div>"#,
                    icon = escape(a.icon.as_deref().unwrap_or("fas fa-trophy")),
                    name = escape(&a.name),
                    description = escape(&a.description),
                    points = a.points_reward,
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn notification(&self, notification: &Notification) -> String {
        format!(
            r#"<div class="achievement-notification show">
  <div class="notification-icon"><i class="fas fa-trophy"></i></div>
  <div class="notification-content">
    <h3>{title}</h3>
    <p>{name}</p>
    <p class="reward-amount">+ {points} points</p>
  </div>
</div>"#,
            title = escape(&notification.title),
            name = escape(&notification.achievement_name),
            points = notification.points_reward,
        )
    }
}

impl TransactionRenderer for HtmlRenderer {
    fn transactions(&self, transactions: &[WalletTransaction]) -> String {
        if transactions.is_empty() {
            return r#"<div class="empty-state"><i class="fas fa-receipt"></i><p>No transactions yet</p></div>"#
                .to_string();
        }

        transactions
            .iter()
            .map(|tx| {
                let (kind, icon, label) = match tx.kind {
                    TransactionKind::Received => ("received", "down", "Received"),
                    TransactionKind::Sent => ("sent", "up", "Sent"),
                };
                let (status_class, status) = if tx.is_pending() {
                    ("pending", "Pending")
                } else {
                    ("confirmed", "Confirmed")
                };
                let date = tx
                    .created_at
                    .map(|ts| ts.with_timezone(&Local).format("%d/%m/%Y %H:%M").to_string())
                    .unwrap_or_else(|| "\u{2014}".to_string());

                format!(
                    r#"<div class="transaction-item {kind}">
  <div class="transaction-icon"><i class="fas fa-arrow-{icon}"></i></div>
  <div class="transaction-details">
    <div class="transaction-meta"><span class="transaction-type">{label}</span><span class="transaction-date">{date}</span></div>
    <div class="transaction-info"><span class="transaction-amount">{amount} {currency}</span><span class="transaction-status {status_class}">{status}</span></div>
  </div>
</div>"#,
                    kind = kind,
                    icon = icon,
                    label = label,
                    date = date,
                    amount = format_amount(tx.kind, tx.amount),
                    currency = escape(tx.currency.as_deref().unwrap_or("SUN")),
                    status_class = status_class,
                    status = status,
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Achievement, Mission};

    fn view(state: MissionState, action_url: Option<&str>) -> MissionView {
        MissionView {
            mission: Mission {
                id: "m1".to_string(),
                name: "Follow <us>".to_string(),
                description: "On \"X\"".to_string(),
                mission_type: "twitter".to_string(),
                points_reward: 20,
                sun_reward: 5,
                action_url: action_url.map(str::to_string),
                is_active: true,
            },
            state,
        }
    }

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_mission_icons() {
        assert_eq!(mission_icon("website"), "globe");
        assert_eq!(mission_icon("feedback"), "comment-alt");
        assert_eq!(mission_icon("checkin"), "calendar-day");
        assert_eq!(mission_icon("quiz"), "tasks");
    }

    #[test]
    fn test_address_shortening() {
        assert_eq!(shorten_address("0x1234567890abcdef"), "0x1234...cdef");
        assert_eq!(shorten_address("0xabc"), "0xabc");
        assert_eq!(shorten_address_compact("0x1234567890abcdef", 4), "1234...cdef");
        assert_eq!(shorten_address_compact("0x12345678", 4), "12345678");
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(TransactionKind::Received, 12.5), "+12.5000");
        assert_eq!(format_amount(TransactionKind::Sent, 0.00001), "-0.0000");
        assert_eq!(format_amount(TransactionKind::Sent, 3.0), "-3.0000");
    }

    #[test]
    fn test_mission_buttons_follow_state() {
        let r = HtmlRenderer;

        let done = r.missions(&[view(MissionState::Completed, None)]);
        assert!(done.contains("mission-card completed"));
        assert!(done.contains("Done"));
        assert!(!done.contains("<form"));

        let link = r.missions(&[view(MissionState::Available, Some("https://x.com/sunaryum"))]);
        assert!(link.contains(r#"href="https://x.com/sunaryum""#));
        assert!(link.contains("Visit Link"));
        assert!(link.contains(r#"action="/actions/missions/m1/complete""#));

        let plain = r.missions(&[view(MissionState::Available, None)]);
        assert!(plain.contains("Complete Mission"));
        assert!(!plain.contains("Visit Link"));

        let busy = r.missions(&[view(MissionState::InProgress, None)]);
        assert!(busy.contains("fa-spin"));
    }

    #[test]
    fn test_mission_text_is_escaped_and_links_filtered() {
        let r = HtmlRenderer;
        let html = r.missions(&[view(MissionState::Available, Some("javascript:alert(1)"))]);
        assert!(html.contains("Follow &lt;us&gt;"));
        assert!(html.contains("On &quot;X&quot;"));
        assert!(!html.contains("javascript:"));
        assert!(html.contains("fa-twitter"));
    }

    #[test]
    fn test_empty_sections() {
        let r = HtmlRenderer;
        assert!(r.missions(&[]).contains("No missions available"));
        assert!(r.achievements(&[]).contains("No achievements yet"));
        assert!(r.transactions(&[]).contains("No transactions yet"));
    }

    #[test]
    fn test_achievement_card_and_toast() {
        let r = HtmlRenderer;
        let achievement = Achievement {
            id: "a1".to_string(),
            name: "Week Warrior".to_string(),
            description: "7 days".to_string(),
            icon: None,
            condition_type: None,
            condition_value: 7,
            points_reward: 50,
            is_active: true,
        };
        let earned = EarnedAchievement {
            achieved_at: chrono::Utc::now(),
            achievement: achievement.clone(),
        };

        let card = r.achievements(&[earned]);
        assert!(card.contains("fas fa-trophy"));
        assert!(card.contains("Reward: 50 points"));

        let toast = r.notification(&Notification::achievement_unlocked(&achievement));
        assert!(toast.contains("Achievement Unlocked!"));
        assert!(toast.contains("+ 50 points"));
    }

    #[test]
    fn test_transaction_rows() {
        let r = HtmlRenderer;
        let html = r.transactions(&[
            WalletTransaction {
                id: "t1".to_string(),
                wallet_address: "0xabc".to_string(),
                kind: TransactionKind::Received,
                amount: 12.5,
                currency: None,
                status: Some("pending".to_string()),
                created_at: None,
            },
            WalletTransaction {
                id: "t2".to_string(),
                wallet_address: "0xabc".to_string(),
                kind: TransactionKind::Sent,
                amount: 1.25,
                currency: Some("ETH".to_string()),
                status: Some("confirmed".to_string()),
                created_at: None,
            },
        ]);

        assert!(html.contains("+12.5000 SUN"));
        assert!(html.contains("Received"));
        assert!(html.contains("Pending"));
        assert!(html.contains("-1.2500 ETH"));
        assert!(html.contains("fa-arrow-up"));
        assert!(html.contains("Confirmed"));
    }
}
