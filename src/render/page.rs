//! Full pages and the panels shared between them

use super::{escape, shorten_address, shorten_address_compact};
use crate::dashboard::UserContext;
use crate::error::DashboardError;
use crate::models::CheckinStatus;

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; background: #0f1115; color: #e6e6e6; margin: 0; }
header { display: flex; justify-content: space-between; align-items: center; padding: 1rem 2rem; background: #171a21; }
main { padding: 1.5rem 2rem; }
section { margin-bottom: 2rem; }
.stats { display: flex; gap: 1rem; flex-wrap: wrap; }
.stat { background: #171a21; padding: 1rem; border-radius: 8px; min-width: 140px; }
.grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(240px, 1fr)); gap: 1rem; }
.mission-card, .achievement-card, .transaction-item { background: #171a21; padding: 1rem; border-radius: 8px; }
.mission-card.completed { opacity: 0.6; }
.error-message { background: #3a1d1d; padding: 1rem; border-radius: 8px; }
.notice { background: #1d3a26; padding: 0.75rem 1rem; border-radius: 8px; margin-bottom: 1rem; }
.achievement-notification { background: #2b2a12; padding: 1rem; border-radius: 8px; margin-bottom: 1rem; }
button, .mission-link { cursor: pointer; }
"#;

/// Where the retry button of an error panel goes
pub enum Retry<'a> {
    Reload,
    Post(&'a str),
}

pub fn error_panel(err: &DashboardError, retry: Retry<'_>) -> String {
    let button = if err.is_retryable() {
        match retry {
            Retry::Reload => r#"<a class="retry-button" href="/">Try again</a>"#.to_string(),
            Retry::Post(action) => format!(
                r#"<form method="post" action="{}"><button type="submit" class="retry-button">Try again</button></form>"#,
                escape(action)
            ),
        }
    } else {
        String::new()
    };

    format!(
        r#"<div class="error-message"><i class="fas fa-exclamation-triangle"></i><p>{}</p>{}</div>"#,
        escape(&err.to_string()),
        button
    )
}

pub fn notice(message: &str) -> String {
    format!(r#"<div class="notice">{}</div>"#, escape(message))
}

fn checkin_button(status: &CheckinStatus) -> String {
    if status.checked_in_today {
        format!(
            r#"<button id="checkinBtn" disabled><i class="fas fa-clock"></i> Next check-in in {}</button>"#,
            escape(&status.next_checkin_label)
        )
    } else {
        r#"<form method="post" action="/actions/checkin"><button id="checkinBtn" type="submit">Daily Check-in</button></form>"#
            .to_string()
    }
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.5.1/css/all.min.css">
<style>{style}</style>
</head>
<body>
{body}
</body>
</html>"#,
        title = escape(title),
        style = STYLE,
        body = body
    )
}

/// Rendered sections of the dashboard
pub struct DashboardPage<'a> {
    pub ctx: &'a UserContext,
    pub status: &'a CheckinStatus,
    pub notices: Vec<String>,
    pub missions: String,
    pub achievements: String,
    pub transactions: String,
}

pub fn dashboard_page(page: &DashboardPage<'_>) -> String {
    let user = &page.ctx.user;
    let body = format!(
        r#"<header>
  <h1>Sunaryum Airdrop</h1>
  <div class="wallet">
    <span id="walletAddress" title="{wallet}">{short}</span>
    <form method="post" action="/logout"><button type="submit">Logout</button></form>
  </div>
</header>
<main>
  {notices}
  <section class="stats">
    <div class="stat"><span>Points</span><strong id="totalPoints">{points}</strong></div>
    <div class="stat"><span>SUN</span><strong id="sunBalance">{sun}</strong></div>
    <div class="stat"><span>Missions</span><strong id="missionsCompleted">{missions_done}</strong></div>
    <div class="stat"><span>Streak</span><strong id="streakCounter">{streak} days</strong></div>
  </section>
  <section class="checkin">{checkin}</section>
  <section><h2>Missions</h2><div class="grid" id="missionsGrid">{missions}</div></section>
  <section><h2>Achievements</h2><div class="grid" id="achievementsGrid">{achievements}</div></section>
  <section><h2>Recent transactions <small class="wallet-short">{wallet_compact}</small></h2><div id="transactionList">{transactions}</div></section>
</main>"#,
        wallet = escape(&page.ctx.wallet_address),
        short = escape(&shorten_address(&page.ctx.wallet_address)),
        wallet_compact = escape(&shorten_address_compact(&page.ctx.wallet_address, 4)),
        notices = page.notices.join("\n"),
        points = user.total_points,
        sun = user.sun_balance,
        missions_done = user.total_missions_completed,
        streak = user.streak,
        checkin = checkin_button(page.status),
        missions = page.missions,
        achievements = page.achievements,
        transactions = page.transactions,
    );

    layout("Sunaryum Dashboard", &body)
}

/// Whole-page failure, used when the user itself cannot be loaded
pub fn error_page(err: &DashboardError) -> String {
    let body = format!(
        r#"<main>
  <h1>Sunaryum Airdrop</h1>
  {panel}
  <form method="post" action="/logout"><button type="submit">Use another wallet</button></form>
</main>"#,
        panel = error_panel(err, Retry::Reload)
    );

    layout("Sunaryum Dashboard", &body)
}

pub fn login_page(error: Option<&str>) -> String {
    let error = error
        .map(|e| format!(r#"<div class="error-message"><p>{}</p></div>"#, escape(e)))
        .unwrap_or_default();

    let body = format!(
        r#"<main>
  <h1>Sunaryum Airdrop</h1>
  {error}
  <form method="post" action="/login">
    <label for="wallet_address">Wallet address</label>
    <input id="wallet_address" name="wallet_address" autocomplete="off" required>
    <button type="submit">Connect</button>
  </form>
</main>"#,
        error = error
    );

    layout("Sunaryum Login", &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;
    use std::time::Duration;

    fn ctx() -> UserContext {
        UserContext {
            wallet_address: "0x1234567890abcdef".to_string(),
            user: User {
                id: "u1".to_string(),
                wallet_address: "0x1234567890abcdef".to_string(),
                total_points: 120,
                sun_balance: 5,
                total_missions_completed: 1,
                streak: 3,
                last_checkin: None,
                created_at: None,
                updated_at: None,
            },
        }
    }

    fn status(checked_in_today: bool) -> CheckinStatus {
        CheckinStatus {
            checked_in_today,
            streak: 3,
            next_checkin_in_seconds: 3600,
            next_checkin_label: "1h 0m".to_string(),
        }
    }

    #[test]
    fn test_error_panel_retry_only_when_retryable() {
        let remote = error_panel(
            &DashboardError::Remote("boom".to_string()),
            Retry::Post("/actions/checkin"),
        );
        assert!(remote.contains(r#"action="/actions/checkin""#));
        assert!(remote.contains("Try again"));

        let reload = error_panel(&DashboardError::Timeout(Duration::from_secs(15)), Retry::Reload);
        assert!(reload.contains(r#"href="/""#));

        let done = error_panel(&DashboardError::AlreadyCheckedIn, Retry::Post("/actions/checkin"));
        assert!(!done.contains("Try again"));
        assert!(done.contains("Already checked in today"));
    }

    #[test]
    fn test_dashboard_page_shows_counters_and_checkin_state() {
        let ctx = ctx();
        let open = status(false);
        let html = dashboard_page(&DashboardPage {
            ctx: &ctx,
            status: &open,
            notices: vec![notice("Check-in done")],
            missions: "<p>missions</p>".to_string(),
            achievements: String::new(),
            transactions: String::new(),
        });
        assert!(html.contains("0x1234...cdef"));
        assert!(html.contains(r#"<small class="wallet-short">1234...cdef</small>"#));
        assert!(html.contains(r#"<strong id="totalPoints">120</strong>"#));
        assert!(html.contains("3 days"));
        assert!(html.contains(r#"action="/actions/checkin""#));
        assert!(html.contains("Check-in done"));
        assert!(html.contains("<p>missions</p>"));

        let done = status(true);
        let html = dashboard_page(&DashboardPage {
            ctx: &ctx,
            status: &done,
            notices: Vec::new(),
            missions: String::new(),
            achievements: String::new(),
            transactions: String::new(),
        });
        assert!(html.contains("Next check-in in 1h 0m"));
        assert!(!html.contains(r#"action="/actions/checkin""#));
    }

    #[test]
    fn test_login_page_escapes_error() {
        let html = login_page(Some("<bad>"));
        assert!(html.contains("&lt;bad&gt;"));
        assert!(html.contains(r#"name="wallet_address""#));
        assert!(!login_page(None).contains(r#"class="error-message""#));
    }
}
