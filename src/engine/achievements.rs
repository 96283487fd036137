//! Achievement condition checks
//!
//! Pure comparisons of user counters against achievement thresholds.
//! Granting lives in the dashboard flows.

use crate::models::{Achievement, ConditionType, User};

/// User counter selected by a condition type, `None` for unknown types
pub fn counter_for(user: &User, condition: ConditionType) -> Option<i64> {
    match condition {
        ConditionType::Streak => Some(i64::from(user.streak)),
        ConditionType::MissionsCompleted => Some(user.total_missions_completed),
        ConditionType::Points => Some(user.total_points),
        ConditionType::SunBalance => Some(user.sun_balance),
        ConditionType::Unknown => None,
    }
}

/// Whether the user currently satisfies the achievement's condition
pub fn is_condition_met(user: &User, achievement: &Achievement) -> bool {
    achievement
        .condition_type
        .and_then(|condition| counter_for(user, condition))
        .is_some_and(|value| value >= achievement.condition_value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: "u1".to_string(),
            wallet_address: "0xabc".to_string(),
            total_points: 120,
            sun_balance: 5,
            total_missions_completed: 3,
            streak: 7,
            last_checkin: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn achievement(id: &str, condition: Option<ConditionType>, value: i64) -> Achievement {
        Achievement {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            icon: None,
            condition_type: condition,
            condition_value: value,
            points_reward: 50,
            is_active: true,
        }
    }

    #[test]
    fn test_counter_selection() {
        let u = user();
        assert_eq!(counter_for(&u, ConditionType::Streak), Some(7));
        assert_eq!(counter_for(&u, ConditionType::MissionsCompleted), Some(3));
        assert_eq!(counter_for(&u, ConditionType::Points), Some(120));
        assert_eq!(counter_for(&u, ConditionType::SunBalance), Some(5));
        assert_eq!(counter_for(&u, ConditionType::Unknown), None);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let u = user();
        assert!(is_condition_met(&u, &achievement("p100", Some(ConditionType::Points), 100)));
        assert!(is_condition_met(&u, &achievement("p120", Some(ConditionType::Points), 120)));
        assert!(!is_condition_met(&u, &achievement("p121", Some(ConditionType::Points), 121)));
        assert!(is_condition_met(&u, &achievement("s7", Some(ConditionType::Streak), 7)));
        assert!(!is_condition_met(&u, &achievement("m5", Some(ConditionType::MissionsCompleted), 5)));
    }

    #[test]
    fn test_unknown_and_missing_conditions_never_met() {
        let u = user();
        assert!(!is_condition_met(&u, &achievement("x", Some(ConditionType::Unknown), 0)));
        assert!(!is_condition_met(&u, &achievement("y", None, 0)));
    }
}
