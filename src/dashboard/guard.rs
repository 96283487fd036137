//! In-flight tracking for user-initiated mutations
//!
//! Each operation key may run once at a time. A second attempt on a busy
//! key is rejected instead of queued; unrelated keys never block each other.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operation {
    Checkin { user_id: String },
    CompleteMission { user_id: String, mission_id: String },
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Checkin { .. } => write!(f, "Check-in"),
            Self::CompleteMission { mission_id, .. } => write!(f, "Mission {}", mission_id),
        }
    }
}

#[derive(Clone, Default)]
pub struct InFlight {
    active: Arc<Mutex<HashSet<Operation>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    fn active(&self) -> MutexGuard<'_, HashSet<Operation>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Claim `op`, or `None` if it is already running
    pub fn try_begin(&self, op: Operation) -> Option<InFlightGuard> {
        if !self.active().insert(op.clone()) {
            return None;
        }

        Some(InFlightGuard {
            active: Arc::clone(&self.active),
            op,
        })
    }

    pub fn is_active(&self, op: &Operation) -> bool {
        self.active().contains(op)
    }
}

/// Releases its operation key when dropped
pub struct InFlightGuard {
    active: Arc<Mutex<HashSet<Operation>>>,
    op: Operation,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.op);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mission(id: &str) -> Operation {
        Operation::CompleteMission {
            user_id: "u1".to_string(),
            mission_id: id.to_string(),
        }
    }

    #[test]
    fn test_same_key_is_rejected_while_running() {
        let in_flight = InFlight::new();
        let guard = in_flight.try_begin(mission("m1"));
        assert!(guard.is_some());
        assert!(in_flight.is_active(&mission("m1")));
        assert!(in_flight.try_begin(mission("m1")).is_none());

        drop(guard);
        assert!(!in_flight.is_active(&mission("m1")));
        assert!(in_flight.try_begin(mission("m1")).is_some());
    }

    #[test]
    fn test_distinct_keys_run_together() {
        let in_flight = InFlight::new();
        let _a = in_flight.try_begin(mission("m1")).unwrap();
        let _b = in_flight.try_begin(mission("m2")).unwrap();
        let _c = in_flight
            .try_begin(Operation::Checkin {
                user_id: "u1".to_string(),
            })
            .unwrap();
        assert!(in_flight
            .try_begin(Operation::Checkin {
                user_id: "u2".to_string(),
            })
            .is_some());
    }

    #[test]
    fn test_display_names_the_operation() {
        assert_eq!(mission("m9").to_string(), "Mission m9");
        assert_eq!(
            Operation::Checkin {
                user_id: "u".to_string()
            }
            .to_string(),
            "Check-in"
        );
    }
}
