//! Check-in and achievement rules with no I/O

pub mod achievements;
pub mod streak;
