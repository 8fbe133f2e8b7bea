//! Inactivity reminder scheduling.

pub mod scheduler;

pub use scheduler::{ReminderFn, ReminderScheduler};
