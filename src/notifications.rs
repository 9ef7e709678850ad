//! Notifications
//!
//! Backend notifications and tasks about to fall due, fetched on mount
//! and then every 15 minutes while someone is signed in.

use crate::models::{Notification, Task};

pub const POLL_INTERVAL_MS: u32 = 15 * 60 * 1000;

/// Fetched notifications not already in `known`, in fetched order
pub fn fresh_notifications(known: &[Notification], fetched: Vec<Notification>) -> Vec<Notification> {
    fetched
        .into_iter()
        .filter(|notification| !known.iter().any(|k| k.id == notification.id))
        .collect()
}

/// Put new notifications in front of the known ones. Returns how many were new.
pub fn merge_notifications(known: &mut Vec<Notification>, fetched: Vec<Notification>) -> usize {
    let fresh = fresh_notifications(known, fetched);
    let count = fresh.len();
    if count > 0 {
        known.splice(0..0, fresh);
    }
    count
}

/// Warning for the first task about to fall due
pub fn soon_task_warning(tasks: &[Task]) -> Option<String> {
    tasks.first().map(|task| format!("Задача \"{}\" скоро будет просрочена!", task.title))
}
