//! Global Application State Store
//!
//! Directory lists shared between pages, using Leptos reactive_stores
//! for field-level reactivity.

use leptos::prelude::*;
use reactive_stores::Store;

use crate::models::{Account, Contact, Notification, Task, User};
use crate::notifications::merge_notifications;

/// Lists fetched from the backend, cached across page switches
#[derive(Clone, Debug, Default, Store)]
pub struct AppState {
    /// All users (owner picker, assignee names)
    pub users: Vec<User>,
    pub accounts: Vec<Account>,
    pub contacts: Vec<Contact>,
    pub tasks: Vec<Task>,
    /// Unread notifications, newest first
    pub notifications: Vec<Notification>,
}

/// Type alias for the store
pub type AppStore = Store<AppState>;

/// Get the app store from context
pub fn use_app_store() -> AppStore {
    expect_context::<AppStore>()
}

// ========================
// Store Helper Functions
// ========================

pub fn store_add_account(store: &AppStore, account: Account) {
    store.accounts().write().push(account);
}

/// Deleted accounts stay in the list, flagged, until the next fetch
pub fn store_mark_account_deleted(store: &AppStore, account_id: u32) {
    if let Some(account) = store.accounts().write().iter_mut().find(|a| a.account_id == account_id) {
        account.is_deleted = true;
    }
}

pub fn store_add_contact(store: &AppStore, contact: Contact) {
    store.contacts().write().push(contact);
}

pub fn store_remove_contact(store: &AppStore, contact_id: u32) {
    store.contacts().write().retain(|c| c.contact_id != contact_id);
}

pub fn store_add_task(store: &AppStore, task: Task) {
    store.tasks().write().push(task);
}

/// Update a task in the store by ID
pub fn store_update_task(store: &AppStore, updated: Task) {
    if let Some(task) = store.tasks().write().iter_mut().find(|t| t.task_id == updated.task_id) {
        *task = updated;
    }
}

pub fn store_remove_task(store: &AppStore, task_id: u32) {
    store.tasks().write().retain(|t| t.task_id != task_id);
}

/// Returns how many of `fetched` were not known yet
pub fn store_merge_notifications(store: &AppStore, fetched: Vec<Notification>) -> usize {
    merge_notifications(&mut store.notifications().write(), fetched)
}

pub fn store_remove_notification(store: &AppStore, notification_id: u32) {
    store.notifications().write().retain(|n| n.id != notification_id);
}

pub fn store_clear(store: &AppStore) {
    *store.write() = AppState::default();
}
