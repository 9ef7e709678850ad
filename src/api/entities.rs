//! Entity Endpoints
//!
//! Accounts, contacts, tasks, notifications, users and deal creation.

use serde::Serialize;

use super::client::ApiClient;
use crate::error::ApiError;
use crate::models::{
    Account, Contact, Deal, DealId, NewAccount, NewContact, NewDeal, NewTask, Notification, Task, User, UserId,
};

#[derive(Serialize)]
struct TaskCompletion {
    is_completed: bool,
}

#[derive(Serialize)]
struct OwnerChange {
    owner_id: UserId,
}

// ========================
// Accounts
// ========================

pub async fn list_accounts(api: &ApiClient) -> Result<Vec<Account>, ApiError> {
    api.get("/accounts").await
}

pub async fn create_account(api: &ApiClient, account: &NewAccount) -> Result<Account, ApiError> {
    api.post("/accounts", account).await
}

pub async fn delete_account(api: &ApiClient, account_id: u32) -> Result<(), ApiError> {
    api.delete(&format!("/accounts/{account_id}")).await
}

// ========================
// Contacts
// ========================

pub async fn list_contacts(api: &ApiClient) -> Result<Vec<Contact>, ApiError> {
    api.get("/contacts").await
}

pub async fn create_contact(api: &ApiClient, contact: &NewContact) -> Result<Contact, ApiError> {
    api.post("/contacts", contact).await
}

pub async fn delete_contact(api: &ApiClient, contact_id: u32) -> Result<(), ApiError> {
    api.delete(&format!("/contacts/{contact_id}")).await
}

// ========================
// Tasks
// ========================

pub async fn list_tasks(api: &ApiClient) -> Result<Vec<Task>, ApiError> {
    api.get("/tasks").await
}

pub async fn create_task(api: &ApiClient, task: &NewTask) -> Result<Task, ApiError> {
    api.post("/tasks", task).await
}

pub async fn set_task_completed(api: &ApiClient, task_id: u32, is_completed: bool) -> Result<Task, ApiError> {
    api.patch(&format!("/tasks/{task_id}"), &TaskCompletion { is_completed }).await
}

/// The backend keeps soft-deleted tasks out of `GET /tasks`
pub async fn soft_delete_task(api: &ApiClient, task_id: u32) -> Result<(), ApiError> {
    api.delete(&format!("/tasks/{task_id}/soft")).await
}

/// Open tasks due shortly
pub async fn list_soon_tasks(api: &ApiClient) -> Result<Vec<Task>, ApiError> {
    api.get("/tasks/soon").await
}

// ========================
// Notifications
// ========================

pub async fn list_notifications(api: &ApiClient) -> Result<Vec<Notification>, ApiError> {
    api.get("/notifications").await
}

pub async fn mark_notification_read(api: &ApiClient, notification_id: u32) -> Result<(), ApiError> {
    api.post_ok(&format!("/notifications/{notification_id}/read")).await
}

// ========================
// Users & Deals
// ========================

pub async fn list_users(api: &ApiClient) -> Result<Vec<User>, ApiError> {
    api.get("/users").await
}

pub async fn create_deal(api: &ApiClient, deal: &NewDeal) -> Result<Deal, ApiError> {
    api.post("/opportunities", deal).await
}

/// Hand a deal to another user
pub async fn assign_deal_owner(api: &ApiClient, deal_id: DealId, owner_id: UserId) -> Result<Deal, ApiError> {
    api.patch(&format!("/opportunities/{deal_id}"), &OwnerChange { owner_id }).await
}
