//! Directory Filters
//!
//! Client-side search over the account, contact and task lists.

use crate::models::{Account, Contact, Task, User, UserId};

/// Case-insensitive substring match against any of `fields`.
/// A blank query matches everything.
pub fn matches_query<'a>(query: &str, fields: impl IntoIterator<Item = Option<&'a str>>) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }
    fields.into_iter().flatten().any(|field| field.to_lowercase().contains(&query))
}

pub fn filter_accounts<'a>(accounts: &'a [Account], query: &str, only_owner: Option<UserId>) -> Vec<&'a Account> {
    accounts
        .iter()
        .filter(|account| !account.is_deleted)
        .filter(|account| only_owner.is_none() || account.owner_id == only_owner)
        .filter(|account| {
            matches_query(
                query,
                [Some(account.account_name.as_str()), account.email.as_deref(), account.phone.as_deref()],
            )
        })
        .collect()
}

pub fn filter_contacts<'a>(contacts: &'a [Contact], query: &str) -> Vec<&'a Contact> {
    contacts
        .iter()
        .filter(|contact| {
            matches_query(
                query,
                [
                    Some(contact.first_name.as_str()),
                    Some(contact.last_name.as_str()),
                    contact.email.as_deref(),
                    contact.phone.as_deref(),
                    contact.account.as_ref().map(|a| a.account_name.as_str()),
                ],
            )
        })
        .collect()
}

pub fn filter_tasks<'a>(tasks: &'a [Task], users: &[User], query: &str) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|task| {
            let assignee = task.assigned_to.and_then(|id| users.iter().find(|u| u.user_id == id));
            matches_query(query, [Some(task.title.as_str()), assignee.map(|u| u.username.as_str())])
        })
        .collect()
}

/// Display name for an id, or a placeholder
pub fn user_name(users: &[User], user_id: Option<UserId>) -> String {
    user_id
        .and_then(|id| users.iter().find(|user| user.user_id == id))
        .map(User::display_name)
        .unwrap_or_else(|| "—".to_string())
}
