//! Users Page Component
//!
//! Read-only list of backend users. The list itself is fetched once
//! per session by the app shell.

use leptos::prelude::*;

use crate::store::{use_app_store, AppStateStoreFields};

#[component]
pub fn UsersPage() -> impl IntoView {
    let app_store = use_app_store();

    view! {
        <div class="entity-page">
            <div class="entity-toolbar">
                <h2>"Пользователи"</h2>
            </div>
            <table class="entity-table">
                <thead>
                    <tr>
                        <th>"Логин"</th>
                        <th>"Имя"</th>
                        <th>"Email"</th>
                        <th>"Роли"</th>
                    </tr>
                </thead>
                <tbody>
                    <For
                        each=move || app_store.users().get()
                        key=|user| user.user_id
                        children=move |user| {
                            let full_name = format!(
                                "{} {}",
                                user.first_name.unwrap_or_default(),
                                user.last_name.unwrap_or_default(),
                            );
                            view! {
                                <tr>
                                    <td>{user.username}</td>
                                    <td>{full_name.trim().to_string()}</td>
                                    <td>{user.email.unwrap_or_default()}</td>
                                    <td>{user.roles.join(", ")}</td>
                                </tr>
                            }
                        }
                    />
                </tbody>
            </table>
        </div>
    }
}
