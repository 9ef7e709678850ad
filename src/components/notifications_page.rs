//! Notifications Page Component
//!
//! The signed-in user's unread notifications, refreshed on open.

use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::api;
use crate::context::use_app_context;
use crate::funnel::format_date_time;
use crate::models::Notification;
use crate::store::{store_merge_notifications, store_remove_notification, use_app_store, AppStateStoreFields};

#[component]
pub fn NotificationsPage() -> impl IntoView {
    let ctx = use_app_context();
    let app_store = use_app_store();

    let api = ctx.api();
    spawn_local(async move {
        match api::list_notifications(&api).await {
            Ok(fetched) => {
                store_merge_notifications(&app_store, fetched);
            }
            Err(err) => ctx.notify_error(format!("Не удалось загрузить уведомления: {}", err.user_message())),
        }
    });

    view! {
        <div class="entity-page">
            <div class="entity-toolbar">
                <h2>"Ваши уведомления"</h2>
            </div>
            <Show when=move || app_store.notifications().with(Vec::is_empty)>
                <p class="entity-empty">"Нет уведомлений"</p>
            </Show>
            <ul class="notification-list">
                <For
                    each=move || app_store.notifications().get()
                    key=|notification| notification.id
                    children=move |notification| view! { <NotificationRow notification=notification /> }
                />
            </ul>
        </div>
    }
}

#[component]
fn NotificationRow(notification: Notification) -> impl IntoView {
    let ctx = use_app_context();
    let app_store = use_app_store();
    let id = notification.id;
    let (saving, set_saving) = signal(false);

    let mark_read = move |_| {
        set_saving.set(true);
        let api = ctx.api();
        spawn_local(async move {
            match api::mark_notification_read(&api, id).await {
                Ok(()) => store_remove_notification(&app_store, id),
                Err(err) => {
                    let _ = set_saving.try_set(false);
                    ctx.notify_error(format!("Не удалось отметить уведомление: {}", err.user_message()));
                }
            }
        });
    };

    view! {
        <li class="notification-item">
            <strong>{notification.title}</strong>
            {notification.message.map(|text| view! { <p>{text}</p> })}
            {notification.due_date.map(|due| view! { <small>{format_date_time(&due)}</small> })}
            <button class="secondary-btn" disabled=move || saving.get() on:click=mark_read>
                "Отметить прочитанным"
            </button>
        </li>
    }
}
