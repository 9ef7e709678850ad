//! Notification Center Component
//!
//! Polls notifications and soon-due tasks while mounted, and shows a
//! toast for the newest unread notification with a mark-read action.

use gloo_timers::future::TimeoutFuture;
use leptos::prelude::*;
use leptos::task::spawn_local;
use tracing::{debug, warn};

use crate::api;
use crate::context::{use_app_context, AppContext, Page};
use crate::error::ApiError;
use crate::notifications::{soon_task_warning, POLL_INTERVAL_MS};
use crate::store::{store_merge_notifications, store_remove_notification, use_app_store, AppStateStoreFields, AppStore};

#[component]
pub fn NotificationCenter() -> impl IntoView {
    let ctx = use_app_context();
    let app_store = use_app_store();
    let (toast_open, set_toast_open) = signal(false);

    // Disposed with the component; the loop stops at its next wake-up
    let alive = StoredValue::new(());
    spawn_local(async move {
        loop {
            if poll_once(ctx, app_store).await {
                let _ = set_toast_open.try_set(true);
            }
            TimeoutFuture::new(POLL_INTERVAL_MS).await;
            if alive.try_get_value().is_none() {
                debug!("notification polling stopped");
                break;
            }
        }
    });

    let newest = move || app_store.notifications().with(|list| list.first().cloned());

    let mark_read = move |notification_id: u32| {
        let api = ctx.api();
        spawn_local(async move {
            match api::mark_notification_read(&api, notification_id).await {
                Ok(()) => {
                    store_remove_notification(&app_store, notification_id);
                    let _ = set_toast_open.try_set(false);
                }
                Err(err) => ctx.notify_error(format!("Не удалось отметить уведомление: {}", err.user_message())),
            }
        });
    };

    move || {
        if !toast_open.get() {
            return None;
        }
        newest().map(|notification| {
            let id = notification.id;
            view! {
                <div class="notification-toast" role="status">
                    <div class="notification-toast-body" on:click=move |_| ctx.navigate(Page::Notifications)>
                        <strong>{notification.title}</strong>
                        {notification.message.map(|text| view! { <p>{text}</p> })}
                    </div>
                    <div class="notification-toast-actions">
                        <button class="primary-btn" on:click=move |_| mark_read(id)>"Прочитано"</button>
                        <button class="notice-close" on:click=move |_| set_toast_open.set(false)>"×"</button>
                    </div>
                </div>
            }
        })
    }
}

/// One round of polling. Returns true when unseen notifications arrived.
async fn poll_once(ctx: AppContext, app_store: AppStore) -> bool {
    let api = ctx.api();
    let fresh = match api::list_notifications(&api).await {
        Ok(fetched) => store_merge_notifications(&app_store, fetched),
        Err(ApiError::Cancelled) => 0,
        Err(err) => {
            warn!(error = %err, "could not load notifications");
            0
        }
    };

    match api::list_soon_tasks(&api).await {
        Ok(tasks) => {
            if let Some(text) = soon_task_warning(&tasks) {
                ctx.notify_warning(text);
            }
        }
        Err(ApiError::Cancelled) => {}
        Err(err) => warn!(error = %err, "could not load tasks due soon"),
    }

    fresh > 0
}
