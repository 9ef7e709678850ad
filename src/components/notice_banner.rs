//! Notice Banner Component
//!
//! Dismissable message strip for failed operations and confirmations.

use leptos::prelude::*;

use crate::context::{use_app_context, NoticeKind};

#[component]
pub fn NoticeBanner() -> impl IntoView {
    let ctx = use_app_context();

    move || {
        ctx.notice.get().map(|notice| {
            let class = match notice.kind {
                NoticeKind::Info => "notice notice-info",
                NoticeKind::Warning => "notice notice-warning",
                NoticeKind::Error => "notice notice-error",
            };
            view! {
                <div class=class role="alert">
                    <span class="notice-text">{notice.text}</span>
                    <button class="notice-close" on:click=move |_| ctx.dismiss_notice()>"×"</button>
                </div>
            }
        })
    }
}
