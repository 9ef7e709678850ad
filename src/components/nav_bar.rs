//! Navigation Bar Component
//!
//! Page tabs, the signed-in user and logout.

use leptos::prelude::*;

use crate::context::{use_app_context, Page};
use crate::session;
use crate::store::{use_app_store, AppStateStoreFields};

#[component]
pub fn NavBar() -> impl IntoView {
    let ctx = use_app_context();

    let app_store = use_app_store();
    let pages = move || Page::visible(ctx.is_admin());
    let unread = move || app_store.notifications().with(Vec::len);

    let username = move || {
        ctx.session
            .get()
            .map(|claims| claims.username.unwrap_or_else(|| format!("#{}", claims.sub)))
            .unwrap_or_default()
    };

    let logout = move |_| {
        session::logout(&ctx.api());
        ctx.sign_out();
    };

    view! {
        <nav class="navbar">
            <span class="navbar-brand">"CRM"</span>
            <For
                each=pages
                key=|page| *page
                children=move |page| {
                    let is_active = move || ctx.page.get() == page;
                    view! {
                        <button
                            class=move || if is_active() { "navbar-link active" } else { "navbar-link" }
                            on:click=move |_| ctx.navigate(page)
                        >
                            {page.title()}
                            {(page == Page::Notifications)
                                .then(|| {
                                    view! {
                                        <Show when=move || { unread() > 0 }>
                                            <span class="navbar-badge">{unread}</span>
                                        </Show>
                                    }
                                })}
                        </button>
                    }
                }
            />
            <span class="navbar-spacer"></span>
            <span class="navbar-user">{username}</span>
            <button class="navbar-logout" on:click=logout>"Выйти"</button>
        </nav>
    }
}
