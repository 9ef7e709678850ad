//! CRM Frontend App
//!
//! Main application component: login screen or navigation bar plus the
//! current page.

use leptos::prelude::*;
use leptos::task::spawn_local;
use reactive_stores::Store;
use tracing::{info, warn};

use crate::api::{self, ApiClient, BrowserStorage, ReqwestTransport};
use crate::components::{
    AccountsPage, ContactsPage, FunnelBoardPage, LoginPage, NavBar, NoticeBanner, NotificationCenter,
    NotificationsPage, ReportPage, TasksPage, UsersPage,
};
use crate::config::Config;
use crate::context::{AppContext, Page};
use crate::session;
use crate::store::{store_clear, AppState, AppStateStoreFields};

#[component]
pub fn App(config: Config) -> impl IntoView {
    let api = ApiClient::new(ReqwestTransport::new(&config.api_url), BrowserStorage);
    let restored = session::restore(&api);
    info!(api_url = %config.api_url, signed_in = restored.is_some(), "starting");

    let ctx = AppContext::new(api.clone(), config, restored);
    let store = Store::new(AppState::default());
    provide_context(ctx);
    provide_context(store);

    // A failed token refresh lands here; the client already cleared the tokens
    api.on_session_expired(move || {
        ctx.sign_out();
        ctx.notify_error("Сессия истекла, войдите снова");
    });

    // Users feed the owner picker and assignee names on every page
    Effect::new(move |_| {
        if ctx.session.get().is_none() {
            store_clear(&store);
            return;
        }
        let api = ctx.api();
        spawn_local(async move {
            match api::list_users(&api).await {
                Ok(users) => store.users().set(users),
                Err(err) => warn!(error = %err, "could not load users"),
            }
        });
    });

    let current_page = move || match ctx.page.get() {
        Page::Board => view! { <FunnelBoardPage /> }.into_any(),
        Page::Accounts => view! { <AccountsPage /> }.into_any(),
        Page::Contacts => view! { <ContactsPage /> }.into_any(),
        Page::Tasks => view! { <TasksPage /> }.into_any(),
        Page::Users => view! { <UsersPage /> }.into_any(),
        Page::Report => view! { <ReportPage /> }.into_any(),
        Page::Notifications => view! { <NotificationsPage /> }.into_any(),
    };

    view! {
        <NoticeBanner />
        <Show
            when=move || ctx.session.get().is_some()
            fallback=|| view! { <LoginPage /> }
        >
            <div class="app-layout">
                <NavBar />
                <NotificationCenter />
                <main class="main-content">{current_page}</main>
            </div>
        </Show>
    }
}
