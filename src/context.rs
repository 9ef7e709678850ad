//! Application Context
//!
//! Shared state provided via Leptos Context API.

use gloo_timers::future::TimeoutFuture;
use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::api::ApiClient;
use crate::config::Config;
use crate::models::Claims;

/// How long a notice stays up
const NOTICE_TIMEOUT_MS: u32 = 4_000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Page {
    #[default]
    Board,
    Accounts,
    Contacts,
    Tasks,
    Users,
    Report,
    Notifications,
}

impl Page {
    pub const ALL: [Page; 7] = [
        Page::Board,
        Page::Accounts,
        Page::Contacts,
        Page::Tasks,
        Page::Users,
        Page::Report,
        Page::Notifications,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Page::Board => "Воронка",
            Page::Accounts => "Компании",
            Page::Contacts => "Контакты",
            Page::Tasks => "Задачи",
            Page::Users => "Пользователи",
            Page::Report => "Отчёт",
            Page::Notifications => "Уведомления",
        }
    }

    /// Pages hidden from users without the admin role
    pub fn admin_only(self) -> bool {
        matches!(self, Page::Users)
    }

    /// Tabs shown in the nav bar, in order
    pub fn visible(is_admin: bool) -> Vec<Page> {
        Page::ALL.into_iter().filter(|page| is_admin || !page.admin_only()).collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub id: u32,
    pub kind: NoticeKind,
    pub text: String,
}

/// App-wide signals provided via context
#[derive(Clone, Copy)]
pub struct AppContext {
    api: StoredValue<ApiClient, LocalStorage>,
    pub config: StoredValue<Config>,
    /// Signed-in identity - read
    pub session: ReadSignal<Option<Claims>>,
    /// Signed-in identity - write
    set_session: WriteSignal<Option<Claims>>,
    /// Current page - read
    pub page: ReadSignal<Page>,
    /// Current page - write
    set_page: WriteSignal<Page>,
    /// Banner message - read
    pub notice: ReadSignal<Option<Notice>>,
    /// Banner message - write
    set_notice: WriteSignal<Option<Notice>>,
}

impl AppContext {
    pub fn new(api: ApiClient, config: Config, session: Option<Claims>) -> Self {
        let (session, set_session) = signal(session);
        let (page, set_page) = signal(Page::default());
        let (notice, set_notice) = signal(None::<Notice>);
        Self {
            api: StoredValue::new_local(api),
            config: StoredValue::new(config),
            session,
            set_session,
            page,
            set_page,
            notice,
            set_notice,
        }
    }

    pub fn api(&self) -> ApiClient {
        self.api.get_value()
    }

    /// Current identity without tracking
    pub fn viewer(&self) -> Option<Claims> {
        self.session.get_untracked()
    }

    pub fn is_elevated(&self) -> bool {
        self.session.with(|claims| claims.as_ref().is_some_and(Claims::is_elevated))
    }

    pub fn is_admin(&self) -> bool {
        self.session.with(|claims| claims.as_ref().is_some_and(Claims::is_admin))
    }

    pub fn sign_in(&self, claims: Claims) {
        self.set_page.set(Page::Board);
        self.set_session.set(Some(claims));
    }

    /// Drop the identity; also used when the session expires
    pub fn sign_out(&self) {
        let _ = self.set_session.try_set(None);
    }

    pub fn navigate(&self, page: Page) {
        self.set_page.set(page);
    }

    pub fn notify_info(&self, text: impl Into<String>) {
        self.show(NoticeKind::Info, text.into());
    }

    pub fn notify_warning(&self, text: impl Into<String>) {
        self.show(NoticeKind::Warning, text.into());
    }

    pub fn notify_error(&self, text: impl Into<String>) {
        self.show(NoticeKind::Error, text.into());
    }

    pub fn dismiss_notice(&self) {
        self.set_notice.set(None);
    }

    /// Replace the banner and hide it after a delay unless replaced again
    fn show(&self, kind: NoticeKind, text: String) {
        let id = self.notice.get_untracked().map_or(0, |n| n.id.wrapping_add(1));
        self.set_notice.set(Some(Notice { id, kind, text }));

        let notice = self.notice;
        let set_notice = self.set_notice;
        spawn_local(async move {
            TimeoutFuture::new(NOTICE_TIMEOUT_MS).await;
            if notice.try_get_untracked().flatten().is_some_and(|n| n.id == id) {
                let _ = set_notice.try_set(None);
            }
        });
    }
}

pub fn use_app_context() -> AppContext {
    expect_context::<AppContext>()
}
