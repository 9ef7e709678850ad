//! UI Components
//!
//! Pages and reusable Leptos components.

mod accounts_page;
mod contacts_page;
mod deal_form;
mod delete_confirm_button;
mod funnel_board;
mod funnel_settings;
mod login_form;
mod lost_reason_modal;
mod nav_bar;
mod notice_banner;
mod notification_center;
mod notifications_page;
mod report_page;
mod stage_column;
mod tasks_page;
mod users_page;

pub use accounts_page::AccountsPage;
pub use contacts_page::ContactsPage;
pub use deal_form::DealForm;
pub use delete_confirm_button::DeleteConfirmButton;
pub use funnel_board::FunnelBoardPage;
pub use funnel_settings::FunnelSettings;
pub use login_form::LoginPage;
pub use lost_reason_modal::LostReasonModal;
pub use nav_bar::NavBar;
pub use notice_banner::NoticeBanner;
pub use notification_center::NotificationCenter;
pub use notifications_page::NotificationsPage;
pub use report_page::ReportPage;
pub use stage_column::StageColumnView;
pub use tasks_page::TasksPage;
pub use users_page::UsersPage;
