//! CRM Frontend Entry Point

mod api;
mod app;
mod components;
mod config;
mod context;
mod directory;
mod error;
mod funnel;
mod logging;
mod models;
mod notifications;
mod report;
mod session;
mod store;

use app::App;
use config::Config;
use leptos::prelude::*;

fn main() {
    console_error_panic_hook::set_once();

    let config = Config::from_build_env().unwrap_or_else(|err| {
        web_sys::console::error_1(&format!("{err}; falling back to defaults").into());
        Config::default()
    });
    logging::init(config.log_level);

    mount_to_body(move || view! { <App config=config.clone() /> });
}
