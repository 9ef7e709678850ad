//! Accounts Page Component
//!
//! Company list with search, a "mine only" toggle, create and delete.

use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::api;
use crate::components::DeleteConfirmButton;
use crate::context::use_app_context;
use crate::directory::{filter_accounts, user_name};
use crate::error::require;
use crate::models::{non_empty, Account, NewAccount};
use crate::store::{store_add_account, store_mark_account_deleted, use_app_store, AppStateStoreFields};

#[component]
pub fn AccountsPage() -> impl IntoView {
    let ctx = use_app_context();
    let app_store = use_app_store();

    let (query, set_query) = signal(String::new());
    let (only_mine, set_only_mine) = signal(false);
    let (show_form, set_show_form) = signal(false);

    let api = ctx.api();
    spawn_local(async move {
        match api::list_accounts(&api).await {
            Ok(accounts) => app_store.accounts().set(accounts),
            Err(err) => ctx.notify_error(format!("Не удалось загрузить компании: {}", err.user_message())),
        }
    });

    let visible = move || {
        let owner = if only_mine.get() { ctx.session.with(|c| c.as_ref().map(|c| c.sub)) } else { None };
        app_store
            .accounts()
            .with(|accounts| filter_accounts(accounts, &query.get(), owner).into_iter().cloned().collect::<Vec<_>>())
    };

    view! {
        <div class="entity-page">
            <div class="entity-toolbar">
                <h2>"Компании"</h2>
                <input
                    type="search"
                    class="entity-search"
                    placeholder="Поиск по названию, email, телефону"
                    prop:value=move || query.get()
                    on:input=move |ev| set_query.set(event_target_value(&ev))
                />
                <label class="entity-toggle">
                    <input
                        type="checkbox"
                        prop:checked=move || only_mine.get()
                        on:change=move |ev| set_only_mine.set(event_target_checked(&ev))
                    />
                    "Только мои"
                </label>
                <button class="primary-btn" on:click=move |_| set_show_form.update(|v| *v = !*v)>
                    "+ Компания"
                </button>
            </div>

            <Show when=move || show_form.get()>
                <AccountForm on_done=move |_| set_show_form.set(false) />
            </Show>

            <table class="entity-table">
                <thead>
                    <tr>
                        <th>"Название"</th>
                        <th>"Email"</th>
                        <th>"Телефон"</th>
                        <th>"Ответственный"</th>
                        <th></th>
                    </tr>
                </thead>
                <tbody>
                    <For
                        each=visible
                        key=|account| account.account_id
                        children=move |account| view! { <AccountRow account=account /> }
                    />
                </tbody>
            </table>
        </div>
    }
}

#[component]
fn AccountRow(account: Account) -> impl IntoView {
    let ctx = use_app_context();
    let app_store = use_app_store();
    let account_id = account.account_id;
    let owner = app_store.users().with(|users| user_name(users, account.owner_id));

    let delete = move |_| {
        let api = ctx.api();
        spawn_local(async move {
            match api::delete_account(&api, account_id).await {
                Ok(()) => store_mark_account_deleted(&app_store, account_id),
                Err(err) => ctx.notify_error(format!("Не удалось удалить компанию: {}", err.user_message())),
            }
        });
    };

    view! {
        <tr>
            <td>{account.account_name}</td>
            <td>{account.email.unwrap_or_default()}</td>
            <td>{account.phone.unwrap_or_default()}</td>
            <td>{owner}</td>
            <td>
                <DeleteConfirmButton button_class="row-delete-btn" on_confirm=delete />
            </td>
        </tr>
    }
}

#[component]
fn AccountForm(#[prop(into)] on_done: Callback<()>) -> impl IntoView {
    let ctx = use_app_context();
    let app_store = use_app_store();

    let (name, set_name) = signal(String::new());
    let (email, set_email) = signal(String::new());
    let (phone, set_phone) = signal(String::new());
    let (message, set_message) = signal(None::<String>);

    let submit = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();
        let account_name = name.get_untracked();
        if let Err(err) = require("Название", &account_name) {
            set_message.set(Some(err.to_string()));
            return;
        }
        let account = NewAccount {
            account_name: account_name.trim().to_string(),
            email: email.with_untracked(|v| non_empty(v)),
            phone: phone.with_untracked(|v| non_empty(v)),
            owner_id: ctx.viewer().map(|claims| claims.sub),
        };

        let api = ctx.api();
        spawn_local(async move {
            match api::create_account(&api, &account).await {
                Ok(created) => {
                    store_add_account(&app_store, created);
                    on_done.run(());
                }
                Err(err) => {
                    let _ = set_message.try_set(Some(err.user_message()));
                }
            }
        });
    };

    view! {
        <form class="entity-form" on:submit=submit>
            {move || message.get().map(|text| view! { <div class="form-error">{text}</div> })}
            <input
                type="text"
                placeholder="Название"
                prop:value=move || name.get()
                on:input=move |ev| set_name.set(event_target_value(&ev))
            />
            <input
                type="email"
                placeholder="Email"
                prop:value=move || email.get()
                on:input=move |ev| set_email.set(event_target_value(&ev))
            />
            <input
                type="tel"
                placeholder="Телефон"
                prop:value=move || phone.get()
                on:input=move |ev| set_phone.set(event_target_value(&ev))
            />
            <button type="submit" class="primary-btn">"Создать"</button>
        </form>
    }
}
