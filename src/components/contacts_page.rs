//! Contacts Page Component

use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::api;
use crate::components::DeleteConfirmButton;
use crate::context::use_app_context;
use crate::directory::filter_contacts;
use crate::error::require;
use crate::models::{non_empty, Contact, NewContact};
use crate::store::{store_add_contact, store_remove_contact, use_app_store, AppStateStoreFields};

#[component]
pub fn ContactsPage() -> impl IntoView {
    let ctx = use_app_context();
    let app_store = use_app_store();

    let (query, set_query) = signal(String::new());
    let (show_form, set_show_form) = signal(false);

    let api = ctx.api();
    spawn_local(async move {
        // Accounts feed the company picker of the form
        let loaded = futures::try_join!(api::list_contacts(&api), api::list_accounts(&api));
        match loaded {
            Ok((contacts, accounts)) => {
                app_store.contacts().set(contacts);
                app_store.accounts().set(accounts);
            }
            Err(err) => ctx.notify_error(format!("Не удалось загрузить контакты: {}", err.user_message())),
        }
    });

    let visible = move || {
        app_store
            .contacts()
            .with(|contacts| filter_contacts(contacts, &query.get()).into_iter().cloned().collect::<Vec<_>>())
    };

    view! {
        <div class="entity-page">
            <div class="entity-toolbar">
                <h2>"Контакты"</h2>
                <input
                    type="search"
                    class="entity-search"
                    placeholder="Поиск по имени, email, телефону, компании"
                    prop:value=move || query.get()
                    on:input=move |ev| set_query.set(event_target_value(&ev))
                />
                <button class="primary-btn" on:click=move |_| set_show_form.update(|v| *v = !*v)>
                    "+ Контакт"
                </button>
            </div>

            <Show when=move || show_form.get()>
                <ContactForm on_done=move |_| set_show_form.set(false) />
            </Show>

            <table class="entity-table">
                <thead>
                    <tr>
                        <th>"Имя"</th>
                        <th>"Email"</th>
                        <th>"Телефон"</th>
                        <th>"Компания"</th>
                        <th></th>
                    </tr>
                </thead>
                <tbody>
                    <For
                        each=visible
                        key=|contact| contact.contact_id
                        children=move |contact| view! { <ContactRow contact=contact /> }
                    />
                </tbody>
            </table>
        </div>
    }
}

#[component]
fn ContactRow(contact: Contact) -> impl IntoView {
    let ctx = use_app_context();
    let app_store = use_app_store();
    let contact_id = contact.contact_id;

    let delete = move |_| {
        let api = ctx.api();
        spawn_local(async move {
            match api::delete_contact(&api, contact_id).await {
                Ok(()) => store_remove_contact(&app_store, contact_id),
                Err(err) => ctx.notify_error(format!("Не удалось удалить контакт: {}", err.user_message())),
            }
        });
    };

    view! {
        <tr>
            <td>{format!("{} {}", contact.first_name, contact.last_name)}</td>
            <td>{contact.email.unwrap_or_default()}</td>
            <td>{contact.phone.unwrap_or_default()}</td>
            <td>{contact.account.map(|a| a.account_name).unwrap_or_default()}</td>
            <td>
                <DeleteConfirmButton button_class="row-delete-btn" on_confirm=delete />
            </td>
        </tr>
    }
}

#[component]
fn ContactForm(#[prop(into)] on_done: Callback<()>) -> impl IntoView {
    let ctx = use_app_context();
    let app_store = use_app_store();

    let form = RwSignal::new(NewContact {
        first_name: String::new(),
        last_name: String::new(),
        email: None,
        phone: None,
        account_id: None,
        owner_id: None,
    });
    let (message, set_message) = signal(None::<String>);

    let submit = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();
        let mut contact = form.get_untracked();
        if let Err(err) = require("Имя", &contact.first_name) {
            set_message.set(Some(err.to_string()));
            return;
        }
        contact.first_name = contact.first_name.trim().to_string();
        contact.last_name = contact.last_name.trim().to_string();
        contact.owner_id = ctx.viewer().map(|claims| claims.sub);

        let api = ctx.api();
        spawn_local(async move {
            match api::create_contact(&api, &contact).await {
                Ok(created) => {
                    store_add_contact(&app_store, created);
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
                placeholder="Имя"
                prop:value=move || form.with(|f| f.first_name.clone())
                on:input=move |ev| form.update(|f| f.first_name = event_target_value(&ev))
            />
            <input
                type="text"
                placeholder="Фамилия"
                prop:value=move || form.with(|f| f.last_name.clone())
                on:input=move |ev| form.update(|f| f.last_name = event_target_value(&ev))
            />
            <input
                type="email"
                placeholder="Email"
                on:input=move |ev| form.update(|f| f.email = non_empty(&event_target_value(&ev)))
            />
            <input
                type="tel"
                placeholder="Телефон"
                on:input=move |ev| form.update(|f| f.phone = non_empty(&event_target_value(&ev)))
            />
            <select on:change=move |ev| form.update(|f| f.account_id = event_target_value(&ev).parse().ok())>
                <option value="">"Без компании"</option>
                <For
                    each=move || {
                        app_store.accounts().with(|accounts| {
                            accounts.iter().filter(|a| !a.is_deleted).cloned().collect::<Vec<_>>()
                        })
                    }
                    key=|account| account.account_id
                    children=move |account| {
                        view! { <option value=account.account_id.to_string()>{account.account_name}</option> }
                    }
                />
            </select>
            <button type="submit" class="primary-btn">"Создать"</button>
        </form>
    }
}
