//! Deal Form Component
//!
//! Modal form that opens a new deal in the funnel's first stage.

use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::api;
use crate::context::use_app_context;
use crate::error::require;
use crate::models::{non_empty, FunnelId, NewDeal, StageId};
use crate::store::{use_app_store, AppStateStoreFields};

#[component]
pub fn DealForm(
    funnel_id: FunnelId,
    stage_id: StageId,
    #[prop(into)] on_close: Callback<()>,
    #[prop(into)] on_created: Callback<()>,
) -> impl IntoView {
    let ctx = use_app_context();
    let app_store = use_app_store();

    let (name, set_name) = signal(String::new());
    let (amount, set_amount) = signal(String::new());
    let (close_date, set_close_date) = signal(String::new());
    let (contact_id, set_contact_id) = signal(None::<u32>);
    let (message, set_message) = signal(None::<String>);
    let (submitting, set_submitting) = signal(false);

    if app_store.contacts().with_untracked(Vec::is_empty) {
        let api = ctx.api();
        spawn_local(async move {
            if let Ok(contacts) = api::list_contacts(&api).await {
                let _ = app_store.contacts().try_set(contacts);
            }
        });
    }

    let submit = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();
        let name = name.get_untracked();
        if let Err(err) = require("Название", &name) {
            set_message.set(Some(err.to_string()));
            return;
        }
        let Ok(amount) = amount.with_untracked(|a| if a.trim().is_empty() { Ok(0.0) } else { a.trim().parse::<f64>() })
        else {
            set_message.set(Some("Сумма должна быть числом".to_string()));
            return;
        };

        let deal = NewDeal {
            opportunity_name: name.trim().to_string(),
            amount,
            funnel_id,
            stage_id,
            owner_id: ctx.viewer().map(|claims| claims.sub),
            contact_id: contact_id.get_untracked(),
            close_date: close_date.with_untracked(|d| non_empty(d)),
            is_closed: false,
        };
        set_message.set(None);
        set_submitting.set(true);

        let api = ctx.api();
        spawn_local(async move {
            match api::create_deal(&api, &deal).await {
                Ok(created) => {
                    ctx.notify_info(format!("Сделка «{}» создана", created.name));
                    on_created.run(());
                }
                Err(err) => {
                    let _ = set_message.try_set(Some(err.user_message()));
                }
            }
            let _ = set_submitting.try_set(false);
        });
    };

    view! {
        <div class="modal-overlay" on:click=move |_| on_close.run(())>
            <form class="modal deal-form" on:click=|ev| ev.stop_propagation() on:submit=submit>
                <h3>"Новая сделка"</h3>
                {move || message.get().map(|text| view! { <div class="form-error">{text}</div> })}
                <label>
                    "Название"
                    <input
                        type="text"
                        prop:value=move || name.get()
                        on:input=move |ev| set_name.set(event_target_value(&ev))
                    />
                </label>
                <label>
                    "Сумма, ₽"
                    <input
                        type="number"
                        min="0"
                        prop:value=move || amount.get()
                        on:input=move |ev| set_amount.set(event_target_value(&ev))
                    />
                </label>
                <label>
                    "Дата закрытия"
                    <input
                        type="date"
                        prop:value=move || close_date.get()
                        on:input=move |ev| set_close_date.set(event_target_value(&ev))
                    />
                </label>
                <label>
                    "Контакт"
                    <select on:change=move |ev| set_contact_id.set(event_target_value(&ev).parse().ok())>
                        <option value="">"—"</option>
                        <For
                            each=move || app_store.contacts().get()
                            key=|contact| contact.contact_id
                            children=move |contact| {
                                let label = format!("{} {}", contact.first_name, contact.last_name);
                                view! { <option value=contact.contact_id.to_string()>{label}</option> }
                            }
                        />
                    </select>
                </label>
                <div class="modal-actions">
                    <button type="button" class="cancel-btn" on:click=move |_| on_close.run(())>
                        "Отмена"
                    </button>
                    <button type="submit" class="primary-btn" disabled=move || submitting.get()>
                        "Создать"
                    </button>
                </div>
            </form>
        </div>
    }
}
