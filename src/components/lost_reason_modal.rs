//! Lost Reason Modal Component
//!
//! Asks why a deal was lost before it lands in a lost stage.

use leptos::prelude::*;

use crate::funnel::LOST_REASONS;

#[component]
pub fn LostReasonModal(
    #[prop(into)] on_confirm: Callback<String>,
    #[prop(into)] on_cancel: Callback<()>,
) -> impl IntoView {
    let (reason, set_reason) = signal(String::new());

    view! {
        <div class="modal-overlay" on:click=move |_| on_cancel.run(())>
            <div class="modal" on:click=|ev| ev.stop_propagation()>
                <h3>"Причина проигрыша"</h3>
                <select
                    class="modal-select"
                    prop:value=move || reason.get()
                    on:change=move |ev| set_reason.set(event_target_value(&ev))
                >
                    <option value="" disabled=true>"Выберите причину"</option>
                    {LOST_REASONS
                        .iter()
                        .map(|r| view! { <option value=r.code>{r.label}</option> })
                        .collect_view()}
                </select>
                <div class="modal-actions">
                    <button class="cancel-btn" on:click=move |_| on_cancel.run(())>"Отмена"</button>
                    <button
                        class="primary-btn"
                        disabled=move || reason.with(String::is_empty)
                        on:click=move |_| on_confirm.run(reason.get_untracked())
                    >
                        "Подтвердить"
                    </button>
                </div>
            </div>
        </div>
    }
}
