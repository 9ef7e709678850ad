//! Stage Column Component
//!
//! One board column in view mode: header with count and total, then the
//! deal cards. The column body is a drop target for cards.

use leptos::prelude::*;
use leptos_dragdrop::{make_on_mousedown, make_on_mouseleave, make_on_target_mouseenter, DndSignals, DragKind, DropTarget};

use crate::context::use_app_context;
use crate::directory::user_name;
use crate::funnel::{deals_label, format_amount, format_date, lost_reason_label, StageColumn};
use crate::models::{Deal, DealId, UserId};
use crate::store::{use_app_store, AppStateStoreFields};

#[component]
pub fn StageColumnView(
    column: StageColumn,
    dnd: DndSignals,
    #[prop(into)] on_assign: Callback<(DealId, UserId)>,
) -> impl IntoView {
    let stage = column.stage.clone();
    let target = DropTarget::Column(stage.id);
    let is_target = move || dnd.is_target(target);

    let class = {
        let base = match (stage.is_closed, stage.is_won) {
            (true, true) => "stage-column stage-won",
            (true, false) => "stage-column stage-lost",
            _ => "stage-column",
        };
        move || if is_target() { format!("{base} drop-target") } else { base.to_string() }
    };

    let header_color = stage.color.clone().map(|color| format!("border-top-color: {color}"));

    view! {
        <div
            class=class
            on:mouseenter=make_on_target_mouseenter(dnd, target)
            on:mouseleave=make_on_mouseleave(dnd)
        >
            <div class="stage-header" style=header_color>
                <span class="stage-name">{stage.name.clone()}</span>
                <span class="stage-count">{deals_label(column.count)}</span>
                <span class="stage-total">{format_amount(column.total)}</span>
            </div>
            <div class="stage-cards">
                {column
                    .deals
                    .into_iter()
                    .map(|deal| view! { <DealCard deal=deal dnd=dnd on_assign=on_assign /> })
                    .collect_view()}
            </div>
        </div>
    }
}

#[component]
fn DealCard(deal: Deal, dnd: DndSignals, on_assign: Callback<(DealId, UserId)>) -> impl IntoView {
    let ctx = use_app_context();
    let app_store = use_app_store();
    let deal_id = deal.id;
    let owner_id = deal.owner_id;

    let is_dragging = move || dnd.dragging(DragKind::Card) == Some(deal_id);

    let owner = move || {
        if ctx.is_elevated() {
            view! {
                <select
                    class="deal-owner"
                    on:change=move |ev| {
                        if let Ok(user_id) = event_target_value(&ev).parse() {
                            on_assign.run((deal_id, user_id));
                        }
                    }
                >
                    {app_store
                        .users()
                        .get()
                        .into_iter()
                        .map(|user| {
                            let selected = Some(user.user_id) == owner_id;
                            view! {
                                <option value=user.user_id.to_string() selected=selected>
                                    {user.display_name()}
                                </option>
                            }
                        })
                        .collect_view()}
                </select>
            }
            .into_any()
        } else {
            let name = app_store.users().with(|users| user_name(users, owner_id));
            view! { <span class="deal-owner">{name}</span> }.into_any()
        }
    };

    view! {
        <div
            class=move || if is_dragging() { "deal-card dragging" } else { "deal-card" }
            on:mousedown=make_on_mousedown(dnd, DragKind::Card, deal_id)
        >
            <div class="deal-name">{deal.name.clone()}</div>
            {deal.counterparty().map(|line| view! { <div class="deal-counterparty">{line}</div> })}
            <div class="deal-amount">{format_amount(deal.amount)}</div>
            {deal
                .close_date
                .as_deref()
                .map(|date| view! { <div class="deal-date">{format_date(date)}</div> })}
            {deal
                .lost_reason
                .as_deref()
                .map(|code| view! { <div class="deal-lost-reason">{lost_reason_label(code).to_string()}</div> })}
            {owner}
        </div>
    }
}
