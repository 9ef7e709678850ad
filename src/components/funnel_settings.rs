//! Funnel Settings Component
//!
//! Settings mode of the board: stage columns can be dragged into the
//! gaps between them, renamed, deleted and added.

use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_dragdrop::{make_on_mousedown, make_on_mouseleave, make_on_target_mouseenter, DndSignals, DragKind, DropTarget};

use super::funnel_board::BoardStore;
use crate::components::DeleteConfirmButton;
use crate::context::use_app_context;
use crate::funnel::{can_delete_stage, deals_label, BoardState};
use crate::models::{FunnelId, NewStage, Stage};

#[component]
pub fn FunnelSettings(store: BoardStore, state: ReadSignal<BoardState>, dnd: DndSignals) -> impl IntoView {
    let ctx = use_app_context();
    let (new_stage_name, set_new_stage_name) = signal(String::new());

    let current_funnel = move || state.with_untracked(|s| s.board.as_ref().map(|b| b.funnel.id));

    // (stage, deal count) pairs in board order
    let stages = move || {
        state.with(|s| {
            s.board
                .as_ref()
                .map(|b| b.columns.iter().map(|c| (c.stage.clone(), c.count)).collect::<Vec<_>>())
                .unwrap_or_default()
        })
    };

    let add_stage = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();
        let name = new_stage_name.get_untracked();
        let name = name.trim();
        let (false, Some(funnel_id), Some(store)) = (name.is_empty(), current_funnel(), store.try_get_value()) else {
            return;
        };
        let stage = NewStage::open(name);
        spawn_local(async move {
            match store.add_stage(funnel_id, &stage).await {
                Ok(_) => {
                    let _ = set_new_stage_name.try_set(String::new());
                }
                Err(err) => ctx.notify_error(format!("Не удалось создать этап: {}", err.user_message())),
            }
        });
    };

    let save = move |_| {
        let (Some(funnel_id), Some(store)) = (current_funnel(), store.try_get_value()) else {
            return;
        };
        let stages: Vec<Stage> = stages().into_iter().map(|(stage, _)| stage).collect();
        spawn_local(async move {
            match store.save_stage_changes(funnel_id, &stages).await {
                Ok(()) => ctx.notify_info("Этапы сохранены"),
                Err(err) => ctx.notify_error(format!("Не удалось сохранить этапы: {}", err.user_message())),
            }
        });
    };

    let slot = move |index: usize| {
        let target = DropTarget::Slot(index);
        view! {
            <div
                class=move || if dnd.is_target(target) { "stage-slot drop-target" } else { "stage-slot" }
                on:mouseenter=make_on_target_mouseenter(dnd, target)
                on:mouseleave=make_on_mouseleave(dnd)
            ></div>
        }
    };

    let columns = move || {
        let Some(funnel_id) = state.with(|s| s.board.as_ref().map(|b| b.funnel.id)) else {
            return Vec::new();
        };
        let stages = stages();
        let count = stages.len();
        let mut views = Vec::with_capacity(count * 2 + 1);
        for (index, (stage, deals)) in stages.into_iter().enumerate() {
            views.push(slot(index).into_any());
            let column = view! {
                <SettingsColumn store=store funnel_id=funnel_id stage=stage deals=deals dnd=dnd />
            };
            views.push(column.into_any());
        }
        views.push(slot(count).into_any());
        views
    };

    view! {
        <div class="funnel-settings">
            <div class="funnel-board settings">{columns}</div>
            <div class="settings-actions">
                <form class="stage-add-form" on:submit=add_stage>
                    <input
                        type="text"
                        placeholder="Новый этап..."
                        prop:value=move || new_stage_name.get()
                        on:input=move |ev| set_new_stage_name.set(event_target_value(&ev))
                    />
                    <button type="submit">"+"</button>
                </form>
                <button class="primary-btn" on:click=save>"Сохранить"</button>
            </div>
        </div>
    }
}

#[component]
fn SettingsColumn(
    store: BoardStore,
    funnel_id: FunnelId,
    stage: Stage,
    deals: usize,
    dnd: DndSignals,
) -> impl IntoView {
    let ctx = use_app_context();
    let stage_id = stage.id;
    let deletable = can_delete_stage(&stage);

    let is_dragging = move || dnd.dragging(DragKind::Column) == Some(stage_id);

    let rename = move |ev: web_sys::Event| {
        let name = event_target_value(&ev);
        if name.trim().is_empty() {
            return;
        }
        if let Some(Err(err)) = store.try_with_value(|s| s.rename_stage(stage_id, name.trim())) {
            ctx.notify_error(err.user_message());
        }
    };

    let remove = move |_| {
        let Some(store) = store.try_get_value() else {
            return;
        };
        spawn_local(async move {
            match store.remove_stage(funnel_id, stage_id).await {
                Ok(()) => ctx.notify_info("Этап удалён"),
                Err(err) => ctx.notify_error(format!("Не удалось удалить этап: {}", err.user_message())),
            }
        });
    };

    view! {
        <div
            class=move || if is_dragging() { "stage-column settings dragging" } else { "stage-column settings" }
            on:mousedown=make_on_mousedown(dnd, DragKind::Column, stage_id)
        >
            <div class="stage-header">
                <span class="drag-handle">"⋮⋮"</span>
                <input class="stage-name-input" type="text" value=stage.name.clone() on:change=rename />
                {deletable
                    .then(|| {
                        view! {
                            <DeleteConfirmButton
                                button_class="stage-delete-btn"
                                title="Удалить этап"
                                on_confirm=remove
                            />
                        }
                    })}
            </div>
            <div class="stage-meta">
                {deals_label(deals)}
                {stage.is_won_terminal().then_some(" · успешно")}
                {stage.is_lost().then_some(" · проиграно")}
            </div>
        </div>
    }
}
