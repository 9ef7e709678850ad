//! Funnel Board Component
//!
//! Kanban board of one funnel. View mode drags cards between stages;
//! settings mode edits the stages themselves.

use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_dragdrop::{bind_global_mouseup, create_dnd_signals, DragKind, DropTarget};

use crate::api::{self, ApiClient};
use crate::components::{DealForm, FunnelSettings, LostReasonModal, StageColumnView};
use crate::context::{use_app_context, AppContext};
use crate::funnel::{
    card_dropped, column_dropped, BoardFilter, BoardIntent, BoardMode, BoardState, FunnelStore, PendingMove,
    StageFilter,
};
use crate::models::{DealId, FunnelId, UserId};
use crate::store::{use_app_store, AppStateStoreFields};

/// Board store held by the mounted page
pub type BoardStore = StoredValue<FunnelStore<ApiClient>, LocalStorage>;

/// Create a funnel store whose changes land in a signal
pub fn use_board_store(ctx: AppContext) -> (BoardStore, ReadSignal<BoardState>) {
    let store = FunnelStore::new(ctx.api());
    let (state, set_state) = signal(BoardState { loading: true, ..BoardState::default() });
    store.subscribe(move |next| {
        let _ = set_state.try_set(next.clone());
    });
    (StoredValue::new_local(store), state)
}

/// Load the configured funnel, or the first shared one
pub fn load_board(ctx: AppContext, store: BoardStore) {
    let Some(store) = store.try_get_value() else {
        return;
    };
    let configured = ctx.config.with_value(|config| config.funnel_id);
    spawn_local(async move {
        let result = match configured {
            Some(funnel_id) => store.load(funnel_id).await,
            None => store.load_shared().await.map(drop),
        };
        if let Err(err) = result {
            ctx.notify_error(err.user_message());
        }
    });
}

#[component]
pub fn FunnelBoardPage() -> impl IntoView {
    let ctx = use_app_context();
    let app_store = use_app_store();
    let (board_store, state) = use_board_store(ctx);

    let (mode, set_mode) = signal(BoardMode::View);
    let (stage_filter, set_stage_filter) = signal(StageFilter::All);
    let (owner_filter, set_owner_filter) = signal(None::<UserId>);
    let (pending, set_pending) = signal(None::<PendingMove>);
    let (show_deal_form, set_show_deal_form) = signal(false);

    load_board(ctx, board_store);

    let funnel_id = move || state.with(|s| s.board.as_ref().map(|b| b.funnel.id));

    let move_deal = move |deal_id, to, reason: Option<String>| {
        let Some(store) = board_store.try_get_value() else {
            return;
        };
        spawn_local(async move {
            if let Err(err) = store.move_deal(deal_id, to, reason).await {
                ctx.notify_error(format!("Не удалось переместить сделку: {}", err.user_message()));
            }
        });
    };

    let reorder = move |funnel_id: FunnelId, from, to| {
        let Some(store) = board_store.try_get_value() else {
            return;
        };
        spawn_local(async move {
            if let Err(err) = store.reorder_stages(funnel_id, from, to).await {
                ctx.notify_error(format!("Не удалось сохранить порядок этапов: {}", err.user_message()));
            }
        });
    };

    let assign_owner = move |(deal_id, owner_id): (DealId, UserId)| {
        let Some(store) = board_store.try_get_value() else {
            return;
        };
        spawn_local(async move {
            let result = match api::assign_deal_owner(store.api(), deal_id, owner_id).await {
                Ok(_) => store.set_deal_owner(deal_id, owner_id),
                Err(err) => Err(err.into()),
            };
            if let Err(err) = result {
                ctx.notify_error(format!("Не удалось сменить ответственного: {}", err.user_message()));
            }
        });
    };

    let dnd = create_dnd_signals();
    bind_global_mouseup(dnd, move |dragged, target| {
        let (Some(Some(board)), Some(mode)) =
            (state.try_with_untracked(|s| s.board.clone()), mode.try_get_untracked())
        else {
            return;
        };
        let intent = match (dragged.kind, target) {
            (DragKind::Card, DropTarget::Column(stage_id)) => card_dropped(&board, mode, dragged.id, stage_id),
            (DragKind::Column, DropTarget::Slot(slot)) => column_dropped(&board, mode, dragged.id, slot),
            _ => BoardIntent::Ignore,
        };
        match intent {
            BoardIntent::Ignore => {}
            BoardIntent::MoveDeal { deal_id, to } => move_deal(deal_id, to, None),
            BoardIntent::ConfirmLostMove(pending) => {
                let _ = set_pending.try_set(Some(pending));
            }
            BoardIntent::ReorderStages { from, to } => reorder(board.funnel.id, from, to),
        }
    });

    let on_lost_confirm = move |reason: String| {
        if let Some(PendingMove { deal_id, to }) = pending.get_untracked() {
            move_deal(deal_id, to, Some(reason));
        }
        set_pending.set(None);
    };

    // Filtered view of the board; the store itself keeps every loaded deal
    let visible = Memo::new(move |_| {
        let filter = BoardFilter { stages: stage_filter.get(), owner: owner_filter.get() };
        state.with(|s| s.board.as_ref().map(|board| board.filtered(&filter)))
    });

    let columns = move || visible.get().map(|board| board.columns).unwrap_or_default();

    let first_stage = move || visible.with(|b| b.as_ref().and_then(|b| b.first_stage().map(|s| s.id)));

    let owner_picker = move || {
        ctx.is_elevated().then(|| {
            view! {
                <select
                    class="board-owner-filter"
                    on:change=move |ev| set_owner_filter.set(event_target_value(&ev).parse().ok())
                >
                    <option value="">"Все менеджеры"</option>
                    <For
                        each=move || app_store.users().get()
                        key=|user| user.user_id
                        children=move |user| {
                            view! { <option value=user.user_id.to_string()>{user.display_name()}</option> }
                        }
                    />
                </select>
            }
        })
    };

    view! {
        <div class="funnel-page">
            <div class="funnel-toolbar">
                <h2 class="funnel-title">
                    {move || state.with(|s| s.board.as_ref().map(|b| b.funnel.name.clone()).unwrap_or_default())}
                </h2>
                <Show when=move || mode.get() == BoardMode::View>
                    <select
                        class="board-stage-filter"
                        on:change=move |ev| {
                            let filter = match event_target_value(&ev).as_str() {
                                "active" => StageFilter::Active,
                                "closed" => StageFilter::Closed,
                                _ => StageFilter::All,
                            };
                            set_stage_filter.set(filter);
                        }
                    >
                        <option value="all">"Все этапы"</option>
                        <option value="active">"Открытые"</option>
                        <option value="closed">"Закрытые"</option>
                    </select>
                    {owner_picker}
                    <button
                        class="primary-btn"
                        disabled=move || first_stage().is_none()
                        on:click=move |_| set_show_deal_form.set(true)
                    >
                        "+ Новая сделка"
                    </button>
                </Show>
                <button
                    class=move || if mode.get() == BoardMode::Settings { "mode-btn active" } else { "mode-btn" }
                    on:click=move |_| {
                        set_mode.update(|m| {
                            *m = match m {
                                BoardMode::View => BoardMode::Settings,
                                BoardMode::Settings => BoardMode::View,
                            }
                        })
                    }
                >
                    {move || if mode.get() == BoardMode::Settings { "Готово" } else { "Настроить этапы" }}
                </button>
            </div>

            <Show when=move || state.with(|s| s.loading && s.board.is_none())>
                <div class="funnel-loading">"Загрузка…"</div>
            </Show>

            <Show
                when=move || mode.get() == BoardMode::Settings
                fallback=move || {
                    view! {
                        <div class="funnel-board">
                            <For
                                each=columns
                                // Tuple of everything a column renders from
                                key=|column| {
                                    (
                                        column.stage.id,
                                        column.stage.name.clone(),
                                        column.deals.iter().map(|d| (d.id, d.owner_id)).collect::<Vec<_>>(),
                                    )
                                }
                                children=move |column| view! { <StageColumnView column=column dnd=dnd on_assign=assign_owner /> }
                            />
                        </div>
                    }
                }
            >
                <FunnelSettings store=board_store state=state dnd=dnd />
            </Show>

            {move || {
                pending
                    .get()
                    .map(|_| {
                        view! {
                            <LostReasonModal
                                on_confirm=on_lost_confirm
                                on_cancel=move |_| set_pending.set(None)
                            />
                        }
                    })
            }}

            {move || {
                match (show_deal_form.get(), funnel_id(), first_stage()) {
                    (true, Some(funnel_id), Some(stage_id)) => {
                        Some(
                            view! {
                                <DealForm
                                    funnel_id=funnel_id
                                    stage_id=stage_id
                                    on_close=move |_| set_show_deal_form.set(false)
                                    on_created=move |_| {
                                        set_show_deal_form.set(false);
                                        load_board(ctx, board_store);
                                    }
                                />
                            },
                        )
                    }
                    _ => None,
                }
            }}
        </div>
    }
}
