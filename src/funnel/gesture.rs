//! Drop Gestures
//!
//! Turns a finished drag on the board into what the store should do.
//! Kept free of the view so the rules can be tested directly.

use tracing::debug;

use super::board::{FunnelBoard, UNSORTED_STAGE_NAME};
use crate::models::{DealId, Stage, StageId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BoardMode {
    /// Cards are draggable between columns
    #[default]
    View,
    /// Columns are draggable, editable and deletable
    Settings,
}

/// A move waiting on the lost-reason dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingMove {
    pub deal_id: DealId,
    pub to: StageId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardIntent {
    Ignore,
    MoveDeal { deal_id: DealId, to: StageId },
    /// Target is a lost stage; ask for a reason first
    ConfirmLostMove(PendingMove),
    ReorderStages { from: usize, to: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LostReason {
    pub code: &'static str,
    pub label: &'static str,
}

pub const LOST_REASONS: [LostReason; 4] = [
    LostReason { code: "too_expensive", label: "Слишком дорого" },
    LostReason { code: "need_disappeared", label: "Пропала потребность" },
    LostReason { code: "unacceptable_conditions", label: "Не устроили условия" },
    LostReason { code: "chose_others", label: "Выбрали других" },
];

pub fn lost_reason_label(code: &str) -> &str {
    LOST_REASONS
        .iter()
        .find(|reason| reason.code == code)
        .map_or(code, |reason| reason.label)
}

/// A card released over a column
pub fn card_dropped(board: &FunnelBoard, mode: BoardMode, deal_id: DealId, target: StageId) -> BoardIntent {
    if mode != BoardMode::View {
        return BoardIntent::Ignore;
    }
    let Some(stage) = board.stage(target) else {
        return BoardIntent::Ignore;
    };
    if board.stage_of(deal_id).map_or(true, |current| current == target) {
        return BoardIntent::Ignore;
    }

    debug!(deal_id, to = target, "card dropped");
    if stage.is_lost() {
        BoardIntent::ConfirmLostMove(PendingMove { deal_id, to: target })
    } else {
        BoardIntent::MoveDeal { deal_id, to: target }
    }
}

/// A column released over slot `slot` in settings mode.
///
/// Slot `i` is the gap before column `i`; slot `len` is after the last one.
pub fn column_dropped(board: &FunnelBoard, mode: BoardMode, stage_id: StageId, slot: usize) -> BoardIntent {
    if mode != BoardMode::Settings {
        return BoardIntent::Ignore;
    }
    let Some(from) = board.columns.iter().position(|column| column.stage.id == stage_id) else {
        return BoardIntent::Ignore;
    };
    // Removing the column first shifts every later gap left by one
    let to = if slot > from { slot - 1 } else { slot };
    let to = to.min(board.columns.len().saturating_sub(1));
    if from == to {
        return BoardIntent::Ignore;
    }

    debug!(stage_id, from, to, "column dropped");
    BoardIntent::ReorderStages { from, to }
}

/// Won and lost stages stay, and so does the stage that collects the
/// deals of deleted ones
pub fn can_delete_stage(stage: &Stage) -> bool {
    !stage.is_closed && stage.name != UNSORTED_STAGE_NAME
}
