//! Funnel Board Projection
//!
//! Stages in position order, each holding the deals currently in it.
//! Every mutation keeps a column's `count` and `total` in step with its
//! deal list, and a deal is in exactly one column at a time.

use tracing::debug;

use crate::error::BoardError;
use crate::models::{Deal, DealId, Funnel, Stage, StageId, UserId};

/// Fallback stage that receives the deals of a deleted stage
pub const UNSORTED_STAGE_NAME: &str = "Неразобранное";

#[derive(Debug, Clone, PartialEq)]
pub struct StageColumn {
    pub stage: Stage,
    pub deals: Vec<Deal>,
    pub count: usize,
    pub total: f64,
}

impl StageColumn {
    pub fn new(stage: Stage, deals: Vec<Deal>) -> Self {
        let mut column = Self { stage, deals, count: 0, total: 0.0 };
        column.recount();
        column
    }

    fn recount(&mut self) {
        self.count = self.deals.len();
        self.total = self.deals.iter().map(|deal| deal.amount).sum();
    }

    fn position_of(&self, deal_id: DealId) -> Option<usize> {
        self.deals.iter().position(|deal| deal.id == deal_id)
    }
}

/// Everything needed to put a moved deal back
#[derive(Debug, Clone, PartialEq)]
pub struct DealMove {
    pub deal_id: DealId,
    pub from: StageId,
    pub from_index: usize,
    pub to: StageId,
    pub previous_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StageFilter {
    #[default]
    All,
    /// Open stages only
    Active,
    /// Closed (won or lost) stages only
    Closed,
}

impl StageFilter {
    pub fn admits(self, stage: &Stage) -> bool {
        match self {
            Self::All => true,
            Self::Active => !stage.is_closed,
            Self::Closed => stage.is_closed,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoardFilter {
    pub stages: StageFilter,
    pub owner: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunnelBoard {
    pub funnel: Funnel,
    pub columns: Vec<StageColumn>,
}

impl FunnelBoard {
    /// Group deals under their stages. With `owner` set, only that user's
    /// deals are kept. Deals pointing at a stage outside the funnel are dropped.
    pub fn assemble(funnel: Funnel, mut stages: Vec<Stage>, deals: Vec<Deal>, owner: Option<UserId>) -> Self {
        stages.sort_by_key(|stage| stage.position);

        let mut columns: Vec<StageColumn> = stages.into_iter().map(|stage| StageColumn::new(stage, Vec::new())).collect();
        let mut dropped = 0usize;
        for deal in deals {
            if owner.is_some() && deal.owner_id != owner {
                continue;
            }
            let column = deal
                .stage_id
                .and_then(|stage_id| columns.iter_mut().find(|column| column.stage.id == stage_id));
            match column {
                Some(column) => column.deals.push(deal),
                None => dropped += 1,
            }
        }
        for column in &mut columns {
            column.recount();
        }
        if dropped > 0 {
            debug!(dropped, funnel_id = funnel.id, "deals without a known stage left off the board");
        }

        Self { funnel, columns }
    }

    // ========================
    // Lookups
    // ========================

    pub fn stage(&self, stage_id: StageId) -> Option<&Stage> {
        self.column(stage_id).map(|column| &column.stage)
    }

    pub fn column(&self, stage_id: StageId) -> Option<&StageColumn> {
        self.columns.iter().find(|column| column.stage.id == stage_id)
    }

    fn column_index(&self, stage_id: StageId) -> Option<usize> {
        self.columns.iter().position(|column| column.stage.id == stage_id)
    }

    pub fn first_stage(&self) -> Option<&Stage> {
        self.columns.first().map(|column| &column.stage)
    }

    pub fn stages(&self) -> Vec<Stage> {
        self.columns.iter().map(|column| column.stage.clone()).collect()
    }

    /// Stage currently holding the deal
    pub fn stage_of(&self, deal_id: DealId) -> Option<StageId> {
        self.columns
            .iter()
            .find(|column| column.position_of(deal_id).is_some())
            .map(|column| column.stage.id)
    }

    pub fn deal(&self, deal_id: DealId) -> Option<&Deal> {
        self.columns.iter().flat_map(|column| column.deals.iter()).find(|deal| deal.id == deal_id)
    }

    pub fn find_stage_by_name(&self, name: &str) -> Option<&Stage> {
        self.columns.iter().map(|column| &column.stage).find(|stage| stage.name == name)
    }

    pub fn deal_count(&self) -> usize {
        self.columns.iter().map(|column| column.count).sum()
    }

    // ========================
    // Deal mutations
    // ========================

    /// Move a deal to the end of `to`. `Ok(None)` when it is already there.
    pub fn move_deal(&mut self, deal_id: DealId, to: StageId, reason: Option<String>) -> Result<Option<DealMove>, BoardError> {
        let target = self.column_index(to).ok_or(BoardError::StageNotFound(to))?;
        let (source, index) = self
            .columns
            .iter()
            .enumerate()
            .find_map(|(i, column)| column.position_of(deal_id).map(|index| (i, index)))
            .ok_or(BoardError::DealNotFound(deal_id))?;

        if source == target {
            return Ok(None);
        }

        let mut deal = self.columns[source].deals.remove(index);
        let from = self.columns[source].stage.id;
        deal.stage_id = Some(to);
        let previous_reason = match reason {
            Some(reason) => deal.lost_reason.replace(reason),
            None => deal.lost_reason.clone(),
        };
        self.columns[target].deals.push(deal);
        self.columns[source].recount();
        self.columns[target].recount();

        Ok(Some(DealMove { deal_id, from, from_index: index, to, previous_reason }))
    }

    /// Put a moved deal back at its old index in `from`. Does nothing
    /// (returns `false`) if the deal has since left `to` or `from` no
    /// longer exists. Its place inside `to` does not matter.
    pub fn undo_move(&mut self, record: &DealMove) -> bool {
        let (Some(target), Some(source)) = (self.column_index(record.to), self.column_index(record.from)) else {
            return false;
        };
        let Some(index) = self.columns[target].position_of(record.deal_id) else {
            return false;
        };

        let mut deal = self.columns[target].deals.remove(index);
        deal.stage_id = Some(record.from);
        deal.lost_reason = record.previous_reason.clone();
        let slot = record.from_index.min(self.columns[source].deals.len());
        self.columns[source].deals.insert(slot, deal);
        self.columns[source].recount();
        self.columns[target].recount();
        true
    }

    pub fn set_deal_owner(&mut self, deal_id: DealId, owner_id: UserId) -> Result<(), BoardError> {
        let deal = self
            .columns
            .iter_mut()
            .flat_map(|column| column.deals.iter_mut())
            .find(|deal| deal.id == deal_id)
            .ok_or(BoardError::DealNotFound(deal_id))?;
        deal.owner_id = Some(owner_id);
        Ok(())
    }

    // ========================
    // Stage mutations
    // ========================

    /// Append a freshly created stage as an empty column
    pub fn push_stage(&mut self, stage: Stage) {
        self.columns.push(StageColumn::new(stage, Vec::new()));
    }

    pub fn rename_stage(&mut self, stage_id: StageId, name: &str) -> Result<(), BoardError> {
        let index = self.column_index(stage_id).ok_or(BoardError::StageNotFound(stage_id))?;
        self.columns[index].stage.name = name.to_string();
        Ok(())
    }

    /// Move the column at `from` to index `to` and renumber
    pub fn reorder_stages(&mut self, from: usize, to: usize) -> bool {
        if from >= self.columns.len() || to >= self.columns.len() {
            return false;
        }
        let column = self.columns.remove(from);
        self.columns.insert(to, column);
        self.renumber();
        true
    }

    /// 1-based positions in visual order
    pub fn renumber(&mut self) {
        for (index, column) in self.columns.iter_mut().enumerate() {
            column.stage.position = index as i32 + 1;
        }
    }

    /// Remove a column, handing its deals to `unsorted`, and renumber.
    /// Returns the removed column with the deals it held.
    pub fn detach_stage(&mut self, stage_id: StageId, unsorted: Option<StageId>) -> Result<StageColumn, BoardError> {
        let index = self.column_index(stage_id).ok_or(BoardError::StageNotFound(stage_id))?;
        let target = if self.columns[index].deals.is_empty() {
            None
        } else {
            let unsorted = unsorted.filter(|&id| id != stage_id).ok_or(BoardError::StageNotFound(stage_id))?;
            self.column_index(unsorted).ok_or(BoardError::StageNotFound(unsorted))?;
            Some(unsorted)
        };

        let removed = self.columns.remove(index);
        if let Some(unsorted) = target {
            let relocated = removed.deals.iter().cloned().map(|mut deal| {
                deal.stage_id = Some(unsorted);
                deal
            });
            if let Some(column) = self.columns.iter_mut().find(|column| column.stage.id == unsorted) {
                column.deals.extend(relocated);
                column.recount();
            }
        }

        self.renumber();
        Ok(removed)
    }

    /// Undo `detach_stage`: put `removed` back at `index` and pull its
    /// deals out of `unsorted`, but only those still sitting there. Deals
    /// that moved on keep their new stage. Returns the ids brought back.
    pub fn reattach_stage(&mut self, index: usize, removed: StageColumn, unsorted: Option<StageId>) -> Vec<DealId> {
        let StageColumn { stage, deals: detached, .. } = removed;
        let mut returned = Vec::new();
        let mut deals = Vec::with_capacity(detached.len());

        let column = unsorted.and_then(|id| self.column_index(id));
        for original in detached {
            let current = column.and_then(|c| {
                let position = self.columns[c].position_of(original.id)?;
                Some(self.columns[c].deals.remove(position))
            });
            if let Some(mut deal) = current {
                deal.stage_id = Some(stage.id);
                returned.push(deal.id);
                deals.push(deal);
            }
        }
        if let Some(c) = column {
            self.columns[c].recount();
        }

        let slot = index.min(self.columns.len());
        self.columns.insert(slot, StageColumn::new(stage, deals));
        self.renumber();
        returned
    }

    // ========================
    // Views
    // ========================

    /// Derived board for display; the original is untouched
    pub fn filtered(&self, filter: &BoardFilter) -> FunnelBoard {
        let columns = self
            .columns
            .iter()
            .filter(|column| filter.stages.admits(&column.stage))
            .map(|column| {
                let deals = column
                    .deals
                    .iter()
                    .filter(|deal| filter.owner.is_none() || deal.owner_id == filter.owner)
                    .cloned()
                    .collect();
                StageColumn::new(column.stage.clone(), deals)
            })
            .collect();
        FunnelBoard { funnel: self.funnel.clone(), columns }
    }
}
