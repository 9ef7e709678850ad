//! Funnel Store
//!
//! Owns the board projection for one mounted board. Mutations apply
//! locally and publish first, then confirm with the backend; a failed
//! confirmation is compensated and returned to the caller.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{error, info, instrument, warn};

use super::board::{FunnelBoard, StageColumn, UNSORTED_STAGE_NAME};
use super::gesture::can_delete_stage;
use crate::api::FunnelApi;
use crate::error::BoardError;
use crate::models::{DealId, DealStageChange, FunnelId, NewStage, Stage, StageId, StageUpdate, UserId};

/// What listeners see after every change
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardState {
    pub board: Option<FunnelBoard>,
    pub loading: bool,
    pub last_error: Option<BoardError>,
}

type Listener = Rc<dyn Fn(&BoardState)>;

pub struct FunnelStore<A> {
    inner: Rc<StoreInner<A>>,
}

struct StoreInner<A> {
    api: A,
    state: RefCell<BoardState>,
    listeners: RefCell<Vec<Listener>>,
}

impl<A> Clone for FunnelStore<A> {
    fn clone(&self) -> Self {
        Self { inner: Rc::clone(&self.inner) }
    }
}

impl<A: FunnelApi> FunnelStore<A> {
    pub fn new(api: A) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                api,
                state: RefCell::new(BoardState::default()),
                listeners: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn api(&self) -> &A {
        &self.inner.api
    }

    pub fn state(&self) -> BoardState {
        self.inner.state.borrow().clone()
    }

    pub fn board(&self) -> Option<FunnelBoard> {
        self.inner.state.borrow().board.clone()
    }

    /// Register a listener; it is called on every publish
    pub fn subscribe(&self, listener: impl Fn(&BoardState) + 'static) {
        self.inner.listeners.borrow_mut().push(Rc::new(listener));
    }

    fn publish(&self) {
        let snapshot = self.state();
        let listeners = self.inner.listeners.borrow().clone();
        for listener in listeners {
            listener(&snapshot);
        }
    }

    /// Mutate the state, then publish
    fn update<R>(&self, f: impl FnOnce(&mut BoardState) -> R) -> R {
        let result = f(&mut self.inner.state.borrow_mut());
        self.publish();
        result
    }

    fn with_board<R>(&self, f: impl FnOnce(&mut FunnelBoard) -> Result<R, BoardError>) -> Result<R, BoardError> {
        self.update(|state| state.board.as_mut().ok_or(BoardError::NotLoaded).and_then(f))
    }

    fn fail(&self, err: BoardError) -> BoardError {
        self.update(|state| state.last_error = Some(err.clone()));
        err
    }

    // ========================
    // Loading
    // ========================

    /// Fetch a funnel with its stages and deals. Users without an
    /// elevated role only see their own deals.
    #[instrument(skip(self))]
    pub async fn load(&self, funnel_id: FunnelId) -> Result<(), BoardError> {
        self.update(|state| state.loading = true);

        let api = &self.inner.api;
        let assembled = async {
            let viewer = api.viewer()?;
            let (funnel, stages, deals) =
                futures::try_join!(api.funnel(funnel_id), api.stages(funnel_id), api.deals(funnel_id))?;
            let owner = (!viewer.is_elevated()).then_some(viewer.sub);
            Ok::<_, BoardError>(FunnelBoard::assemble(funnel, stages, deals, owner))
        }
        .await;

        self.finish_load(assembled).map(drop)
    }

    /// Load the first shared funnel, with every deal visible
    #[instrument(skip(self))]
    pub async fn load_shared(&self) -> Result<FunnelId, BoardError> {
        self.update(|state| state.loading = true);

        let api = &self.inner.api;
        let assembled = async {
            let funnel = api.shared_funnels().await?.into_iter().next().ok_or(BoardError::NoSharedFunnel)?;
            let (stages, deals) = futures::try_join!(api.stages(funnel.id), api.deals(funnel.id))?;
            Ok::<_, BoardError>(FunnelBoard::assemble(funnel, stages, deals, None))
        }
        .await;

        self.finish_load(assembled)
    }

    fn finish_load(&self, assembled: Result<FunnelBoard, BoardError>) -> Result<FunnelId, BoardError> {
        match assembled {
            Ok(board) => {
                let funnel_id = board.funnel.id;
                info!(funnel_id, stages = board.columns.len(), deals = board.deal_count(), "funnel loaded");
                self.update(|state| {
                    state.board = Some(board);
                    state.loading = false;
                    state.last_error = None;
                });
                Ok(funnel_id)
            }
            Err(err) => {
                error!(error = %err, "failed to load funnel");
                self.update(|state| {
                    state.loading = false;
                    state.last_error = Some(err.clone());
                });
                Err(err)
            }
        }
    }

    // ========================
    // Deals
    // ========================

    /// Move a deal and persist it. The move is undone if the backend
    /// rejects it and the deal has not moved again since.
    #[instrument(skip(self))]
    pub async fn move_deal(&self, deal_id: DealId, to: StageId, reason: Option<String>) -> Result<(), BoardError> {
        let change = DealStageChange { stage_id: to, lost_reason: reason.clone() };
        let Some(record) = self.with_board(|board| board.move_deal(deal_id, to, reason))? else {
            return Ok(());
        };

        if let Err(err) = self.inner.api.move_deal(deal_id, &change).await {
            warn!(error = %err, deal_id, from = record.from, "deal move rejected, rolling back");
            let undone = self.with_board(|board| Ok(board.undo_move(&record))).unwrap_or(false);
            if !undone {
                warn!(deal_id, "deal moved again before rollback, leaving it in place");
            }
            return Err(self.fail(err.into()));
        }
        Ok(())
    }

    pub fn set_deal_owner(&self, deal_id: DealId, owner_id: UserId) -> Result<(), BoardError> {
        self.with_board(|board| board.set_deal_owner(deal_id, owner_id))
    }

    // ========================
    // Stages
    // ========================

    #[instrument(skip(self, stage), fields(name = %stage.stage_name))]
    pub async fn add_stage(&self, funnel_id: FunnelId, stage: &NewStage) -> Result<Stage, BoardError> {
        let created = self.inner.api.create_stage(funnel_id, stage).await.map_err(|e| self.fail(e.into()))?;
        let _ = self.with_board(|board| {
            if board.funnel.id == funnel_id {
                board.push_stage(created.clone());
            }
            Ok(())
        });
        info!(stage_id = created.id, "stage created");
        Ok(created)
    }

    /// Delete a stage, first moving its deals to the unsorted stage
    /// (created when missing). Nothing is removed unless every deal was
    /// relocated and the delete went through. Closed stages and the
    /// unsorted stage itself are refused.
    #[instrument(skip(self))]
    pub async fn remove_stage(&self, funnel_id: FunnelId, stage_id: StageId) -> Result<(), BoardError> {
        let Some(board) = self.board() else {
            return Err(BoardError::NotLoaded);
        };
        let Some(column) = board.column(stage_id) else {
            return Ok(());
        };
        if !can_delete_stage(&column.stage) {
            return Err(self.fail(BoardError::ProtectedStage(stage_id)));
        }

        let unsorted = if column.deals.is_empty() {
            None
        } else {
            match board.find_stage_by_name(UNSORTED_STAGE_NAME).map(|stage| stage.id) {
                Some(id) => Some(id),
                None => {
                    let payload = NewStage {
                        position: Some(board.columns.len() as i32 + 1),
                        ..NewStage::open(UNSORTED_STAGE_NAME)
                    };
                    Some(self.add_stage(funnel_id, &payload).await?.id)
                }
            }
        };

        let (index, removed) = self.with_board(|board| {
            let index = board.columns.iter().position(|c| c.stage.id == stage_id);
            let removed = board.detach_stage(stage_id, unsorted)?;
            Ok((index.unwrap_or(board.columns.len()), removed))
        })?;
        let detached = removed.deals.iter().map(|deal| deal.id).collect::<Vec<_>>();

        let mut relocated: Vec<DealId> = Vec::with_capacity(detached.len());
        if let Some(unsorted) = unsorted {
            for &deal_id in &detached {
                let change = DealStageChange { stage_id: unsorted, lost_reason: None };
                if let Err(err) = self.inner.api.move_deal(deal_id, &change).await {
                    warn!(error = %err, deal_id, "could not relocate deal, keeping stage");
                    self.restore_stage(index, removed, Some(unsorted), &relocated).await;
                    return Err(self.fail(err.into()));
                }
                relocated.push(deal_id);
            }
        }

        if let Err(err) = self.inner.api.delete_stage(funnel_id, stage_id).await {
            warn!(error = %err, "stage delete rejected, keeping stage");
            self.restore_stage(index, removed, unsorted, &relocated).await;
            return Err(self.fail(err.into()));
        }

        let remaining = self.board().map(|board| board.stages()).unwrap_or_default();
        self.save_stage_positions(funnel_id, &remaining).await?;

        info!(relocated = relocated.len(), "stage removed");
        Ok(())
    }

    /// Put a detached stage back. Only deals still waiting in the unsorted
    /// stage return to it; of those, the ones the backend already moved
    /// are sent back. Deals moved elsewhere meanwhile stay where they are.
    async fn restore_stage(&self, index: usize, removed: StageColumn, unsorted: Option<StageId>, relocated: &[DealId]) {
        let stage_id = removed.stage.id;
        let returned = self
            .with_board(|board| Ok(board.reattach_stage(index, removed, unsorted)))
            .unwrap_or_default();

        for &deal_id in relocated.iter().filter(|id| returned.contains(id)) {
            let change = DealStageChange { stage_id, lost_reason: None };
            if let Err(err) = self.inner.api.move_deal(deal_id, &change).await {
                error!(error = %err, deal_id, "could not move deal back to its stage");
            }
        }
    }

    /// Persist name, position, probability and closed flag of every stage
    #[instrument(skip(self, stages), fields(count = stages.len()))]
    pub async fn save_stage_changes(&self, funnel_id: FunnelId, stages: &[Stage]) -> Result<(), BoardError> {
        let updates: Vec<StageUpdate> = stages.iter().map(StageUpdate::full).collect();
        self.inner
            .api
            .update_stages(funnel_id, &updates)
            .await
            .map_err(|e| self.fail(e.into()))
    }

    #[instrument(skip(self, stages), fields(count = stages.len()))]
    pub async fn save_stage_positions(&self, funnel_id: FunnelId, stages: &[Stage]) -> Result<(), BoardError> {
        let updates: Vec<StageUpdate> = stages.iter().map(StageUpdate::position).collect();
        self.inner
            .api
            .update_stages(funnel_id, &updates)
            .await
            .map_err(|e| self.fail(e.into()))
    }

    /// Replace the columns wholesale
    pub fn update_funnel_stages(&self, columns: Vec<StageColumn>) -> Result<(), BoardError> {
        self.with_board(|board| {
            board.columns = columns;
            Ok(())
        })
    }

    pub fn rename_stage(&self, stage_id: StageId, name: &str) -> Result<(), BoardError> {
        self.with_board(|board| board.rename_stage(stage_id, name))
    }

    /// Settings-mode drag: reorder, renumber, persist the full set
    #[instrument(skip(self))]
    pub async fn reorder_stages(&self, funnel_id: FunnelId, from: usize, to: usize) -> Result<(), BoardError> {
        let stages = self.with_board(|board| Ok(board.reorder_stages(from, to).then(|| board.stages())))?;
        match stages {
            Some(stages) => self.save_stage_changes(funnel_id, &stages).await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::funnel::fixtures::{deal, funnel, stage, terminal_stage};
    use crate::models::{Claims, Deal, Funnel};
    use async_trait::async_trait;
    use std::cell::Cell;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        MoveDeal(DealId, StageId, Option<String>),
        CreateStage(String, Option<i32>),
        UpdateStages(Vec<(StageId, i32)>, bool),
        DeleteStage(StageId),
    }

    struct FakeApi {
        roles: Vec<String>,
        funnel: Funnel,
        stages: Vec<Stage>,
        deals: Vec<Deal>,
        shared: Vec<Funnel>,
        calls: RefCell<Vec<Call>>,
        /// Fail the nth `move_deal` call (0-based)
        fail_move_at: Cell<Option<usize>>,
        moves: Cell<usize>,
        fail_delete: Cell<bool>,
        fail_update: Cell<bool>,
        fail_stages: Cell<bool>,
        /// Suspend once inside each write so concurrent calls interleave
        interleave: Cell<bool>,
    }

    impl FakeApi {
        fn new(roles: &[&str]) -> Self {
            Self {
                roles: roles.iter().map(|r| r.to_string()).collect(),
                funnel: funnel(1),
                stages: vec![stage(2, 2, "Переговоры"), stage(1, 1, "Новая"), terminal_stage(3, 3, "Проиграна", false)],
                deals: vec![
                    deal(10, Some(1), 1000.0, 7),
                    deal(11, Some(1), 300.0, 8),
                    deal(12, Some(2), 50.0, 7),
                ],
                shared: Vec::new(),
                calls: RefCell::new(Vec::new()),
                fail_move_at: Cell::new(None),
                moves: Cell::new(0),
                fail_delete: Cell::new(false),
                fail_update: Cell::new(false),
                fail_stages: Cell::new(false),
                interleave: Cell::new(false),
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.borrow().clone()
        }

        async fn pause(&self) {
            if self.interleave.get() {
                tokio::task::yield_now().await;
            }
        }

        fn rejected() -> ApiError {
            ApiError::Status { status: 500, message: "boom".to_string() }
        }
    }

    #[async_trait(?Send)]
    impl FunnelApi for FakeApi {
        fn viewer(&self) -> Result<Claims, ApiError> {
            Ok(Claims { sub: 7, roles: self.roles.clone(), username: None, exp: None })
        }

        async fn funnel(&self, _funnel_id: FunnelId) -> Result<Funnel, ApiError> {
            Ok(self.funnel.clone())
        }

        async fn shared_funnels(&self) -> Result<Vec<Funnel>, ApiError> {
            Ok(self.shared.clone())
        }

        async fn stages(&self, _funnel_id: FunnelId) -> Result<Vec<Stage>, ApiError> {
            if self.fail_stages.get() {
                return Err(ApiError::Transport("offline".to_string()));
            }
            Ok(self.stages.clone())
        }

        async fn deals(&self, _funnel_id: FunnelId) -> Result<Vec<Deal>, ApiError> {
            Ok(self.deals.clone())
        }

        async fn move_deal(&self, deal_id: DealId, change: &DealStageChange) -> Result<(), ApiError> {
            self.calls.borrow_mut().push(Call::MoveDeal(deal_id, change.stage_id, change.lost_reason.clone()));
            self.pause().await;
            let n = self.moves.get();
            self.moves.set(n + 1);
            if self.fail_move_at.get() == Some(n) {
                return Err(Self::rejected());
            }
            Ok(())
        }

        async fn create_stage(&self, funnel_id: FunnelId, new: &NewStage) -> Result<Stage, ApiError> {
            self.calls.borrow_mut().push(Call::CreateStage(new.stage_name.clone(), new.position));
            Ok(Stage { funnel_id, position: new.position.unwrap_or(99), ..stage(50, 0, &new.stage_name) })
        }

        async fn update_stages(&self, _funnel_id: FunnelId, updates: &[StageUpdate]) -> Result<(), ApiError> {
            let pairs = updates.iter().map(|u| (u.stage_id, u.position)).collect();
            let full = updates.iter().all(|u| u.stage_name.is_some());
            self.calls.borrow_mut().push(Call::UpdateStages(pairs, full));
            if self.fail_update.get() {
                return Err(Self::rejected());
            }
            Ok(())
        }

        async fn delete_stage(&self, _funnel_id: FunnelId, stage_id: StageId) -> Result<(), ApiError> {
            self.calls.borrow_mut().push(Call::DeleteStage(stage_id));
            self.pause().await;
            if self.fail_delete.get() {
                return Err(Self::rejected());
            }
            Ok(())
        }
    }

    async fn loaded(api: FakeApi) -> FunnelStore<FakeApi> {
        let store = FunnelStore::new(api);
        store.load(1).await.unwrap();
        store
    }

    fn deal_ids(store: &FunnelStore<FakeApi>, stage_id: StageId) -> Vec<DealId> {
        let board = store.board().unwrap();
        board.column(stage_id).map(|c| c.deals.iter().map(|d| d.id).collect()).unwrap_or_default()
    }

    #[tokio::test]
    async fn test_load_filters_by_owner_for_plain_users() {
        let store = loaded(FakeApi::new(&["user"])).await;

        let state = store.state();
        assert!(!state.loading);
        assert_eq!(state.last_error, None);
        assert_eq!(deal_ids(&store, 1), vec![10]);
        assert_eq!(deal_ids(&store, 2), vec![12]);
    }

    #[tokio::test]
    async fn test_load_shows_everything_to_managers() {
        let store = loaded(FakeApi::new(&["manager"])).await;
        assert_eq!(deal_ids(&store, 1), vec![10, 11]);
    }

    #[tokio::test]
    async fn test_failed_load_keeps_previous_board() {
        let store = loaded(FakeApi::new(&["admin"])).await;
        let before = store.board();
        store.api().fail_stages.set(true);

        let result = store.load(1).await;

        assert_eq!(result, Err(BoardError::Api(ApiError::Transport("offline".to_string()))));
        let state = store.state();
        assert!(!state.loading);
        assert_eq!(state.board, before);
        assert!(state.last_error.is_some());
    }

    #[tokio::test]
    async fn test_load_shared_requires_a_shared_funnel() {
        let store = FunnelStore::new(FakeApi::new(&["user"]));
        assert_eq!(store.load_shared().await, Err(BoardError::NoSharedFunnel));

        let mut api = FakeApi::new(&["user"]);
        api.shared = vec![Funnel { is_shared: true, ..funnel(4) }];
        let store = FunnelStore::new(api);
        assert_eq!(store.load_shared().await, Ok(4));
        // No owner filter on the shared board
        assert_eq!(deal_ids(&store, 1), vec![10, 11]);
    }

    #[tokio::test]
    async fn test_move_deal_publishes_then_persists() {
        let store = loaded(FakeApi::new(&["admin"])).await;
        let published = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&published);
        store.subscribe(move |state| {
            let board = state.board.as_ref().unwrap();
            sink.borrow_mut().push(board.stage_of(10));
        });

        store.move_deal(10, 3, Some("chose_others".to_string())).await.unwrap();

        assert_eq!(*published.borrow(), vec![Some(3)]);
        assert_eq!(deal_ids(&store, 3), vec![10]);
        assert_eq!(store.api().calls(), vec![Call::MoveDeal(10, 3, Some("chose_others".to_string()))]);
    }

    #[tokio::test]
    async fn test_move_to_same_stage_sends_nothing() {
        let store = loaded(FakeApi::new(&["admin"])).await;
        store.move_deal(10, 1, None).await.unwrap();
        assert!(store.api().calls().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_move_rolls_back() {
        let store = loaded(FakeApi::new(&["admin"])).await;
        let before = store.board();
        store.api().fail_move_at.set(Some(0));

        let result = store.move_deal(10, 2, None).await;

        assert!(matches!(result, Err(BoardError::Api(_))));
        assert_eq!(store.board(), before);
        assert_eq!(deal_ids(&store, 1), vec![10, 11]);
        assert!(store.state().last_error.is_some());
    }

    #[tokio::test]
    async fn test_remove_stage_creates_unsorted_and_relocates() {
        let store = loaded(FakeApi::new(&["admin"])).await;

        store.remove_stage(1, 1).await.unwrap();

        let board = store.board().unwrap();
        assert!(board.stage(1).is_none());
        let unsorted = board.find_stage_by_name(UNSORTED_STAGE_NAME).unwrap();
        assert_eq!(deal_ids(&store, unsorted.id), vec![10, 11]);
        assert_eq!(
            store.api().calls(),
            vec![
                Call::CreateStage(UNSORTED_STAGE_NAME.to_string(), Some(4)),
                Call::MoveDeal(10, 50, None),
                Call::MoveDeal(11, 50, None),
                Call::DeleteStage(1),
                Call::UpdateStages(vec![(2, 1), (3, 2), (50, 3)], false),
            ]
        );
    }

    #[tokio::test]
    async fn test_remove_empty_stage_skips_unsorted() {
        let mut api = FakeApi::new(&["admin"]);
        api.stages.push(stage(4, 4, "Пауза"));
        let store = loaded(api).await;

        store.remove_stage(1, 4).await.unwrap();

        assert_eq!(
            store.api().calls(),
            vec![Call::DeleteStage(4), Call::UpdateStages(vec![(1, 1), (2, 2), (3, 3)], false)]
        );
    }

    #[tokio::test]
    async fn test_remove_stage_refuses_closed_and_unsorted() {
        let mut api = FakeApi::new(&["admin"]);
        api.stages.push(stage(20, 4, UNSORTED_STAGE_NAME));
        api.deals.push(deal(13, Some(20), 70.0, 7));
        let store = loaded(api).await;
        let before = store.board();

        assert_eq!(store.remove_stage(1, 3).await, Err(BoardError::ProtectedStage(3)));
        assert_eq!(store.remove_stage(1, 20).await, Err(BoardError::ProtectedStage(20)));

        assert!(store.api().calls().is_empty());
        assert_eq!(store.board(), before);
        let unsorted = store.board().unwrap().columns.iter().filter(|c| c.stage.name == UNSORTED_STAGE_NAME).count();
        assert_eq!(unsorted, 1);
    }

    #[tokio::test]
    async fn test_remove_stage_reuses_existing_unsorted() {
        let mut api = FakeApi::new(&["admin"]);
        api.stages.push(stage(20, 4, UNSORTED_STAGE_NAME));
        let store = loaded(api).await;

        store.remove_stage(1, 2).await.unwrap();

        assert_eq!(deal_ids(&store, 20), vec![12]);
        assert_eq!(
            store.api().calls(),
            vec![
                Call::MoveDeal(12, 20, None),
                Call::DeleteStage(2),
                Call::UpdateStages(vec![(1, 1), (3, 2), (20, 3)], false),
            ]
        );
    }

    #[tokio::test]
    async fn test_remove_unknown_stage_is_noop() {
        let store = loaded(FakeApi::new(&["admin"])).await;
        store.remove_stage(1, 404).await.unwrap();
        assert!(store.api().calls().is_empty());
    }

    #[tokio::test]
    async fn test_remove_stage_compensates_failed_relocation() {
        let store = loaded(FakeApi::new(&["admin"])).await;
        store.api().fail_move_at.set(Some(1));

        let result = store.remove_stage(1, 1).await;

        assert!(result.is_err());
        assert_eq!(deal_ids(&store, 1), vec![10, 11]);
        let calls = store.api().calls();
        assert!(!calls.contains(&Call::DeleteStage(1)));
        // The deal that did move is sent back
        assert_eq!(calls.last(), Some(&Call::MoveDeal(10, 1, None)));
    }

    #[tokio::test]
    async fn test_remove_stage_keeps_stage_when_delete_fails() {
        let store = loaded(FakeApi::new(&["admin"])).await;
        store.api().fail_delete.set(true);

        assert!(store.remove_stage(1, 2).await.is_err());

        assert_eq!(deal_ids(&store, 2), vec![12]);
        let board = store.board().unwrap();
        let positions: Vec<i32> = board.columns.iter().map(|c| c.stage.position).collect();
        assert_eq!(positions, vec![1, 2, 3, 4]);
        assert!(board.find_stage_by_name(UNSORTED_STAGE_NAME).is_some());
    }

    #[tokio::test]
    async fn test_failed_remove_keeps_concurrent_move() {
        let store = loaded(FakeApi::new(&["admin"])).await;
        store.api().interleave.set(true);
        store.api().fail_delete.set(true);

        let (removed, moved) = tokio::join!(store.remove_stage(1, 1), store.move_deal(12, 3, None));

        assert!(removed.is_err());
        assert_eq!(moved, Ok(()));
        let board = store.board().unwrap();
        assert_eq!(board.stage_of(12), Some(3));
        assert_eq!(deal_ids(&store, 1), vec![10, 11]);
        assert_eq!(deal_ids(&store, 50), Vec::<DealId>::new());
        let order: Vec<StageId> = board.columns.iter().map(|c| c.stage.id).collect();
        assert_eq!(order, vec![1, 2, 3, 50]);
        let calls = store.api().calls();
        assert!(calls.contains(&Call::MoveDeal(12, 3, None)));
        assert!(calls.ends_with(&[Call::MoveDeal(10, 1, None), Call::MoveDeal(11, 1, None)]));
    }

    #[tokio::test]
    async fn test_failed_remove_leaves_deal_moved_out_of_unsorted() {
        let store = loaded(FakeApi::new(&["admin"])).await;
        store.api().interleave.set(true);
        store.api().fail_delete.set(true);

        // Deal 10 reaches the unsorted stage, then the user drags it on
        let (removed, moved) = tokio::join!(store.remove_stage(1, 1), async {
            tokio::task::yield_now().await;
            store.move_deal(10, 2, None).await
        });

        assert!(removed.is_err());
        assert_eq!(moved, Ok(()));
        assert_eq!(store.board().unwrap().stage_of(10), Some(2));
        assert_eq!(deal_ids(&store, 1), vec![11]);
        let calls = store.api().calls();
        assert!(!calls.contains(&Call::MoveDeal(10, 1, None)));
        assert_eq!(calls.last(), Some(&Call::MoveDeal(11, 1, None)));
    }

    #[tokio::test]
    async fn test_reorder_persists_full_stage_set() {
        let store = loaded(FakeApi::new(&["admin"])).await;

        store.reorder_stages(1, 2, 0).await.unwrap();

        assert_eq!(
            store.api().calls(),
            vec![Call::UpdateStages(vec![(3, 1), (1, 2), (2, 3)], true)]
        );
    }

    #[tokio::test]
    async fn test_add_stage_appends_empty_column() {
        let store = loaded(FakeApi::new(&["admin"])).await;

        let created = store.add_stage(1, &NewStage::open("Договор")).await.unwrap();

        let board = store.board().unwrap();
        let last = board.columns.last().unwrap();
        assert_eq!(last.stage.id, created.id);
        assert_eq!(last.count, 0);
    }

    #[tokio::test]
    async fn test_local_edits() {
        let store = loaded(FakeApi::new(&["admin"])).await;
        store.rename_stage(2, "Договор").unwrap();
        store.set_deal_owner(11, 7).unwrap();

        let board = store.board().unwrap();
        assert_eq!(board.stage(2).unwrap().name, "Договор");
        assert_eq!(board.deal(11).unwrap().owner_id, Some(7));

        store.update_funnel_stages(Vec::new()).unwrap();
        assert!(store.board().unwrap().columns.is_empty());
        assert_eq!(FunnelStore::new(FakeApi::new(&[])).rename_stage(1, "x"), Err(BoardError::NotLoaded));
    }
}
