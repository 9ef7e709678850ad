//! Funnel Endpoints
//!
//! Everything the funnel store needs from the backend, behind a trait so
//! the store can be driven by a fake in tests.

use async_trait::async_trait;

use super::client::ApiClient;
use crate::error::ApiError;
use crate::models::{Claims, Deal, DealId, DealStageChange, Funnel, FunnelId, NewStage, Stage, StageId, StageUpdate};

#[async_trait(?Send)]
pub trait FunnelApi {
    /// Identity of the signed-in user
    fn viewer(&self) -> Result<Claims, ApiError>;

    async fn funnel(&self, funnel_id: FunnelId) -> Result<Funnel, ApiError>;
    async fn shared_funnels(&self) -> Result<Vec<Funnel>, ApiError>;
    async fn stages(&self, funnel_id: FunnelId) -> Result<Vec<Stage>, ApiError>;
    async fn deals(&self, funnel_id: FunnelId) -> Result<Vec<Deal>, ApiError>;

    async fn move_deal(&self, deal_id: DealId, change: &DealStageChange) -> Result<(), ApiError>;

    async fn create_stage(&self, funnel_id: FunnelId, stage: &NewStage) -> Result<Stage, ApiError>;
    async fn update_stages(&self, funnel_id: FunnelId, updates: &[StageUpdate]) -> Result<(), ApiError>;
    async fn delete_stage(&self, funnel_id: FunnelId, stage_id: StageId) -> Result<(), ApiError>;
}

#[async_trait(?Send)]
impl FunnelApi for ApiClient {
    fn viewer(&self) -> Result<Claims, ApiError> {
        self.claims()
    }

    async fn funnel(&self, funnel_id: FunnelId) -> Result<Funnel, ApiError> {
        self.get(&format!("/funnels/{funnel_id}")).await
    }

    async fn shared_funnels(&self) -> Result<Vec<Funnel>, ApiError> {
        self.get("/funnels/shared").await
    }

    async fn stages(&self, funnel_id: FunnelId) -> Result<Vec<Stage>, ApiError> {
        self.get(&format!("/funnels/{funnel_id}/stages")).await
    }

    async fn deals(&self, funnel_id: FunnelId) -> Result<Vec<Deal>, ApiError> {
        self.get(&format!("/opportunities/funnel/{funnel_id}")).await
    }

    async fn move_deal(&self, deal_id: DealId, change: &DealStageChange) -> Result<(), ApiError> {
        self.patch_ok(&format!("/opportunities/{deal_id}/stage"), change).await
    }

    async fn create_stage(&self, funnel_id: FunnelId, stage: &NewStage) -> Result<Stage, ApiError> {
        self.post(&format!("/funnels/{funnel_id}/stages"), stage).await
    }

    async fn update_stages(&self, funnel_id: FunnelId, updates: &[StageUpdate]) -> Result<(), ApiError> {
        self.patch_ok(&format!("/funnels/{funnel_id}/stages"), updates).await
    }

    async fn delete_stage(&self, funnel_id: FunnelId, stage_id: StageId) -> Result<(), ApiError> {
        self.delete(&format!("/funnels/{funnel_id}/stages/{stage_id}")).await
    }
}
