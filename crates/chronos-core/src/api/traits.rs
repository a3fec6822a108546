use async_trait::async_trait;
use serde_json::Value;

use super::types::{OptimizeRequest, OptimizeResponse, ParseRequest, ParseResponse, ScheduleRequest};
use crate::error::ApiError;

/// The remote planning service.
///
/// Each call is attempted once; retry and fallback policy belongs to the
/// planner. Implementations must be shareable across tasks.
#[async_trait]
pub trait PlannerBackend: Send + Sync {
    /// `POST /api/parse`: extract task records from free text.
    async fn parse(&self, request: &ParseRequest) -> Result<ParseResponse, ApiError>;

    /// `POST /api/optimize`: place task records on the day.
    async fn optimize(&self, request: &OptimizeRequest) -> Result<OptimizeResponse, ApiError>;

    /// `POST /api/schedule`: push a schedule to the calendar. The response
    /// body is only of diagnostic interest.
    async fn schedule(&self, request: &ScheduleRequest) -> Result<Value, ApiError>;
}
