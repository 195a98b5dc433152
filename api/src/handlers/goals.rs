//! Goal handlers
//!
//! Goal endpoints beyond plain CRUD.

use axum::{extract::State, Extension, Json};

use crate::app::{GoalSummary, GoalSummaryQuery};
use crate::domain::tenant::TenantContext;
use crate::error::AppError;
use crate::AppState;

/// GET /goals/summary
///
/// Aggregate progress over all of the tenant's goals.
pub async fn goal_summary(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
) -> Result<Json<GoalSummary>, AppError> {
    let summary = state.dispatcher.send(&tenant, GoalSummaryQuery).await?;
    Ok(Json(summary))
}
