//! Goal progress summary
//!
//! A read-only query across all of a tenant's goals.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::dispatcher::{Handler, Request, RequestKind};
use super::session::Session;
use crate::domain::entities::goal::round2;
use crate::domain::entities::Goal;
use crate::error::AppError;

pub struct GoalSummaryQuery;

impl Request for GoalSummaryQuery {
    type Response = GoalSummary;
    const KIND: RequestKind = RequestKind::Query;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalSummary {
    pub total_goals: usize,
    pub completed_goals: usize,
    pub total_target: f64,
    pub total_saved: f64,
    /// Total saved over total target, capped at 100; zero without goals
    pub overall_percent: f64,
}

impl GoalSummary {
    pub fn from_goals<'a>(goals: impl IntoIterator<Item = &'a Goal>) -> Self {
        let mut summary = GoalSummary {
            total_goals: 0,
            completed_goals: 0,
            total_target: 0.0,
            total_saved: 0.0,
            overall_percent: 0.0,
        };

        for goal in goals {
            summary.total_goals += 1;
            if goal.is_completed() {
                summary.completed_goals += 1;
            }
            summary.total_target += goal.target_amount;
            summary.total_saved += goal.current_amount;
        }

        if summary.total_target > 0.0 {
            summary.overall_percent =
                round2((summary.total_saved / summary.total_target * 100.0).min(100.0));
        }
        summary.total_target = round2(summary.total_target);
        summary.total_saved = round2(summary.total_saved);
        summary
    }
}

pub struct GoalSummaryHandler;

#[async_trait]
impl Handler<GoalSummaryQuery> for GoalSummaryHandler {
    async fn handle(
        &self,
        _: &GoalSummaryQuery,
        session: &mut Session,
    ) -> Result<GoalSummary, AppError> {
        let records = session.query::<Goal>().fetch().await?;
        Ok(GoalSummary::from_goals(records.iter().map(|r| r.data())))
    }
}
