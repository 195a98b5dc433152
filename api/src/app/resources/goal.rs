//! Goal resource

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::clean_optional;
use crate::app::crud::Resource;
use crate::domain::aggregate::Record;
use crate::domain::entities::Goal;
use crate::error::DomainError;

/// Goal as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalDto {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub target_amount: f64,
    pub current_amount: f64,
    pub target_date: Option<NaiveDate>,
    pub percent_complete: f64,
    pub remaining_amount: f64,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Fields a client may set on a goal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalInput {
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub target_amount: f64,
    #[serde(default)]
    pub current_amount: f64,
    pub target_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    Active,
    Completed,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoalFilter {
    pub status: Option<GoalStatus>,
    pub category: Option<String>,
}

impl Resource for Goal {
    type Dto = GoalDto;
    type Input = GoalInput;
    type Filter = GoalFilter;

    fn from_input(input: &GoalInput) -> Result<Self, DomainError> {
        let goal = Goal {
            name: input.name.trim().to_string(),
            description: clean_optional(&input.description),
            category: clean_optional(&input.category),
            target_amount: input.target_amount,
            current_amount: input.current_amount,
            target_date: input.target_date,
        };
        goal.validate()?;
        Ok(goal)
    }

    fn apply(&mut self, input: &GoalInput) -> Result<(), DomainError> {
        *self = Self::from_input(input)?;
        Ok(())
    }

    fn matches(&self, filter: &GoalFilter) -> bool {
        let status_ok = match filter.status {
            Some(GoalStatus::Active) => !self.is_completed(),
            Some(GoalStatus::Completed) => self.is_completed(),
            None => true,
        };

        let category_ok = match filter.category.as_deref().map(str::trim) {
            Some(wanted) if !wanted.is_empty() => self
                .category
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(wanted)),
            _ => true,
        };

        status_ok && category_ok
    }

    fn to_dto(record: &Record<Self>) -> GoalDto {
        let goal = record.data();
        GoalDto {
            id: record.id().0,
            name: goal.name.clone(),
            description: goal.description.clone(),
            category: goal.category.clone(),
            target_amount: goal.target_amount,
            current_amount: goal.current_amount,
            target_date: goal.target_date,
            percent_complete: goal.percent_complete(),
            remaining_amount: goal.remaining_amount(),
            is_completed: goal.is_completed(),
            created_at: record.created_at(),
            updated_at: record.updated_at(),
        }
    }
}
