//! Trip domain entity
//!
//! A planned or past trip with a date range.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::goal::validate_name;
use crate::domain::aggregate::Aggregate;
use crate::error::DomainError;

const MAX_DESTINATION_LEN: usize = 200;

/// A trip tracked by a tenant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub name: String,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub notes: Option<String>,
}

impl Aggregate for Trip {
    const COLLECTION: &'static str = "trips";
}

impl Trip {
    /// Length of the trip in days, counting both ends
    pub fn duration_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }

    /// Whether the trip starts after `today`
    pub fn is_upcoming(&self, today: NaiveDate) -> bool {
        self.start_date > today
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        validate_name(&self.name)?;

        let destination_len = self.destination.trim().chars().count();
        if destination_len == 0 || destination_len > MAX_DESTINATION_LEN {
            return Err(DomainError::Validation(format!(
                "Destination must be between 1 and {} characters",
                MAX_DESTINATION_LEN
            )));
        }

        if self.end_date < self.start_date {
            return Err(DomainError::Validation(
                "End date must not be before start date".to_string(),
            ));
        }

        Ok(())
    }
}
