//! Goal domain entity
//!
//! A savings or progress goal with a target amount.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::aggregate::Aggregate;
use crate::error::DomainError;

const MAX_NAME_LEN: usize = 200;
const MAX_CATEGORY_LEN: usize = 100;

/// A goal tracked by a tenant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub target_amount: f64,
    pub current_amount: f64,
    pub target_date: Option<NaiveDate>,
}

impl Aggregate for Goal {
    const COLLECTION: &'static str = "goals";
}

impl Goal {
    /// Progress towards the target as a percentage, capped at 100
    pub fn percent_complete(&self) -> f64 {
        if self.target_amount <= 0.0 {
            return 0.0;
        }
        let percent = (self.current_amount / self.target_amount * 100.0).min(100.0);
        round2(percent)
    }

    /// Amount still missing to reach the target
    pub fn remaining_amount(&self) -> f64 {
        round2((self.target_amount - self.current_amount).max(0.0))
    }

    pub fn is_completed(&self) -> bool {
        self.current_amount >= self.target_amount
    }

    /// Check field shapes and ranges
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_name(&self.name)?;

        if let Some(category) = &self.category {
            if category.chars().count() > MAX_CATEGORY_LEN {
                return Err(DomainError::Validation(format!(
                    "Category must be at most {} characters",
                    MAX_CATEGORY_LEN
                )));
            }
        }

        if !self.target_amount.is_finite() || self.target_amount <= 0.0 {
            return Err(DomainError::Validation(
                "Target amount must be greater than zero".to_string(),
            ));
        }

        if !self.current_amount.is_finite() || self.current_amount < 0.0 {
            return Err(DomainError::Validation(
                "Current amount must not be negative".to_string(),
            ));
        }

        Ok(())
    }
}

pub(crate) fn validate_name(name: &str) -> Result<(), DomainError> {
    let len = name.trim().chars().count();
    if len == 0 || len > MAX_NAME_LEN {
        return Err(DomainError::Validation(format!(
            "Name must be between 1 and {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(())
}

/// Round to two decimal places
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
