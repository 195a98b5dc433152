//! Test fixtures
//!
//! Factory functions for creating test data with sensible defaults.

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::app::resources::{GoalInput, TripInput};
use crate::domain::entities::Goal;
use crate::domain::tenant::TenantId;

/// The "acme" tenant used throughout the tests
pub fn acme() -> TenantId {
    TenantId(Uuid::from_u128(0xacac_acac_0000_4000_8000_0000_0000_0001))
}

/// A second tenant that must never see acme's data
pub fn other_tenant() -> TenantId {
    TenantId(Uuid::from_u128(0x0707_0707_0000_4000_8000_0000_0000_0002))
}

/// Create a valid, open savings goal
pub fn test_goal(name: &str) -> Goal {
    Goal {
        name: name.to_string(),
        description: None,
        category: Some("savings".to_string()),
        target_amount: 1000.0,
        current_amount: 0.0,
        target_date: None,
    }
}

/// Create goal input with a specific name
pub fn goal_input(name: &str) -> GoalInput {
    GoalInput {
        name: name.to_string(),
        description: None,
        category: Some("savings".to_string()),
        target_amount: 1000.0,
        current_amount: 0.0,
        target_date: None,
    }
}

/// Create input for an upcoming week-long trip
pub fn trip_input(destination: &str) -> TripInput {
    let start = Utc::now().date_naive() + Duration::days(30);
    TripInput {
        name: format!("Trip to {}", destination),
        destination: destination.to_string(),
        start_date: start,
        end_date: start + Duration::days(6),
        notes: None,
    }
}
