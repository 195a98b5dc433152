//! Demo data for the default tenant
//!
//! Each collection is only seeded while it is still empty for the default
//! tenant, so restarting with seeding enabled never duplicates data.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};

use super::crud::Resource;
use super::resources::{GoalInput, TripInput};
use super::session::Session;
use crate::domain::entities::{Goal, Trip};
use crate::domain::ports::DocumentStore;
use crate::domain::tenant::{TenantContext, DEFAULT_TENANT_ID};
use crate::error::DomainError;

/// How many records each collection received
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub goals: usize,
    pub trips: usize,
}

fn demo_goals(today: NaiveDate) -> Vec<GoalInput> {
    vec![
        GoalInput {
            name: "Emergency fund".to_string(),
            description: Some("Three months of expenses".to_string()),
            category: Some("Savings".to_string()),
            target_amount: 10_000.0,
            current_amount: 4_250.0,
            target_date: Some(today + Duration::days(365)),
        },
        GoalInput {
            name: "New bicycle".to_string(),
            description: None,
            category: Some("Hobbies".to_string()),
            target_amount: 1_200.0,
            current_amount: 1_200.0,
            target_date: None,
        },
        GoalInput {
            name: "Run a half marathon".to_string(),
            description: Some("Training fund for race fees and shoes".to_string()),
            category: Some("Health".to_string()),
            target_amount: 400.0,
            current_amount: 120.0,
            target_date: Some(today + Duration::days(120)),
        },
    ]
}

fn demo_trips(today: NaiveDate) -> Vec<TripInput> {
    vec![
        TripInput {
            name: "Summer camping".to_string(),
            destination: "Yosemite National Park".to_string(),
            start_date: today + Duration::days(45),
            end_date: today + Duration::days(50),
            notes: Some("Reserve campsite early".to_string()),
        },
        TripInput {
            name: "City weekend".to_string(),
            destination: "Lisbon, Portugal".to_string(),
            start_date: today - Duration::days(30),
            end_date: today - Duration::days(28),
            notes: None,
        },
    ]
}

/// Seed `R` from `inputs` unless the tenant already has records of it
async fn seed_collection<R: Resource>(
    session: &mut Session,
    inputs: &[R::Input],
) -> Result<usize, DomainError> {
    if session.query::<R>().any().await? {
        tracing::info!(collection = R::COLLECTION, "Collection already has data, skipping seed");
        return Ok(0);
    }

    for input in inputs {
        session.add(R::from_input(input)?)?;
    }
    Ok(inputs.len())
}

/// Populate the default tenant with demo goals and trips
pub async fn seed_demo_data(store: Arc<dyn DocumentStore>) -> Result<SeedReport, DomainError> {
    let today = Utc::now().date_naive();
    let mut session = Session::new(store, TenantContext::new(DEFAULT_TENANT_ID));

    let report = SeedReport {
        goals: seed_collection::<Goal>(&mut session, &demo_goals(today)).await?,
        trips: seed_collection::<Trip>(&mut session, &demo_trips(today)).await?,
    };
    session.save_changes().await?;

    tracing::info!(goals = report.goals, trips = report.trips, "Demo data seeded");
    Ok(report)
}
