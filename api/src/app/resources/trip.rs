//! Trip resource

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::clean_optional;
use crate::app::crud::Resource;
use crate::domain::aggregate::Record;
use crate::domain::entities::Trip;
use crate::error::DomainError;

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Trip as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripDto {
    pub id: Uuid,
    pub name: String,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub notes: Option<String>,
    pub duration_days: i64,
    pub is_upcoming: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Fields a client may set on a trip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripInput {
    pub name: String,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TripFilter {
    /// Case-insensitive substring of the destination
    pub destination: Option<String>,
    pub upcoming: Option<bool>,
}

impl TripFilter {
    fn matches_on(&self, trip: &Trip, today: NaiveDate) -> bool {
        let destination_ok = match self.destination.as_deref().map(str::trim) {
            Some(wanted) if !wanted.is_empty() => trip
                .destination
                .to_lowercase()
                .contains(&wanted.to_lowercase()),
            _ => true,
        };

        let upcoming_ok = self
            .upcoming
            .map_or(true, |upcoming| trip.is_upcoming(today) == upcoming);

        destination_ok && upcoming_ok
    }
}

impl Resource for Trip {
    type Dto = TripDto;
    type Input = TripInput;
    type Filter = TripFilter;

    fn from_input(input: &TripInput) -> Result<Self, DomainError> {
        let trip = Trip {
            name: input.name.trim().to_string(),
            destination: input.destination.trim().to_string(),
            start_date: input.start_date,
            end_date: input.end_date,
            notes: clean_optional(&input.notes),
        };
        trip.validate()?;
        Ok(trip)
    }

    fn apply(&mut self, input: &TripInput) -> Result<(), DomainError> {
        *self = Self::from_input(input)?;
        Ok(())
    }

    fn matches(&self, filter: &TripFilter) -> bool {
        filter.matches_on(self, today())
    }

    fn to_dto(record: &Record<Self>) -> TripDto {
        let trip = record.data();
        TripDto {
            id: record.id().0,
            name: trip.name.clone(),
            destination: trip.destination.clone(),
            start_date: trip.start_date,
            end_date: trip.end_date,
            notes: trip.notes.clone(),
            duration_days: trip.duration_days(),
            is_upcoming: trip.is_upcoming(today()),
            created_at: record.created_at(),
            updated_at: record.updated_at(),
        }
    }
}
