//! Application layer
//!
//! The request dispatcher, the tenant-scoped session handed to handlers,
//! and the handlers themselves.

pub mod behaviors;
pub mod crud;
pub mod dispatcher;
pub mod goal_summary;
pub mod resources;
pub mod seed;
pub mod session;

pub use behaviors::LoggingBehavior;
pub use crud::{
    register_crud, require_crud, CreateRecord, DeleteRecord, GetRecord, ListRecords, Paging,
    Resource, UpdateBody, UpdateRecord, Versioned,
};
pub use dispatcher::Dispatcher;
pub use goal_summary::{GoalSummary, GoalSummaryHandler, GoalSummaryQuery};
pub use seed::seed_demo_data;
