//! Client-facing representations of the stored aggregates

pub mod goal;
pub mod trip;

pub use goal::GoalInput;
pub use trip::TripInput;

/// Trim an optional text field, treating blank text as absent
pub(crate) fn clean_optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
