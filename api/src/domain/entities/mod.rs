//! Domain entities
//!
//! Pure domain models tracked by the application. Ownership and identity
//! are kept in `Record`, not in the entities themselves.

pub mod goal;
pub mod trip;

pub use goal::Goal;
pub use trip::Trip;
