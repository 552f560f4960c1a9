//! Partition selection and ordering
//!
//! Pure functions over partition identifiers: date extraction, eligibility by age and
//! the retirement priority order. Nothing here talks to a collaborator.

pub mod clock;
pub mod priority;
pub mod selector;

pub use clock::{age_days, date_from_index, today};
pub use priority::PriorityPolicy;
pub use selector::EligibilitySelector;
