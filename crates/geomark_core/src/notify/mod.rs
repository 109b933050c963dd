//! Alert de-duplication and delivery.
//!
//! # Responsibility
//! - Decide whether a marker may alert again (cool-down per marker id).
//! - Deliver alerts through a primary sink with an in-app fallback.
//!
//! # Invariants
//! - A marker id appears at most once in the active-notification map.
//! - Check-and-record is atomic per marker id.

pub mod alert;
pub mod clock;
pub mod dedup;
