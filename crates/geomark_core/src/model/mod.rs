//! Domain model for markers and location fixes.
//!
//! # Responsibility
//! - Define the read-only snapshots the proximity core consumes.
//! - Keep coordinate validity rules next to the types they guard.
//!
//! # Invariants
//! - Every marker is identified by a stable numeric `MarkerId`.
//! - Coordinates are WGS-84 degrees.

pub mod location;
pub mod marker;
