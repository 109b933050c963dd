//! Proximity decision logic.
//!
//! # Responsibility
//! - Select markers within the proximity threshold of a fix.
//! - Decide whether a new fix moved far enough to re-evaluate.
//!
//! # Invariants
//! - Result order follows input marker order.
//! - Non-finite distances never count as "near" or "moved".

pub mod evaluator;
pub mod movement;
