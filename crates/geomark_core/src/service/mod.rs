//! Core use-case services.
//!
//! # Responsibility
//! - Wire location fixes, the movement filter, the evaluator and alert
//!   delivery into one explicitly owned tracker.
//! - Keep UI/FFI layers decoupled from proximity details.

pub mod tracker_service;
