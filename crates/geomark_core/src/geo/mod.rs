//! Geographic math used by the proximity core.

pub mod distance;
