//! Flutter-facing bindings for the geomark proximity core.

pub mod api;
