//! Flutter-facing bindings for `dayline_core`.

pub mod api;
