//! Wire types and REST helpers shared between the taskbell agent and its tests.

pub mod api;
