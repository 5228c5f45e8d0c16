//! Application layer: the per-remote services and the run-level use case.

pub mod services;
pub mod use_cases;
