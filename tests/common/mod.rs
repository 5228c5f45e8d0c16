//! Common test utilities and helpers
//!
//! Fakes for the SCM drivers and the credential prompt, plus fixtures that
//! lay out working copies on disk.

#![allow(dead_code)]

pub mod fake_services;
pub mod test_fixtures;
