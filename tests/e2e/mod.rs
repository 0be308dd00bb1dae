//! End-to-end tests for the servo bridge.
//!
//! Requests go through axum and the connection core into the mock backend.

pub mod http_tests;
pub mod recovery_tests;
