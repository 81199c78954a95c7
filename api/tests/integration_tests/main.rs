//! Integration tests for the Storewatch API.
//!
//! These tests drive the full router, middleware included, and check what
//! operators see through the HTTP surface.

mod common;

mod alerts_tests;
mod archive_tests;
mod health_tests;
mod logs_tests;
mod metrics_tests;
mod traces_tests;
