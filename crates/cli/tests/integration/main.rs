//! CLI integration tests for pinforge.

mod build_tests;
mod common;
mod manifest_tests;
mod plan_tests;
