//! Integration test suite for HyPrism
//!
//! End-to-end tests that drive the public API against local mock servers and
//! shell-script stand-ins for the external tools.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **downloads**: progress reporting, cancellation and checksum verification
//! - **install_flow**: patch application against a fake patch tool
//! - **self_update**: helper provisioning and the hand-off to the helper
//! - **cli**: the `hyprism` binary

mod cli;
mod downloads;
mod install_flow;
mod self_update;
