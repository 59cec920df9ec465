//! Integration test suite for refscope
//!
//! These tests build real repositories with the system git binary and exercise the git
//! store, the full request path and the `refscope` binary against them. Each test
//! returns early when git is not installed.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **git_store**: `GitRepository` reads, blame parsing and graph walks
//! - **request_flow**: `RequestHandler` over git-backed repositories
//! - **cli**: the `refscope` binary end to end

#[path = "../common/mod.rs"]
mod common;

mod cli;
mod git_store;
mod request_flow;
