//! Unit test suite for refscope
//!
//! Cross-module scenarios run against the in-memory repository from
//! `refscope::test_utils`; nothing here needs git or the filesystem.
//!
//! # Running Unit Tests
//!
//! ```bash
//! cargo test --test unit
//! ```
//!
//! # Test Organization
//!
//! - **canonical_urls**: resolve → render → resolve round trips, escaping included
//! - **disclosure**: the request handler's visibility and authkey decisions, and the
//!   caching behind them

mod canonical_urls;
mod disclosure;
