// Shared crate clippy configuration
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Shared infrastructure for the imagestore services.
//!
//! Contains database pool construction, migrations, and the optional
//! request rate limiter. Kept free of any HTTP-framework types so it can
//! be reused by future background workers.

pub mod db;
pub mod rate_limit;

pub use db::{create_pool, run_migrations};
pub use rate_limit::RateLimiter;
