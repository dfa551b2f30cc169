// API crate clippy configuration
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Imagestore API Library
//!
//! This crate contains the API server components for imagestore: account
//! management, session auth, and the image catalog.

pub mod auth;
pub mod config;
pub mod email;
pub mod error;
pub mod objects;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
