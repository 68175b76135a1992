//! Sunleaf API library.
//!
//! HTTP backend for the Sunleaf agricultural store: account registration and
//! login, OTP-based password recovery, and purchase-gated product reviews
//! with synchronous rating aggregates.
//!
//! The binary in `main.rs` wires these modules into an Axum server; the
//! integration test crate drives them over HTTP.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod tokens;
