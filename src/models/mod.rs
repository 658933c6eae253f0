//! Data models representing database entities.
//!
//! This module contains all data structures that map to database tables,
//! plus the request/response shapes built from them.

/// Caller identity resolved from an API key
pub mod account;
/// Per-account unit balance
pub mod balance;
/// Unit purchase transactions
pub mod transaction;
