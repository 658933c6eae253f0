//! HTTP request handlers (route handlers).
//!
//! Each handler extracts request data, calls into `services`, and maps the
//! result to a JSON response.

/// Caller balance endpoint
pub mod balances;
/// Service health endpoint
pub mod health;
/// Transaction endpoints
pub mod transactions;
