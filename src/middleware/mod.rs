//! HTTP middleware components.
//!
//! Middleware run before route handlers and may short-circuit the request.

/// API key authentication middleware
pub mod auth;
