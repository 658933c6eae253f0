//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They receive repositories as trait objects and never see a connection pool.

pub mod transaction_service;
