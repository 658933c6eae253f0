//! Account identity model.
//!
//! Accounts are owned by the identity layer. This service only needs to know
//! who is calling and whether they are staff, so the model is deliberately
//! small: it is what an API key resolves to.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// An account record resolved from an API key.
///
/// # Database Table
///
/// Maps to the `accounts` table, joined through `api_keys` on lookup.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Account {
    /// Unique identifier for this account
    pub id: Uuid,

    /// Login email, unique per account
    pub email: String,

    /// Staff accounts may list every transaction in the system
    pub is_staff: bool,

    /// Inactive accounts fail authentication
    pub is_active: bool,

    /// Timestamp when account was created
    pub created_at: DateTime<Utc>,
}

/// Hash an API key the way it is stored in `api_keys.key_hash`.
///
/// Returns the SHA-256 digest as 64 lowercase hex characters.
pub fn hash_api_key(api_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    hex::encode(hasher.finalize())
}
