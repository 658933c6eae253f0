//! Balance ledger model.
//!
//! A balance holds the usage units an account has bought. Units only ever go
//! up from this service's point of view: the sole writer is payment validation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// Represents a balance record from the database.
///
/// # Database Table
///
/// Maps to the `balances` table. There is normally one row per account; if an
/// account somehow has several, the most recently created one (highest `id`)
/// is the one new transactions are opened against.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Balance {
    pub id: i64,

    /// Account that owns this balance
    pub owner_id: Uuid,

    /// Purchased usage units (hours). Never negative.
    pub units: Decimal,

    pub created_at: DateTime<Utc>,

    /// Touched whenever a validation credits this balance
    pub updated_at: DateTime<Utc>,
}

/// Balance as returned by `GET /api/v1/balance`.
///
/// ```json
/// {
///   "id": 7,
///   "owner_id": "550e8400-e29b-41d4-a716-446655440000",
///   "units": "10.0",
///   "updated_at": "2025-12-21T16:00:00Z"
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub id: i64,
    pub owner_id: Uuid,
    pub units: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl From<Balance> for BalanceResponse {
    fn from(balance: Balance) -> Self {
        Self {
            id: balance.id,
            owner_id: balance.owner_id,
            units: balance.units,
            updated_at: balance.updated_at,
        }
    }
}
