//! Transaction data models and API request/response types.
//!
//! This module defines:
//! - `Transaction`: a purchase of usage units, pending until validated
//! - `NewTransaction`: the insert form built by the creation service
//! - `CreateTransactionRequest` and `TransactionFilter`: typed inputs
//! - Response projections for create, validate, and detail/list views

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Price of one usage unit, in the payment currency's minor-free units.
pub const UNIT_PRICE: Decimal = Decimal::from_parts(50_000, 0, 0, false, 0);

/// Units bought by paying `amount`.
///
/// Exact decimal division; `500000` buys `10`, `75000` buys `1.5`.
pub fn purchased_units(amount: Decimal) -> Decimal {
    (amount / UNIT_PRICE).normalize()
}

/// Payment status of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Success => "success",
            TransactionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "success" => Ok(TransactionStatus::Success),
            "failed" => Ok(TransactionStatus::Failed),
            other => Err(format!("unknown transaction status '{other}'")),
        }
    }
}

/// Direction of a transaction. Purchases are always credits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Credit,
    Debit,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Credit => "credit",
            TransactionType::Debit => "debit",
        }
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit" => Ok(TransactionType::Credit),
            "debit" => Ok(TransactionType::Debit),
            other => Err(format!("unknown transaction type '{other}'")),
        }
    }
}

/// A payment for usage units.
///
/// Everything except `status`, `is_active` and `updated_at` is fixed at
/// creation. `is_active` flips to `true` exactly once, in the same unit of
/// work that sets `status` to `success` and credits `balance_id`.
#[derive(Debug, Clone, Serialize)]
pub struct Transaction {
    /// Surrogate id, increasing in creation order
    pub id: i64,

    /// Unguessable external key (32 hex chars)
    pub reference: String,

    /// Account that opened the transaction
    pub owner_id: Uuid,

    /// Balance credited on successful validation
    pub balance_id: i64,

    pub transaction_type: TransactionType,

    /// Amount paid
    pub amount: Decimal,

    /// `amount / UNIT_PRICE`, fixed at creation
    pub purchased_units: Decimal,

    pub status: TransactionStatus,

    /// Set once the purchase has been credited to the balance
    pub is_active: bool,

    /// Gateway the payment went through, e.g. "paystack"
    pub payment_channel: Option<String>,

    pub source: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert form of a transaction. Status and activity start at their defaults.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub reference: String,
    pub owner_id: Uuid,
    pub balance_id: i64,
    pub amount: Decimal,
    pub purchased_units: Decimal,
    pub payment_channel: Option<String>,
    pub source: Option<String>,
}

/// Request to open a new transaction.
///
/// # JSON Example
///
/// ```json
/// {
///   "amount": 500000,
///   "payment_channel": "paystack",
///   "source": "web"
/// }
/// ```
///
/// `amount` may be sent as a JSON number or a decimal string.
#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    pub amount: Decimal,

    pub payment_channel: Option<String>,

    pub source: Option<String>,
}

/// Query parameters for the staff listing.
///
/// `GET /api/v1/transactions/list?id=12&owner_id=550e8400-...`
#[derive(Debug, Default, Clone, Deserialize)]
pub struct TransactionFilter {
    pub id: Option<i64>,
    pub owner_id: Option<Uuid>,
}

impl TransactionFilter {
    pub fn matches(&self, transaction: &Transaction) -> bool {
        self.id.is_none_or(|id| transaction.id == id)
            && self.owner_id.is_none_or(|owner| transaction.owner_id == owner)
    }
}

/// Response returned when a transaction is created.
///
/// Owner and balance are internal and not exposed here.
///
/// ```json
/// {
///   "id": 1,
///   "amount": "500000",
///   "reference": "9f86d081884c7d659a2feaa0c55ad015",
///   "payment_channel": "paystack",
///   "purchased_units": "10",
///   "status": "pending"
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub id: i64,
    pub amount: Decimal,
    pub reference: String,
    pub payment_channel: Option<String>,
    pub purchased_units: Decimal,
    pub status: TransactionStatus,
}

impl From<Transaction> for TransactionResponse {
    fn from(transaction: Transaction) -> Self {
        Self {
            id: transaction.id,
            amount: transaction.amount,
            reference: transaction.reference,
            payment_channel: transaction.payment_channel,
            purchased_units: transaction.purchased_units,
            status: transaction.status,
        }
    }
}

/// Response returned by payment validation. Adds `is_active`.
#[derive(Debug, Serialize)]
pub struct ValidatedTransactionResponse {
    pub id: i64,
    pub amount: Decimal,
    pub reference: String,
    pub payment_channel: Option<String>,
    pub is_active: bool,
    pub purchased_units: Decimal,
    pub status: TransactionStatus,
}

impl From<Transaction> for ValidatedTransactionResponse {
    fn from(transaction: Transaction) -> Self {
        Self {
            id: transaction.id,
            amount: transaction.amount,
            reference: transaction.reference,
            payment_channel: transaction.payment_channel,
            is_active: transaction.is_active,
            purchased_units: transaction.purchased_units,
            status: transaction.status,
        }
    }
}

/// Listing envelope.
///
/// Detail and list endpoints expose every field of `Transaction`.
#[derive(Debug, Serialize)]
pub struct TransactionList {
    pub count: usize,
    pub results: Vec<Transaction>,
}

impl From<Vec<Transaction>> for TransactionList {
    fn from(results: Vec<Transaction>) -> Self {
        Self {
            count: results.len(),
            results,
        }
    }
}
