//! Transaction service - purchase, validation and lookup of unit transactions.
//!
//! This service handles:
//! - Opening pending transactions against the caller's balance
//! - One-shot payment validation with balance crediting
//! - Read-only projections by reference, by owner, and system-wide
//!
//! # Atomicity Guarantees
//!
//! Validation delegates to `TransactionRepository::validate_and_credit`, which
//! flips the transaction and credits the balance in one unit of work. Nothing
//! here reads `is_active` and then writes based on it.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        balance::Balance,
        transaction::{
            CreateTransactionRequest, NewTransaction, Transaction, TransactionFilter,
            TransactionStatus, purchased_units,
        },
    },
    repositories::{BalanceRepository, RepositoryError, TransactionRepository, ValidationOutcome},
};

/// Largest amount accepted, exclusive. Matches the `NUMERIC(10, 2)` column.
const AMOUNT_LIMIT: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 0);

/// Longest accepted `payment_channel` / `source`.
const MAX_TEXT_LEN: usize = 255;

/// Open a pending transaction for `owner_id`.
///
/// # Process
///
/// 1. Validate amount and metadata
/// 2. Resolve the owner's most recent balance
/// 3. Derive purchased units and a fresh random reference
/// 4. Insert with status `pending`, `is_active = false`
///
/// The balance is not touched; units are credited on validation.
///
/// # Errors
///
/// - `InvalidRequest`: amount not positive, too precise, or too large
/// - `BalanceNotFound`: owner has no balance record
/// - `Storage`: storage failure, including a reference collision
pub async fn create_transaction(
    transactions: &dyn TransactionRepository,
    balances: &dyn BalanceRepository,
    owner_id: Uuid,
    request: CreateTransactionRequest,
) -> Result<Transaction, AppError> {
    validate_amount(request.amount)?;
    validate_text("payment_channel", request.payment_channel.as_deref())?;
    validate_text("source", request.source.as_deref())?;

    let balance = balances
        .latest_for_owner(owner_id)
        .await?
        .ok_or(AppError::BalanceNotFound)?;

    let new = NewTransaction {
        reference: generate_reference(),
        owner_id,
        balance_id: balance.id,
        amount: request.amount,
        purchased_units: purchased_units(request.amount),
        payment_channel: request.payment_channel,
        source: request.source,
    };

    let transaction = match transactions.insert(new).await {
        Ok(transaction) => transaction,
        Err(RepositoryError::DuplicateReference(reference)) => {
            // 128 random bits; not retried
            tracing::error!(%reference, %owner_id, "Generated transaction reference collided");
            return Err(RepositoryError::DuplicateReference(reference).into());
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!(
        reference = %transaction.reference,
        %owner_id,
        amount = %transaction.amount,
        purchased_units = %transaction.purchased_units,
        "Transaction created"
    );

    Ok(transaction)
}

/// Validate a payment: mark the transaction successful and credit its balance.
///
/// # Guard
///
/// A transaction that is already active is rejected without any change.
/// The guard is `is_active`, not `status`, so a transaction marked `failed`
/// while still inactive is validated and credited like a pending one.
///
/// # Errors
///
/// - `TransactionNotFound`: no transaction has this reference
/// - `AlreadyValidated`: the transaction was credited before
/// - `Storage`: storage failure; nothing was applied
pub async fn validate_payment(
    transactions: &dyn TransactionRepository,
    reference: &str,
) -> Result<Transaction, AppError> {
    match transactions.validate_and_credit(reference).await? {
        ValidationOutcome::Validated {
            transaction,
            previous_status,
        } => {
            if previous_status == TransactionStatus::Failed {
                tracing::warn!(
                    reference = %transaction.reference,
                    "Validated a transaction previously marked failed"
                );
            }
            tracing::info!(
                reference = %transaction.reference,
                balance_id = transaction.balance_id,
                credited_units = %transaction.purchased_units,
                "Transaction validated and balance credited"
            );
            Ok(transaction)
        }
        ValidationOutcome::AlreadyValidated(transaction) => {
            tracing::info!(
                reference = %transaction.reference,
                "Rejected validation of an already active transaction"
            );
            Err(AppError::AlreadyValidated)
        }
        ValidationOutcome::NotFound => Err(AppError::TransactionNotFound),
    }
}

/// Get a transaction by its reference.
pub async fn get_by_reference(
    transactions: &dyn TransactionRepository,
    reference: &str,
) -> Result<Transaction, AppError> {
    transactions
        .find_by_reference(reference)
        .await?
        .ok_or(AppError::TransactionNotFound)
}

/// The owner's transactions, most recent first.
pub async fn list_for_owner(
    transactions: &dyn TransactionRepository,
    owner_id: Uuid,
) -> Result<Vec<Transaction>, AppError> {
    Ok(transactions.list_for_owner(owner_id).await?)
}

/// Every transaction matching `filter`, most recent first.
///
/// Callers must restrict this to staff.
pub async fn list_all(
    transactions: &dyn TransactionRepository,
    filter: &TransactionFilter,
) -> Result<Vec<Transaction>, AppError> {
    Ok(transactions.list(filter).await?)
}

/// The owner's current balance.
pub async fn get_balance(
    balances: &dyn BalanceRepository,
    owner_id: Uuid,
) -> Result<Balance, AppError> {
    balances
        .latest_for_owner(owner_id)
        .await?
        .ok_or(AppError::BalanceNotFound)
}

/// A new transaction reference: 128 bits from the thread-local CSPRNG, hex encoded.
pub fn generate_reference() -> String {
    let bytes: [u8; 16] = rand::random();
    hex::encode(bytes)
}

fn validate_amount(amount: Decimal) -> Result<(), AppError> {
    if amount <= Decimal::ZERO {
        return Err(AppError::InvalidRequest(
            "Amount must be positive".to_string(),
        ));
    }

    if amount.normalize().scale() > 2 {
        return Err(AppError::InvalidRequest(
            "Amount must have at most 2 decimal places".to_string(),
        ));
    }

    if amount >= AMOUNT_LIMIT {
        return Err(AppError::InvalidRequest(format!(
            "Amount must be less than {AMOUNT_LIMIT}"
        )));
    }

    Ok(())
}

fn validate_text(field: &str, value: Option<&str>) -> Result<(), AppError> {
    match value {
        Some(text) if text.chars().count() > MAX_TEXT_LEN => Err(AppError::InvalidRequest(
            format!("{field} must be at most {MAX_TEXT_LEN} characters"),
        )),
        _ => Ok(()),
    }
}
