//! Transaction HTTP handlers.
//!
//! This module implements transaction-related API endpoints:
//! - POST /api/v1/transactions/create - Open a pending transaction
//! - PUT /api/v1/transactions/validate/{reference} - Validate a payment
//! - GET /api/v1/transactions/{reference} - Get transaction details
//! - GET /api/v1/transactions - List the caller's transactions
//! - GET /api/v1/transactions/list - List all transactions (staff)

use crate::{
    error::AppError,
    middleware::auth::AuthContext,
    models::transaction::{
        CreateTransactionRequest, Transaction, TransactionFilter, TransactionList,
        TransactionResponse, ValidatedTransactionResponse,
    },
    services::transaction_service,
    state::AppState,
};
use axum::{
    Extension, Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};

/// Open a new transaction for the caller.
///
/// # Request Body
///
/// ```json
/// {
///   "amount": 500000,
///   "payment_channel": "paystack"
/// }
/// ```
///
/// # Response (201)
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
pub async fn create_transaction(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<CreateTransactionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TransactionResponse>), AppError> {
    let Json(request) = payload?;

    let transaction = transaction_service::create_transaction(
        state.transactions.as_ref(),
        state.balances.as_ref(),
        auth.account_id,
        request,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(transaction.into())))
}

/// Validate a payment by reference, crediting the purchased units.
///
/// # Response (200)
///
/// ```json
/// {
///   "id": 1,
///   "amount": "500000.00",
///   "reference": "9f86d081884c7d659a2feaa0c55ad015",
///   "payment_channel": "paystack",
///   "is_active": true,
///   "purchased_units": "10",
///   "status": "success"
/// }
/// ```
///
/// # Errors
///
/// - 404 `transaction_not_found`
/// - 400 `transaction_validated_already` on every call after the first
pub async fn validate_transaction(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<Json<ValidatedTransactionResponse>, AppError> {
    let transaction =
        transaction_service::validate_payment(state.transactions.as_ref(), &reference).await?;

    Ok(Json(transaction.into()))
}

/// Get a transaction by reference.
///
/// The reference itself is the capability: it is unguessable and only
/// handed to the owner and the payment gateway.
pub async fn get_transaction(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<Json<Transaction>, AppError> {
    let transaction =
        transaction_service::get_by_reference(state.transactions.as_ref(), &reference).await?;

    Ok(Json(transaction))
}

/// List the caller's own transactions, newest first.
///
/// ```json
/// { "count": 2, "results": [ { "id": 2, ... }, { "id": 1, ... } ] }
/// ```
pub async fn list_own_transactions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<TransactionList>, AppError> {
    let transactions =
        transaction_service::list_for_owner(state.transactions.as_ref(), auth.account_id).await?;

    Ok(Json(transactions.into()))
}

/// List every transaction, optionally filtered by `id` and `owner_id`.
///
/// Staff only; other callers get 403.
pub async fn list_all_transactions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    filter: Result<Query<TransactionFilter>, QueryRejection>,
) -> Result<Json<TransactionList>, AppError> {
    if !auth.is_staff {
        return Err(AppError::Forbidden);
    }

    let Query(filter) =
        filter.map_err(|rejection| AppError::InvalidRequest(rejection.body_text()))?;

    let transactions = transaction_service::list_all(state.transactions.as_ref(), &filter).await?;

    Ok(Json(transactions.into()))
}
