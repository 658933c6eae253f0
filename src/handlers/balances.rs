//! Balance HTTP handler.

use crate::{
    error::AppError, middleware::auth::AuthContext, models::balance::BalanceResponse,
    services::transaction_service, state::AppState,
};
use axum::{Extension, Json, extract::State};

/// Get the caller's unit balance.
///
/// # Endpoint
///
/// `GET /api/v1/balance`
///
/// # Response
///
/// - **Success (200 OK)**: current balance
/// - **Error (404)**: the caller has no balance record
pub async fn get_balance(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<BalanceResponse>, AppError> {
    let balance = transaction_service::get_balance(state.balances.as_ref(), auth.account_id).await?;

    Ok(Json(balance.into()))
}
