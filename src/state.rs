//! Shared application state.
//!
//! Handlers and middleware receive the repositories through `State<AppState>`.

use std::sync::Arc;

use crate::repositories::{
    AccountRepository, BalanceRepository, InMemoryStore, PgStore, TransactionRepository,
};

#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<dyn AccountRepository>,
    pub balances: Arc<dyn BalanceRepository>,
    pub transactions: Arc<dyn TransactionRepository>,
}

impl AppState {
    /// State backed by Postgres.
    pub fn postgres(store: PgStore) -> Self {
        let store = Arc::new(store);
        Self {
            accounts: store.clone(),
            balances: store.clone(),
            transactions: store,
        }
    }

    /// State backed by the in-process store.
    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            accounts: store.clone(),
            balances: store.clone(),
            transactions: store,
        }
    }
}
