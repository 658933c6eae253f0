//! In-process storage.
//!
//! Keeps accounts, balances and transactions behind a single async mutex.
//! Every operation takes the lock for its whole read-decide-write sequence,
//! which gives validation the same one-at-a-time guarantee the row lock gives
//! in Postgres. Used by the test suite and for running without a database.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    AccountRepository, BalanceRepository, RepositoryError, RepositoryResult,
    TransactionRepository, ValidationOutcome,
};
use crate::models::{
    account::{Account, hash_api_key},
    balance::Balance,
    transaction::{
        NewTransaction, Transaction, TransactionFilter, TransactionStatus, TransactionType,
    },
};

#[derive(Default)]
struct Tables {
    accounts: HashMap<Uuid, Account>,
    /// key hash -> account id
    api_keys: HashMap<String, Uuid>,
    balances: Vec<Balance>,
    transactions: Vec<Transaction>,
    next_balance_id: i64,
    next_transaction_id: i64,
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account reachable through `api_key`.
    pub async fn add_account(&self, email: &str, is_staff: bool, api_key: &str) -> Account {
        let account = Account {
            id: Uuid::new_v4(),
            email: email.to_string(),
            is_staff,
            is_active: true,
            created_at: Utc::now(),
        };

        let mut tables = self.tables.lock().await;
        tables.api_keys.insert(hash_api_key(api_key), account.id);
        tables.accounts.insert(account.id, account.clone());
        account
    }

    /// Open a zero balance for `owner_id`.
    pub async fn open_balance(&self, owner_id: Uuid) -> Balance {
        let mut tables = self.tables.lock().await;
        tables.next_balance_id += 1;
        let now = Utc::now();
        let balance = Balance {
            id: tables.next_balance_id,
            owner_id,
            units: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        };
        tables.balances.push(balance.clone());
        balance
    }

    pub async fn balance(&self, balance_id: i64) -> Option<Balance> {
        let tables = self.tables.lock().await;
        tables.balances.iter().find(|b| b.id == balance_id).cloned()
    }

    /// Overwrite a transaction's status without touching `is_active`.
    ///
    /// Stands in for the payment gateway marking a payment failed.
    pub async fn set_status(&self, reference: &str, status: TransactionStatus) -> bool {
        let mut tables = self.tables.lock().await;
        match tables
            .transactions
            .iter_mut()
            .find(|t| t.reference == reference)
        {
            Some(transaction) => {
                transaction.status = status;
                transaction.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl AccountRepository for InMemoryStore {
    async fn find_by_api_key_hash(&self, key_hash: &str) -> RepositoryResult<Option<Account>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .api_keys
            .get(key_hash)
            .and_then(|id| tables.accounts.get(id))
            .filter(|account| account.is_active)
            .cloned())
    }
}

#[async_trait]
impl BalanceRepository for InMemoryStore {
    async fn latest_for_owner(&self, owner_id: Uuid) -> RepositoryResult<Option<Balance>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .balances
            .iter()
            .filter(|b| b.owner_id == owner_id)
            .max_by_key(|b| b.id)
            .cloned())
    }
}

#[async_trait]
impl TransactionRepository for InMemoryStore {
    async fn insert(&self, new: NewTransaction) -> RepositoryResult<Transaction> {
        let mut tables = self.tables.lock().await;

        if tables
            .transactions
            .iter()
            .any(|t| t.reference == new.reference)
        {
            return Err(RepositoryError::DuplicateReference(new.reference));
        }

        tables.next_transaction_id += 1;
        let now = Utc::now();
        let transaction = Transaction {
            id: tables.next_transaction_id,
            reference: new.reference,
            owner_id: new.owner_id,
            balance_id: new.balance_id,
            transaction_type: TransactionType::Credit,
            amount: new.amount,
            purchased_units: new.purchased_units,
            status: TransactionStatus::Pending,
            is_active: false,
            payment_channel: new.payment_channel,
            source: new.source,
            created_at: now,
            updated_at: now,
        };
        tables.transactions.push(transaction.clone());

        Ok(transaction)
    }

    async fn find_by_reference(&self, reference: &str) -> RepositoryResult<Option<Transaction>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .transactions
            .iter()
            .find(|t| t.reference == reference)
            .cloned())
    }

    async fn list_for_owner(&self, owner_id: Uuid) -> RepositoryResult<Vec<Transaction>> {
        self.list(&TransactionFilter {
            id: None,
            owner_id: Some(owner_id),
        })
        .await
    }

    async fn list(&self, filter: &TransactionFilter) -> RepositoryResult<Vec<Transaction>> {
        let tables = self.tables.lock().await;
        // Ids are assigned in insertion order, so reversing gives id DESC
        Ok(tables
            .transactions
            .iter()
            .rev()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect())
    }

    async fn validate_and_credit(&self, reference: &str) -> RepositoryResult<ValidationOutcome> {
        let mut tables = self.tables.lock().await;
        let tables = &mut *tables;

        let Some(transaction) = tables
            .transactions
            .iter_mut()
            .find(|t| t.reference == reference)
        else {
            return Ok(ValidationOutcome::NotFound);
        };

        if transaction.is_active {
            return Ok(ValidationOutcome::AlreadyValidated(transaction.clone()));
        }

        // Resolve the balance before writing anything so a missing one leaves no trace
        let Some(balance) = tables
            .balances
            .iter_mut()
            .find(|b| b.id == transaction.balance_id)
        else {
            return Err(RepositoryError::InvalidRow(format!(
                "balance {} referenced by transaction {} does not exist",
                transaction.balance_id, transaction.id
            )));
        };

        let now = Utc::now();
        let previous_status = transaction.status;
        transaction.status = TransactionStatus::Success;
        transaction.is_active = true;
        transaction.updated_at = now;
        balance.units += transaction.purchased_units;
        balance.updated_at = now;

        Ok(ValidationOutcome::Validated {
            transaction: transaction.clone(),
            previous_status,
        })
    }

    async fn ping(&self) -> RepositoryResult<()> {
        Ok(())
    }
}
