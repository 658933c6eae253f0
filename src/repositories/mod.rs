//! Storage interfaces.
//!
//! Services never touch a connection pool directly; they are handed these
//! traits. `postgres` is the production implementation, `memory` keeps
//! everything in-process and backs the test suite.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    account::Account,
    balance::Balance,
    transaction::{NewTransaction, Transaction, TransactionFilter, TransactionStatus},
};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// Errors raised by a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The unique constraint on `transactions.reference` rejected an insert.
    #[error("Duplicate transaction reference: {0}")]
    DuplicateReference(String),

    /// A stored row could not be mapped back into a model.
    #[error("Invalid row: {0}")]
    InvalidRow(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Result of the atomic validate-and-credit operation.
#[derive(Debug, Clone)]
pub enum ValidationOutcome {
    /// The transaction was inactive and has now been credited.
    Validated {
        transaction: Transaction,
        /// Status the transaction had before this validation
        previous_status: TransactionStatus,
    },

    /// The transaction was already active; nothing was changed.
    AlreadyValidated(Transaction),

    /// No transaction carries this reference.
    NotFound,
}

/// Resolves API keys to caller identities.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Find the active account owning an active API key with this hash.
    async fn find_by_api_key_hash(&self, key_hash: &str) -> RepositoryResult<Option<Account>>;
}

#[async_trait]
pub trait BalanceRepository: Send + Sync {
    /// The owner's most recently created balance, if any.
    async fn latest_for_owner(&self, owner_id: Uuid) -> RepositoryResult<Option<Balance>>;
}

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Insert a pending, inactive transaction.
    ///
    /// Fails with `DuplicateReference` if the reference is already taken.
    async fn insert(&self, new: NewTransaction) -> RepositoryResult<Transaction>;

    async fn find_by_reference(&self, reference: &str) -> RepositoryResult<Option<Transaction>>;

    /// The owner's transactions, most recent first.
    async fn list_for_owner(&self, owner_id: Uuid) -> RepositoryResult<Vec<Transaction>>;

    /// All transactions matching `filter`, most recent first.
    async fn list(&self, filter: &TransactionFilter) -> RepositoryResult<Vec<Transaction>>;

    /// Mark the transaction successful and credit its balance, as one unit of work.
    ///
    /// Implementations must read `is_active`, decide, and write both the
    /// transaction and the balance without any other validation of the same
    /// reference interleaving. If the transaction is already active, nothing
    /// is written.
    async fn validate_and_credit(&self, reference: &str) -> RepositoryResult<ValidationOutcome>;

    /// Check that the backing store is reachable.
    async fn ping(&self) -> RepositoryResult<()>;
}
