//! PostgreSQL storage.
//!
//! One `PgStore` implements every repository trait so that payment
//! validation can touch `transactions` and `balances` inside a single
//! database transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{
    AccountRepository, BalanceRepository, RepositoryError, RepositoryResult,
    TransactionRepository, ValidationOutcome,
};
use crate::db::DbPool;
use crate::models::{
    account::Account,
    balance::Balance,
    transaction::{NewTransaction, Transaction, TransactionFilter},
};

/// Name of the unique constraint on `transactions.reference`.
const REFERENCE_CONSTRAINT: &str = "transactions_reference_key";

/// Postgres-backed repositories sharing one connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for PgStore {
    async fn find_by_api_key_hash(&self, key_hash: &str) -> RepositoryResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT a.id, a.email, a.is_staff, a.is_active, a.created_at
            FROM accounts a
            JOIN api_keys k ON k.account_id = a.id
            WHERE k.key_hash = $1 AND k.is_active = true AND a.is_active = true
            "#,
        )
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }
}

#[async_trait]
impl BalanceRepository for PgStore {
    async fn latest_for_owner(&self, owner_id: Uuid) -> RepositoryResult<Option<Balance>> {
        let balance = sqlx::query_as::<_, Balance>(
            r#"
            SELECT id, owner_id, units, created_at, updated_at
            FROM balances
            WHERE owner_id = $1
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(balance)
    }
}

#[async_trait]
impl TransactionRepository for PgStore {
    async fn insert(&self, new: NewTransaction) -> RepositoryResult<Transaction> {
        let row = sqlx::query_as::<_, TransactionRow>(
            r#"
            INSERT INTO transactions (
                reference,
                owner_id,
                balance_id,
                amount,
                purchased_units,
                payment_channel,
                source
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&new.reference)
        .bind(new.owner_id)
        .bind(new.balance_id)
        .bind(new.amount)
        .bind(new.purchased_units)
        .bind(&new.payment_channel)
        .bind(&new.source)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(ref db_err) if db_err.constraint() == Some(REFERENCE_CONSTRAINT) => {
                RepositoryError::DuplicateReference(new.reference.clone())
            }
            other => RepositoryError::Database(other),
        })?;

        row.try_into()
    }

    async fn find_by_reference(&self, reference: &str) -> RepositoryResult<Option<Transaction>> {
        sqlx::query_as::<_, TransactionRow>("SELECT * FROM transactions WHERE reference = $1")
            .bind(reference)
            .fetch_optional(&self.pool)
            .await?
            .map(Transaction::try_from)
            .transpose()
    }

    async fn list_for_owner(&self, owner_id: Uuid) -> RepositoryResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            "SELECT * FROM transactions WHERE owner_id = $1 ORDER BY id DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Transaction::try_from).collect()
    }

    async fn list(&self, filter: &TransactionFilter) -> RepositoryResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT * FROM transactions
            WHERE ($1::BIGINT IS NULL OR id = $1)
              AND ($2::UUID IS NULL OR owner_id = $2)
            ORDER BY id DESC
            "#,
        )
        .bind(filter.id)
        .bind(filter.owner_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Transaction::try_from).collect()
    }

    async fn validate_and_credit(&self, reference: &str) -> RepositoryResult<ValidationOutcome> {
        let mut tx = self.pool.begin().await?;

        // FOR UPDATE makes concurrent validators of this reference queue here;
        // the one that gets the lock second sees is_active = true.
        let current = sqlx::query_as::<_, TransactionRow>(
            "SELECT * FROM transactions WHERE reference = $1 FOR UPDATE",
        )
        .bind(reference)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(current) = current else {
            tx.rollback().await?;
            return Ok(ValidationOutcome::NotFound);
        };
        let current = Transaction::try_from(current)?;

        if current.is_active {
            tx.rollback().await?;
            return Ok(ValidationOutcome::AlreadyValidated(current));
        }

        let updated = sqlx::query_as::<_, TransactionRow>(
            r#"
            UPDATE transactions
            SET status = 'success',
                is_active = true,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(current.id)
        .fetch_one(&mut *tx)
        .await?;

        let credited = sqlx::query(
            r#"
            UPDATE balances
            SET units = units + $1,
                updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(current.purchased_units)
        .bind(current.balance_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if credited == 0 {
            tx.rollback().await?;
            return Err(RepositoryError::InvalidRow(format!(
                "balance {} referenced by transaction {} does not exist",
                current.balance_id, current.id
            )));
        }

        // Both updates become visible together
        tx.commit().await?;

        Ok(ValidationOutcome::Validated {
            transaction: updated.try_into()?,
            previous_status: current.status,
        })
    }

    async fn ping(&self) -> RepositoryResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Row shape of `transactions`. Enum columns are stored as text.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: i64,
    reference: String,
    owner_id: Uuid,
    balance_id: i64,
    transaction_type: String,
    amount: Decimal,
    purchased_units: Decimal,
    status: String,
    is_active: bool,
    payment_channel: Option<String>,
    source: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = RepositoryError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Transaction {
            id: row.id,
            reference: row.reference,
            owner_id: row.owner_id,
            balance_id: row.balance_id,
            transaction_type: row
                .transaction_type
                .parse()
                .map_err(RepositoryError::InvalidRow)?,
            amount: row.amount,
            purchased_units: row.purchased_units,
            status: row.status.parse().map_err(RepositoryError::InvalidRow)?,
            is_active: row.is_active,
            payment_channel: row.payment_channel,
            source: row.source,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
