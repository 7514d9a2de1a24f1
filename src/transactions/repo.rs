use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::StoreError;
use crate::transactions::repo_types::{Transaction, TransactionFilter};

#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn create(&self, tx: &Transaction) -> Result<(), StoreError>;
    async fn get_by_id(&self, id: Uuid) -> Result<Transaction, StoreError>;
    /// Page of the user's transactions, newest `date` first.
    async fn get_by_user(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, StoreError>;
    async fn update(&self, tx: &Transaction) -> Result<(), StoreError>;
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
    async fn count_by_user(&self, user_id: Uuid) -> Result<i64, StoreError>;
}

#[derive(Clone)]
pub struct PgTransactionStore {
    db: PgPool,
}

impl PgTransactionStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TransactionStore for PgTransactionStore {
    async fn create(&self, tx: &Transaction) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, user_id, amount, currency, description, date,
                place_name, place_lat, place_lon, category_id, is_confirmed,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(tx.id)
        .bind(tx.user_id)
        .bind(tx.amount)
        .bind(tx.currency)
        .bind(&tx.description)
        .bind(tx.date)
        .bind(&tx.place_name)
        .bind(tx.place_lat)
        .bind(tx.place_lon)
        .bind(tx.category_id)
        .bind(tx.is_confirmed)
        .bind(tx.created_at)
        .bind(tx.updated_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Transaction, StoreError> {
        let row = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, user_id, amount, currency, description, date,
                   place_name, place_lat, place_lon, category_id, is_confirmed,
                   created_at, updated_at
            FROM transactions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn get_by_user(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, StoreError> {
        let rows = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, user_id, amount, currency, description, date,
                   place_name, place_lat, place_lon, category_id, is_confirmed,
                   created_at, updated_at
            FROM transactions
            WHERE user_id = $1
              AND ($2::int IS NULL OR category_id = $2)
              AND ($3::timestamptz IS NULL OR date >= $3)
              AND ($4::timestamptz IS NULL OR date <= $4)
            ORDER BY date DESC, id
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(filter.user_id)
        .bind(filter.category_id)
        .bind(filter.from_date)
        .bind(filter.to_date)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn update(&self, tx: &Transaction) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET amount = $2, currency = $3, description = $4, date = $5,
                place_name = $6, place_lat = $7, place_lon = $8,
                category_id = $9, is_confirmed = $10, updated_at = $11
            WHERE id = $1
            "#,
        )
        .bind(tx.id)
        .bind(tx.amount)
        .bind(tx.currency)
        .bind(&tx.description)
        .bind(tx.date)
        .bind(&tx.place_name)
        .bind(tx.place_lat)
        .bind(tx.place_lon)
        .bind(tx.category_id)
        .bind(tx.is_confirmed)
        .bind(tx.updated_at)
        .execute(&self.db)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM transactions WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn count_by_user(&self, user_id: Uuid) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }
}
