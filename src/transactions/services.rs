use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::categories::services::CategoryService;
use crate::error::{AppError, AppResult};
use crate::transactions::repo::TransactionStore;
use crate::transactions::repo_types::{
    Transaction, TransactionDraft, TransactionFilter, TransactionPatch,
};

pub const DEFAULT_PAGE_LIMIT: i64 = 20;
pub const MAX_PAGE_LIMIT: i64 = 100;

/// `amount` is stored as NUMERIC(15, 2).
const AMOUNT_SCALE: u32 = 2;
const AMOUNT_MAX_EXCLUSIVE: i64 = 10_000_000_000_000;
const PLACE_NAME_MAX_CHARS: usize = 255;

/// One page of a listing plus the user's overall transaction count.
#[derive(Debug, Clone)]
pub struct TransactionPage {
    pub items: Vec<Transaction>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Creates and edits transactions, running categorization before every
/// write and checking ownership on every access.
#[derive(Clone)]
pub struct TransactionService {
    transactions: Arc<dyn TransactionStore>,
    categories: CategoryService,
}

impl TransactionService {
    pub fn new(transactions: Arc<dyn TransactionStore>, categories: CategoryService) -> Self {
        Self {
            transactions,
            categories,
        }
    }

    #[instrument(skip(self, draft))]
    pub async fn create(
        &self,
        user_id: Uuid,
        mut draft: TransactionDraft,
    ) -> AppResult<Transaction> {
        validate_draft(&mut draft)?;

        let mut tx = Transaction::from_draft(user_id, draft);
        self.categories.categorize(&mut tx).await?;
        self.transactions.create(&tx).await?;

        info!(tx_id = %tx.id, category_id = ?tx.category_id, "transaction created");
        Ok(tx)
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> AppResult<Transaction> {
        self.load_owned(user_id, id).await
    }

    #[instrument(skip(self, patch))]
    pub async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        mut patch: TransactionPatch,
    ) -> AppResult<Transaction> {
        let mut tx = self.load_owned(user_id, id).await?;
        validate_draft(&mut patch.draft)?;

        tx.apply_draft(patch.draft);
        match patch.category_id {
            Some(category_id) => {
                self.categories.get_category(category_id).await?;
                tx.category_id = Some(category_id);
                tx.is_confirmed = true;
            }
            None => self.categories.categorize(&mut tx).await?,
        }
        self.transactions.update(&tx).await?;

        info!(tx_id = %tx.id, category_id = ?tx.category_id, "transaction updated");
        Ok(tx)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> AppResult<()> {
        self.load_owned(user_id, id).await?;
        self.transactions.delete(id).await?;
        info!(tx_id = %id, "transaction deleted");
        Ok(())
    }

    /// Limit is clamped to `1..=MAX_PAGE_LIMIT`, a negative offset becomes 0.
    pub async fn list(&self, mut filter: TransactionFilter) -> AppResult<TransactionPage> {
        filter.limit = filter.limit.clamp(1, MAX_PAGE_LIMIT);
        filter.offset = filter.offset.max(0);
        if let (Some(from), Some(to)) = (filter.from_date, filter.to_date) {
            if from > to {
                return Err(AppError::Validation("from must not be after to".into()));
            }
        }

        let items = self.transactions.get_by_user(&filter).await?;
        let total = self.transactions.count_by_user(filter.user_id).await?;
        Ok(TransactionPage {
            items,
            total,
            limit: filter.limit,
            offset: filter.offset,
        })
    }

    async fn load_owned(&self, user_id: Uuid, id: Uuid) -> AppResult<Transaction> {
        let tx = self.transactions.get_by_id(id).await?;
        if tx.user_id != user_id {
            warn!(%user_id, tx_id = %id, "transaction owned by another user");
            return Err(AppError::Unauthorized);
        }
        Ok(tx)
    }
}

/// Rejects drafts the schema cannot hold and brings `amount` to the stored
/// scale, so the returned record matches what a later read sees.
fn validate_draft(draft: &mut TransactionDraft) -> AppResult<()> {
    if draft.amount.is_sign_negative() || draft.amount.is_zero() {
        return Err(AppError::Validation("amount must be positive".into()));
    }
    if draft.amount.normalize().scale() > AMOUNT_SCALE {
        return Err(AppError::Validation(format!(
            "amount has more than {AMOUNT_SCALE} decimal places"
        )));
    }
    if draft.amount >= Decimal::from(AMOUNT_MAX_EXCLUSIVE) {
        return Err(AppError::Validation("amount is too large".into()));
    }
    if let Some(name) = &draft.place_name {
        if name.chars().count() > PLACE_NAME_MAX_CHARS {
            return Err(AppError::Validation(format!(
                "place_name exceeds {PLACE_NAME_MAX_CHARS} characters"
            )));
        }
    }
    draft.amount.rescale(AMOUNT_SCALE);
    Ok(())
}
