//! In-memory implementations of the store traits.
//!
//! Each store keeps its rows behind a single `tokio::sync::Mutex`, so the
//! uniqueness checks in `create`/`update` are atomic just like a unique
//! index. Used by the test suite and by `AppState::in_memory`.

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::auth::repo::UserStore;
use crate::auth::repo_types::User;
use crate::categories::repo::{CategoryStore, RuleStore};
use crate::categories::repo_types::{Category, UserCategoryRule};
use crate::error::StoreError;
use crate::transactions::repo::TransactionStore;
use crate::transactions::repo_types::{Transaction, TransactionFilter};

/// Category names seeded by the initial migration, in id order.
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "Groceries",
    "Transport",
    "Restaurants",
    "Health",
    "Entertainment",
    "Home",
    "Clothing",
    "Beauty",
    "Education",
    "Transfers",
    "Taxes and fees",
    "Income",
    "Other",
];

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<User>>,
}

impl MemoryUserStore {
    fn clashes(existing: &User, user: &User) -> bool {
        existing.id != user.id
            && (existing.email == user.email
                || (user.federated_id.is_some() && existing.federated_id == user.federated_id))
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.lock().await;
        if users.iter().any(|u| u.id == user.id || Self::clashes(u, user)) {
            return Err(StoreError::Conflict);
        }
        users.push(user.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<User, StoreError> {
        let users = self.users.lock().await;
        users.iter().find(|u| u.id == id).cloned().ok_or(StoreError::NotFound)
    }

    async fn get_by_email(&self, email: &str) -> Result<User, StoreError> {
        let users = self.users.lock().await;
        users
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_by_federated_id(&self, federated_id: &str) -> Result<User, StoreError> {
        let users = self.users.lock().await;
        users
            .iter()
            .find(|u| u.federated_id.as_deref() == Some(federated_id))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.lock().await;
        if users.iter().any(|u| Self::clashes(u, user)) {
            return Err(StoreError::Conflict);
        }
        let slot = users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or(StoreError::NotFound)?;
        *slot = user.clone();
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let mut users = self.users.lock().await;
        let before = users.len();
        users.retain(|u| u.id != id);
        if users.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

pub struct MemoryCategoryStore {
    categories: Vec<Category>,
}

impl MemoryCategoryStore {
    pub fn new(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    /// Same rows the initial migration seeds, ids starting at 1.
    pub fn with_defaults() -> Self {
        let now = OffsetDateTime::now_utc();
        let categories = DEFAULT_CATEGORIES
            .iter()
            .zip(1..)
            .map(|(name, id)| Category {
                id,
                name: (*name).to_string(),
                is_default: true,
                created_at: now,
            })
            .collect();
        Self::new(categories)
    }
}

#[async_trait]
impl CategoryStore for MemoryCategoryStore {
    async fn get_all(&self) -> Result<Vec<Category>, StoreError> {
        let mut all = self.categories.clone();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn get_by_id(&self, id: i32) -> Result<Category, StoreError> {
        self.categories
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_defaults(&self) -> Result<Vec<Category>, StoreError> {
        let mut defaults: Vec<Category> = self
            .categories
            .iter()
            .filter(|c| c.is_default)
            .cloned()
            .collect();
        defaults.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(defaults)
    }
}

/// Keeps rules in insertion order, which is the iteration order callers see.
#[derive(Default)]
pub struct MemoryRuleStore {
    rules: Mutex<Vec<UserCategoryRule>>,
}

#[async_trait]
impl RuleStore for MemoryRuleStore {
    async fn create(&self, rule: &UserCategoryRule) -> Result<(), StoreError> {
        let mut rules = self.rules.lock().await;
        if rules
            .iter()
            .any(|r| r.id == rule.id || (r.user_id == rule.user_id && r.keyword == rule.keyword))
        {
            return Err(StoreError::Conflict);
        }
        rules.push(rule.clone());
        Ok(())
    }

    async fn get_all_by_user(&self, user_id: Uuid) -> Result<Vec<UserCategoryRule>, StoreError> {
        let rules = self.rules.lock().await;
        Ok(rules.iter().filter(|r| r.user_id == user_id).cloned().collect())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<UserCategoryRule, StoreError> {
        let rules = self.rules.lock().await;
        rules.iter().find(|r| r.id == id).cloned().ok_or(StoreError::NotFound)
    }

    async fn get_by_keyword(
        &self,
        user_id: Uuid,
        keyword: &str,
    ) -> Result<UserCategoryRule, StoreError> {
        let rules = self.rules.lock().await;
        rules
            .iter()
            .find(|r| r.user_id == user_id && r.keyword == keyword)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update(&self, rule: &UserCategoryRule) -> Result<(), StoreError> {
        let mut rules = self.rules.lock().await;
        if rules
            .iter()
            .any(|r| r.id != rule.id && r.user_id == rule.user_id && r.keyword == rule.keyword)
        {
            return Err(StoreError::Conflict);
        }
        let slot = rules
            .iter_mut()
            .find(|r| r.id == rule.id)
            .ok_or(StoreError::NotFound)?;
        slot.keyword = rule.keyword.clone();
        slot.category_id = rule.category_id;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let mut rules = self.rules.lock().await;
        let before = rules.len();
        rules.retain(|r| r.id != id);
        if rules.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryTransactionStore {
    transactions: Mutex<Vec<Transaction>>,
}

#[async_trait]
impl TransactionStore for MemoryTransactionStore {
    async fn create(&self, tx: &Transaction) -> Result<(), StoreError> {
        let mut transactions = self.transactions.lock().await;
        if transactions.iter().any(|t| t.id == tx.id) {
            return Err(StoreError::Conflict);
        }
        transactions.push(tx.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Transaction, StoreError> {
        let transactions = self.transactions.lock().await;
        transactions
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_by_user(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, StoreError> {
        let transactions = self.transactions.lock().await;
        let mut matching: Vec<Transaction> = transactions
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.date.cmp(&a.date).then(a.id.cmp(&b.id)));
        Ok(matching
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .collect())
    }

    async fn update(&self, tx: &Transaction) -> Result<(), StoreError> {
        let mut transactions = self.transactions.lock().await;
        let slot = transactions
            .iter_mut()
            .find(|t| t.id == tx.id)
            .ok_or(StoreError::NotFound)?;
        // Owner and creation time are fixed at insert.
        let (user_id, created_at) = (slot.user_id, slot.created_at);
        *slot = tx.clone();
        slot.user_id = user_id;
        slot.created_at = created_at;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let mut transactions = self.transactions.lock().await;
        let before = transactions.len();
        transactions.retain(|t| t.id != id);
        if transactions.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn count_by_user(&self, user_id: Uuid) -> Result<i64, StoreError> {
        let transactions = self.transactions.lock().await;
        Ok(transactions.iter().filter(|t| t.user_id == user_id).count() as i64)
    }
}
