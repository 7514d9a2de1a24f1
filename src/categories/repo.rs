use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::categories::repo_types::{Category, UserCategoryRule};
use crate::error::StoreError;

#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn get_all(&self) -> Result<Vec<Category>, StoreError>;
    async fn get_by_id(&self, id: i32) -> Result<Category, StoreError>;
    async fn get_defaults(&self) -> Result<Vec<Category>, StoreError>;
}

/// Persistence for keyword rules.
///
/// `get_all_by_user` returns rules in a stable order (creation order); the
/// categorizer relies on it. `create` fails with `StoreError::Conflict` on a
/// duplicate `(user_id, keyword)`.
#[async_trait]
pub trait RuleStore: Send + Sync {
    async fn create(&self, rule: &UserCategoryRule) -> Result<(), StoreError>;
    async fn get_all_by_user(&self, user_id: Uuid) -> Result<Vec<UserCategoryRule>, StoreError>;
    async fn get_by_id(&self, id: Uuid) -> Result<UserCategoryRule, StoreError>;
    async fn get_by_keyword(
        &self,
        user_id: Uuid,
        keyword: &str,
    ) -> Result<UserCategoryRule, StoreError>;
    async fn update(&self, rule: &UserCategoryRule) -> Result<(), StoreError>;
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct PgCategoryStore {
    db: PgPool,
}

impl PgCategoryStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CategoryStore for PgCategoryStore {
    async fn get_all(&self) -> Result<Vec<Category>, StoreError> {
        let rows = sqlx::query_as::<_, Category>(
            "SELECT id, name, is_default, created_at FROM categories ORDER BY name",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn get_by_id(&self, id: i32) -> Result<Category, StoreError> {
        let row = sqlx::query_as::<_, Category>(
            "SELECT id, name, is_default, created_at FROM categories WHERE id = $1",
        )
        .bind(id)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn get_defaults(&self) -> Result<Vec<Category>, StoreError> {
        let rows = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, is_default, created_at
            FROM categories
            WHERE is_default = true
            ORDER BY name
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}

#[derive(Clone)]
pub struct PgRuleStore {
    db: PgPool,
}

impl PgRuleStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RuleStore for PgRuleStore {
    async fn create(&self, rule: &UserCategoryRule) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO user_category_rules (id, user_id, keyword, category_id, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(rule.id)
        .bind(rule.user_id)
        .bind(&rule.keyword)
        .bind(rule.category_id)
        .bind(rule.created_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn get_all_by_user(&self, user_id: Uuid) -> Result<Vec<UserCategoryRule>, StoreError> {
        let rows = sqlx::query_as::<_, UserCategoryRule>(
            r#"
            SELECT id, user_id, keyword, category_id, created_at
            FROM user_category_rules
            WHERE user_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<UserCategoryRule, StoreError> {
        let row = sqlx::query_as::<_, UserCategoryRule>(
            r#"
            SELECT id, user_id, keyword, category_id, created_at
            FROM user_category_rules
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn get_by_keyword(
        &self,
        user_id: Uuid,
        keyword: &str,
    ) -> Result<UserCategoryRule, StoreError> {
        let row = sqlx::query_as::<_, UserCategoryRule>(
            r#"
            SELECT id, user_id, keyword, category_id, created_at
            FROM user_category_rules
            WHERE user_id = $1 AND keyword = $2
            "#,
        )
        .bind(user_id)
        .bind(keyword)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn update(&self, rule: &UserCategoryRule) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE user_category_rules SET keyword = $2, category_id = $3 WHERE id = $1",
        )
        .bind(rule.id)
        .bind(&rule.keyword)
        .bind(rule.category_id)
        .execute(&self.db)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM user_category_rules WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
