use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Spending category. Reference data, seeded by migrations.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub is_default: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Per-user keyword rule. `(user_id, keyword)` is unique.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserCategoryRule {
    pub id: Uuid,
    pub user_id: Uuid,
    pub keyword: String,
    pub category_id: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl UserCategoryRule {
    pub fn new(user_id: Uuid, keyword: &str, category_id: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            keyword: keyword.to_string(),
            category_id,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}
