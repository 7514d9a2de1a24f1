use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::categories::repo_types::{Category, UserCategoryRule};

/// Request body for `POST /category-rules`.
#[derive(Debug, Deserialize)]
pub struct CreateRuleRequest {
    pub keyword: String,
    pub category_id: i32,
}

/// A rule together with the name of the category it assigns.
#[derive(Debug, Serialize)]
pub struct RuleResponse {
    pub id: Uuid,
    pub keyword: String,
    pub category_id: i32,
    pub category: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl RuleResponse {
    pub fn new(rule: UserCategoryRule, category: Option<String>) -> Self {
        Self {
            id: rule.id,
            keyword: rule.keyword,
            category_id: rule.category_id,
            category,
            created_at: rule.created_at,
        }
    }

    /// Attaches names by category id. Rules keep their order.
    pub fn with_names(rules: Vec<UserCategoryRule>, categories: &[Category]) -> Vec<Self> {
        let names: HashMap<i32, &str> = categories
            .iter()
            .map(|c| (c.id, c.name.as_str()))
            .collect();
        rules
            .into_iter()
            .map(|rule| {
                let name = names.get(&rule.category_id).map(|n| n.to_string());
                Self::new(rule, name)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_follow_category_ids() {
        let now = OffsetDateTime::now_utc();
        let categories = vec![
            Category { id: 1, name: "Groceries".into(), is_default: true, created_at: now },
            Category { id: 3, name: "Restaurants".into(), is_default: true, created_at: now },
        ];
        let user_id = Uuid::new_v4();
        let rules = vec![
            UserCategoryRule::new(user_id, "coffee", 3),
            UserCategoryRule::new(user_id, "market", 1),
            UserCategoryRule::new(user_id, "orphan", 42),
        ];

        let out = RuleResponse::with_names(rules, &categories);
        let names: Vec<_> = out.iter().map(|r| r.category.as_deref()).collect();
        assert_eq!(names, [Some("Restaurants"), Some("Groceries"), None]);
        assert_eq!(out[0].keyword, "coffee");
    }
}
