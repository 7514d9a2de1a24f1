use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::categories::repo::{CategoryStore, RuleStore};
use crate::categories::repo_types::{Category, UserCategoryRule};
use crate::error::{AppError, AppResult, StoreError};
use crate::transactions::repo_types::Transaction;

/// First rule, in the given order, whose keyword occurs in `description`
/// ignoring case. Order decides ties, not specificity.
pub fn first_matching_rule<'a>(
    description: &str,
    rules: &'a [UserCategoryRule],
) -> Option<&'a UserCategoryRule> {
    let description = description.to_uppercase();
    rules
        .iter()
        .find(|rule| description.contains(&rule.keyword.to_uppercase()))
}

/// `user_category_rules.keyword` is VARCHAR(255).
const KEYWORD_MAX_CHARS: usize = 255;

/// Keyword-rule categorization and rule management.
#[derive(Clone)]
pub struct CategoryService {
    categories: Arc<dyn CategoryStore>,
    rules: Arc<dyn RuleStore>,
}

impl CategoryService {
    pub fn new(categories: Arc<dyn CategoryStore>, rules: Arc<dyn RuleStore>) -> Self {
        Self { categories, rules }
    }

    /// Assigns a category to `tx` from its owner's rules.
    ///
    /// A match sets `category_id` and `is_confirmed`. No match (or an empty
    /// description) leaves the transaction uncategorized and unconfirmed.
    #[instrument(skip(self, tx), fields(tx_id = %tx.id, user_id = %tx.user_id))]
    pub async fn categorize(&self, tx: &mut Transaction) -> AppResult<()> {
        tx.category_id = None;
        tx.is_confirmed = false;

        if tx.description.trim().is_empty() {
            return Ok(());
        }

        let rules = self.rules.get_all_by_user(tx.user_id).await?;
        if let Some(rule) = first_matching_rule(&tx.description, &rules) {
            debug!(rule_id = %rule.id, category_id = rule.category_id, "rule matched");
            tx.category_id = Some(rule.category_id);
            tx.is_confirmed = true;
        }
        // No match: left for a future automatic classifier.
        Ok(())
    }

    pub async fn list_rules(&self, user_id: Uuid) -> AppResult<Vec<UserCategoryRule>> {
        Ok(self.rules.get_all_by_user(user_id).await?)
    }

    #[instrument(skip(self))]
    pub async fn create_rule(
        &self,
        user_id: Uuid,
        keyword: &str,
        category_id: i32,
    ) -> AppResult<UserCategoryRule> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(AppError::Validation("keyword is required".into()));
        }
        if keyword.chars().count() > KEYWORD_MAX_CHARS {
            return Err(AppError::Validation(format!(
                "keyword exceeds {KEYWORD_MAX_CHARS} characters"
            )));
        }
        self.categories.get_by_id(category_id).await?;

        let rule = UserCategoryRule::new(user_id, keyword, category_id);
        self.rules.create(&rule).await.map_err(|e| {
            if matches!(e, StoreError::Conflict) {
                warn!(%user_id, keyword, "duplicate rule keyword");
            }
            AppError::from(e)
        })?;
        info!(rule_id = %rule.id, %user_id, "rule created");
        Ok(rule)
    }

    /// `NotFound` if no such rule exists at all, `Unauthorized` if it
    /// belongs to someone else.
    #[instrument(skip(self))]
    pub async fn delete_rule(&self, user_id: Uuid, rule_id: Uuid) -> AppResult<()> {
        let rule = self.rules.get_by_id(rule_id).await?;
        if rule.user_id != user_id {
            warn!(%user_id, %rule_id, "rule owned by another user");
            return Err(AppError::Unauthorized);
        }
        self.rules.delete(rule_id).await?;
        info!(%rule_id, %user_id, "rule deleted");
        Ok(())
    }

    pub async fn get_category(&self, id: i32) -> AppResult<Category> {
        Ok(self.categories.get_by_id(id).await?)
    }

    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        Ok(self.categories.get_all().await?)
    }

    pub async fn default_categories(&self) -> AppResult<Vec<Category>> {
        Ok(self.categories.get_defaults().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::Currency;
    use crate::memory::{MemoryCategoryStore, MemoryRuleStore};
    use crate::transactions::repo_types::TransactionDraft;
    use rust_decimal::Decimal;
    use time::OffsetDateTime;

    fn make_service() -> CategoryService {
        CategoryService::new(
            Arc::new(MemoryCategoryStore::with_defaults()),
            Arc::new(MemoryRuleStore::default()),
        )
    }

    fn tx_for(user_id: Uuid, description: &str) -> Transaction {
        Transaction::from_draft(
            user_id,
            TransactionDraft {
                amount: Decimal::new(450, 2),
                currency: Currency::Rub,
                description: description.into(),
                date: OffsetDateTime::now_utc(),
                place_name: None,
                place_lat: None,
                place_lon: None,
            },
        )
    }

    fn rule(keyword: &str, category_id: i32) -> UserCategoryRule {
        UserCategoryRule::new(Uuid::nil(), keyword, category_id)
    }

    #[test]
    fn first_match_wins_over_more_specific() {
        let rules = vec![rule("coffee", 3), rule("starbucks coffee", 5)];
        let hit = first_matching_rule("Starbucks Coffee Downtown", &rules).unwrap();
        assert_eq!(hit.category_id, 3);
    }

    #[test]
    fn matching_folds_non_ascii_case() {
        let rules = vec![rule("кофе", 3)];
        assert!(first_matching_rule("КОФЕЙНЯ КОФЕ ХАУЗ", &rules).is_some());
        let rules = vec![rule("strasse", 4)];
        assert!(first_matching_rule("Hauptstraße 5", &rules).is_some());
    }

    #[test]
    fn matching_ignores_case() {
        let rules = vec![rule("UbEr", 7)];
        assert!(first_matching_rule("uber trip to airport", &rules).is_some());
        assert!(first_matching_rule("Taxi", &rules).is_none());
    }

    #[tokio::test]
    async fn keyword_rules_assign_category() {
        let svc = make_service();
        let user_id = Uuid::new_v4();
        svc.create_rule(user_id, "COFFEE", 3).await.unwrap();
        svc.create_rule(user_id, "UBER", 7).await.unwrap();

        let mut coffee = tx_for(user_id, "Starbucks Coffee Downtown");
        svc.categorize(&mut coffee).await.unwrap();
        assert_eq!(coffee.category_id, Some(3));
        assert!(coffee.is_confirmed);

        let mut groceries = tx_for(user_id, "Grocery Store");
        svc.categorize(&mut groceries).await.unwrap();
        assert_eq!(groceries.category_id, None);
        assert!(!groceries.is_confirmed);
    }

    #[tokio::test]
    async fn empty_description_stays_uncategorized() {
        let svc = make_service();
        let user_id = Uuid::new_v4();
        svc.create_rule(user_id, "a", 1).await.unwrap();

        let mut tx = tx_for(user_id, "");
        svc.categorize(&mut tx).await.unwrap();
        assert_eq!(tx.category_id, None);
        assert!(!tx.is_confirmed);
    }

    #[tokio::test]
    async fn other_users_rules_are_ignored() {
        let svc = make_service();
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        svc.create_rule(alice, "coffee", 3).await.unwrap();

        let mut tx = tx_for(bob, "coffee shop");
        svc.categorize(&mut tx).await.unwrap();
        assert_eq!(tx.category_id, None);
    }

    #[tokio::test]
    async fn duplicate_keyword_is_rejected() {
        let svc = make_service();
        let user_id = Uuid::new_v4();
        svc.create_rule(user_id, "coffee", 3).await.unwrap();
        let err = svc.create_rule(user_id, "coffee", 4).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyExists));

        // Another user may reuse the keyword.
        svc.create_rule(Uuid::new_v4(), "coffee", 4).await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_duplicate_rules_leave_one_survivor() {
        let svc = make_service();
        let user_id = Uuid::new_v4();
        let (a, b) = tokio::join!(
            svc.create_rule(user_id, "rent", 6),
            svc.create_rule(user_id, "rent", 6)
        );
        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
        let failed = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
        assert!(matches!(failed, AppError::AlreadyExists));
        assert_eq!(svc.list_rules(user_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rule_needs_existing_category_and_keyword() {
        let svc = make_service();
        let user_id = Uuid::new_v4();
        assert!(matches!(
            svc.create_rule(user_id, "coffee", 999).await,
            Err(AppError::NotFound)
        ));
        assert!(matches!(
            svc.create_rule(user_id, "   ", 1).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            svc.create_rule(user_id, &"k".repeat(256), 1).await,
            Err(AppError::Validation(_))
        ));
        svc.create_rule(user_id, &"k".repeat(255), 1).await.unwrap();
    }

    #[tokio::test]
    async fn delete_rule_checks_existence_and_owner() {
        let svc = make_service();
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let rule = svc.create_rule(alice, "coffee", 3).await.unwrap();

        let err = svc.delete_rule(bob, rule.id).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));

        let err = svc.delete_rule(bob, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound));

        svc.delete_rule(alice, rule.id).await.unwrap();
        assert!(svc.list_rules(alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn default_categories_are_listed() {
        let svc = make_service();
        let all = svc.list_categories().await.unwrap();
        let defaults = svc.default_categories().await.unwrap();
        assert_eq!(all.len(), crate::memory::DEFAULT_CATEGORIES.len());
        assert!(defaults.iter().all(|c| c.is_default));
    }
}
