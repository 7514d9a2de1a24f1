use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::auth::jwt::TokenService;
use crate::auth::repo::{PgUserStore, UserStore};
use crate::auth::services::IdentityService;
use crate::categories::repo::{CategoryStore, PgCategoryStore, PgRuleStore, RuleStore};
use crate::categories::services::CategoryService;
use crate::config::{AppConfig, JwtConfig};
use crate::memory::{MemoryCategoryStore, MemoryRuleStore, MemoryTransactionStore, MemoryUserStore};
use crate::transactions::repo::{PgTransactionStore, TransactionStore};
use crate::transactions::services::TransactionService;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub identity: IdentityService,
    pub categories: CategoryService,
    pub transactions: TransactionService,
}

impl AppState {
    /// Connects to Postgres, runs migrations and wires the Pg stores.
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        let db = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(config.request_timeout_secs))
            .connect(&config.database_url)
            .await
            .context("connect to database")?;
        crate::db::migrate(&db).await?;

        Ok(Self::from_parts(
            config,
            Arc::new(PgUserStore::new(db.clone())),
            Arc::new(PgCategoryStore::new(db.clone())),
            Arc::new(PgRuleStore::new(db.clone())),
            Arc::new(PgTransactionStore::new(db)),
        ))
    }

    pub fn from_parts(
        config: AppConfig,
        users: Arc<dyn UserStore>,
        categories: Arc<dyn CategoryStore>,
        rules: Arc<dyn RuleStore>,
        transactions: Arc<dyn TransactionStore>,
    ) -> Self {
        let tokens = TokenService::from_config(&config.jwt);
        let identity = IdentityService::new(users, tokens);
        let categories = CategoryService::new(categories, rules);
        let transactions = TransactionService::new(transactions, categories.clone());
        Self {
            config: Arc::new(config),
            identity,
            categories,
            transactions,
        }
    }

    /// Fully in-memory state with the default categories. No database needed.
    pub fn in_memory(jwt_secret: &str) -> Self {
        let config = AppConfig {
            database_url: String::new(),
            jwt: JwtConfig {
                secret: jwt_secret.to_string(),
                access_ttl_minutes: 15,
                refresh_ttl_minutes: 60 * 24,
            },
            request_timeout_secs: 30,
            db_max_connections: 1,
        };
        Self::from_parts(
            config,
            Arc::new(MemoryUserStore::default()),
            Arc::new(MemoryCategoryStore::with_defaults()),
            Arc::new(MemoryRuleStore::default()),
            Arc::new(MemoryTransactionStore::default()),
        )
    }
}
