use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::jwt::TokenService;
use crate::auth::password::CredentialHasher;
use crate::auth::repo::UserStore;
use crate::auth::repo_types::User;
use crate::error::{AppError, AppResult, StoreError};

/// Access/refresh pair handed to a client after authentication.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Registration, password and federated login, token minting.
#[derive(Clone)]
pub struct IdentityService {
    users: Arc<dyn UserStore>,
    tokens: TokenService,
    hasher: CredentialHasher,
}

impl IdentityService {
    pub fn new(users: Arc<dyn UserStore>, tokens: TokenService) -> Self {
        Self {
            users,
            tokens,
            hasher: CredentialHasher::default(),
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    #[instrument(skip(self, password))]
    pub async fn register(&self, email: &str, password: &str) -> AppResult<User> {
        match self.users.get_by_email(email).await {
            Ok(_) => {
                warn!(email, "email already registered");
                return Err(AppError::AlreadyExists);
            }
            Err(StoreError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        let mut user = User::new(email);
        user.password_hash = Some(self.hasher.hash(password)?);

        // The store's unique index is authoritative if another register won the race.
        self.users.create(&user).await?;
        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok(user)
    }

    /// Every failure mode is reported as `InvalidCredentials`.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> AppResult<User> {
        let user = match self.users.get_by_email(email).await {
            Ok(u) => u,
            Err(StoreError::NotFound) => {
                warn!(email, "login unknown email");
                return Err(AppError::InvalidCredentials);
            }
            Err(e) => return Err(e.into()),
        };

        let Some(hash) = user.password_hash.as_deref() else {
            warn!(email, user_id = %user.id, "login on federated-only account");
            return Err(AppError::InvalidCredentials);
        };

        if !self.hasher.verify(password, hash)? {
            warn!(email, user_id = %user.id, "login invalid password");
            return Err(AppError::InvalidCredentials);
        }

        info!(user_id = %user.id, "user logged in");
        Ok(user)
    }

    /// Resolves by provider id, then by email (linking the provider id),
    /// and otherwise creates a federated-only account. A `Conflict` on create
    /// means a concurrent first login won; that account is returned.
    #[instrument(skip(self))]
    pub async fn login_with_federated_provider(
        &self,
        provider_id: &str,
        email: &str,
    ) -> AppResult<User> {
        match self.users.get_by_federated_id(provider_id).await {
            Ok(user) => return Ok(user),
            Err(StoreError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        match self.users.get_by_email(email).await {
            Ok(user) => return self.link_provider(user, provider_id).await,
            Err(StoreError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        let mut user = User::new(email);
        user.federated_id = Some(provider_id.to_string());
        match self.users.create(&user).await {
            Ok(()) => {
                info!(user_id = %user.id, email = %user.email, "federated user created");
                Ok(user)
            }
            Err(StoreError::Conflict) => match self.users.get_by_federated_id(provider_id).await {
                Ok(existing) => Ok(existing),
                Err(StoreError::NotFound) => Err(AppError::AlreadyExists),
                Err(e) => Err(e.into()),
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Sets the provider id on an account found by email, replacing any
    /// previously linked id.
    async fn link_provider(&self, mut user: User, provider_id: &str) -> AppResult<User> {
        match user.federated_id.as_deref() {
            Some(existing) if existing == provider_id => return Ok(user),
            Some(_) => warn!(user_id = %user.id, "replacing previously linked provider id"),
            None => {}
        }

        user.federated_id = Some(provider_id.to_string());
        user.updated_at = OffsetDateTime::now_utc();
        self.users.update(&user).await?;
        info!(user_id = %user.id, "provider id linked to existing account");
        Ok(user)
    }

    pub fn generate_token_pair(&self, user: &User) -> AppResult<TokenPair> {
        Ok(TokenPair {
            access_token: self.tokens.issue_access_token(user.id, &user.email)?,
            refresh_token: self.tokens.issue_refresh_token(user.id)?,
        })
    }

    /// Exchanges a refresh token for a new pair. A token whose subject no
    /// longer exists is rejected as invalid.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<(User, TokenPair)> {
        let user_id = self.tokens.validate_refresh_token(refresh_token)?;
        let user = match self.users.get_by_id(user_id).await {
            Ok(u) => u,
            Err(StoreError::NotFound) => {
                warn!(%user_id, "refresh for unknown user");
                return Err(AppError::TokenInvalid);
            }
            Err(e) => return Err(e.into()),
        };
        let pair = self.generate_token_pair(&user)?;
        Ok((user, pair))
    }

    pub async fn current_user(&self, user_id: Uuid) -> AppResult<User> {
        Ok(self.users.get_by_id(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::Currency;
    use crate::memory::MemoryUserStore;
    use std::time::Duration;

    fn make_service() -> (IdentityService, Arc<MemoryUserStore>) {
        let store = Arc::new(MemoryUserStore::default());
        let tokens = TokenService::new(
            "test-secret",
            Duration::from_secs(15 * 60),
            Duration::from_secs(24 * 60 * 60),
        );
        (IdentityService::new(store.clone(), tokens), store)
    }

    #[tokio::test]
    async fn register_then_login_returns_same_user() {
        let (svc, _) = make_service();
        let registered = svc.register("test@example.com", "password123").await.unwrap();
        assert!(registered.password_hash.is_some());
        assert!(registered.federated_id.is_none());
        assert_eq!(registered.default_currency, Currency::Rub);

        let logged_in = svc.login("test@example.com", "password123").await.unwrap();
        assert_eq!(logged_in.id, registered.id);
    }

    #[tokio::test]
    async fn register_twice_fails_regardless_of_password() {
        let (svc, _) = make_service();
        svc.register("test@example.com", "password123").await.unwrap();
        let err = svc.register("test@example.com", "password456").await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyExists));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let (svc, _) = make_service();
        svc.register("test@example.com", "password123").await.unwrap();

        let wrong = svc.login("test@example.com", "nope-nope").await.unwrap_err();
        let unknown = svc.login("ghost@example.com", "password123").await.unwrap_err();
        assert!(matches!(wrong, AppError::InvalidCredentials));
        assert!(matches!(unknown, AppError::InvalidCredentials));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn federated_only_account_cannot_password_login() {
        let (svc, _) = make_service();
        svc.login_with_federated_provider("google-1", "fed@example.com")
            .await
            .unwrap();
        let err = svc.login("fed@example.com", "password123").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn federated_login_is_idempotent() {
        let (svc, store) = make_service();
        let first = svc
            .login_with_federated_provider("google-1", "fed@example.com")
            .await
            .unwrap();
        let second = svc
            .login_with_federated_provider("google-1", "fed@example.com")
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert!(first.password_hash.is_none());
        assert_eq!(store.get_by_email("fed@example.com").await.unwrap().id, first.id);
    }

    #[tokio::test]
    async fn federated_login_links_existing_email_account() {
        let (svc, store) = make_service();
        let registered = svc.register("both@example.com", "password123").await.unwrap();

        let linked = svc
            .login_with_federated_provider("google-7", "both@example.com")
            .await
            .unwrap();
        assert_eq!(linked.id, registered.id);
        assert_eq!(linked.federated_id.as_deref(), Some("google-7"));

        // All three lookups now resolve to the same identity.
        let by_fed = store.get_by_federated_id("google-7").await.unwrap();
        let by_id = store.get_by_id(registered.id).await.unwrap();
        assert_eq!(by_fed.id, registered.id);
        assert_eq!(by_id.federated_id.as_deref(), Some("google-7"));

        // Password login still works after linking.
        let again = svc.login("both@example.com", "password123").await.unwrap();
        assert_eq!(again.id, registered.id);

        let relinked = svc
            .login_with_federated_provider("google-7", "both@example.com")
            .await
            .unwrap();
        assert_eq!(relinked.id, registered.id);
    }

    #[tokio::test]
    async fn federated_login_replaces_previously_linked_provider_id() {
        let (svc, store) = make_service();
        let registered = svc.register("e@example.com", "password123").await.unwrap();
        svc.login_with_federated_provider("google-1", "e@example.com")
            .await
            .unwrap();

        let relinked = svc
            .login_with_federated_provider("google-2", "e@example.com")
            .await
            .unwrap();
        assert_eq!(relinked.id, registered.id);
        assert_eq!(relinked.federated_id.as_deref(), Some("google-2"));

        assert_eq!(store.get_by_federated_id("google-2").await.unwrap().id, registered.id);
        assert!(matches!(
            store.get_by_federated_id("google-1").await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn token_pair_carries_user_identity() {
        let (svc, _) = make_service();
        let user = svc.register("tok@example.com", "password123").await.unwrap();
        let pair = svc.generate_token_pair(&user).unwrap();

        let claims = svc.tokens().validate_access_token(&pair.access_token).unwrap();
        assert_eq!(claims.user_id, user.id);
        assert_eq!(claims.email, user.email);
        assert_eq!(svc.tokens().validate_refresh_token(&pair.refresh_token).unwrap(), user.id);
    }

    #[tokio::test]
    async fn refresh_issues_new_pair() {
        let (svc, _) = make_service();
        let user = svc.register("tok@example.com", "password123").await.unwrap();
        let pair = svc.generate_token_pair(&user).unwrap();

        let (refreshed_user, new_pair) = svc.refresh(&pair.refresh_token).await.unwrap();
        assert_eq!(refreshed_user.id, user.id);
        let claims = svc.tokens().validate_access_token(&new_pair.access_token).unwrap();
        assert_eq!(claims.user_id, user.id);

        let err = svc.refresh(&pair.access_token).await.unwrap_err();
        assert!(matches!(err, AppError::TokenMalformed));
    }

    #[tokio::test]
    async fn refresh_for_deleted_user_is_invalid() {
        let (svc, store) = make_service();
        let user = svc.register("gone@example.com", "password123").await.unwrap();
        let pair = svc.generate_token_pair(&user).unwrap();
        store.delete(user.id).await.unwrap();

        let err = svc.refresh(&pair.refresh_token).await.unwrap_err();
        assert!(matches!(err, AppError::TokenInvalid));
    }

    /// Lookups miss until `create` has been attempted; `create` always loses
    /// the unique-index race. After the failed create, federated lookups see
    /// `winner` if one is set.
    struct RacyStore {
        winner: Option<User>,
        create_attempted: std::sync::atomic::AtomicBool,
    }

    impl RacyStore {
        fn new(winner: Option<User>) -> Arc<Self> {
            Arc::new(Self {
                winner,
                create_attempted: std::sync::atomic::AtomicBool::new(false),
            })
        }

        fn lost_race(&self) -> bool {
            self.create_attempted.load(std::sync::atomic::Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl UserStore for RacyStore {
        async fn create(&self, _user: &User) -> Result<(), StoreError> {
            self.create_attempted
                .store(true, std::sync::atomic::Ordering::SeqCst);
            Err(StoreError::Conflict)
        }

        async fn get_by_id(&self, _id: Uuid) -> Result<User, StoreError> {
            Err(StoreError::NotFound)
        }

        async fn get_by_email(&self, _email: &str) -> Result<User, StoreError> {
            Err(StoreError::NotFound)
        }

        async fn get_by_federated_id(&self, _federated_id: &str) -> Result<User, StoreError> {
            match (&self.winner, self.lost_race()) {
                (Some(winner), true) => Ok(winner.clone()),
                _ => Err(StoreError::NotFound),
            }
        }

        async fn update(&self, _user: &User) -> Result<(), StoreError> {
            Err(StoreError::NotFound)
        }

        async fn delete(&self, _id: Uuid) -> Result<(), StoreError> {
            Err(StoreError::NotFound)
        }
    }

    fn racy_service(store: Arc<RacyStore>) -> IdentityService {
        let tokens = TokenService::new(
            "test-secret",
            Duration::from_secs(60),
            Duration::from_secs(60),
        );
        IdentityService::new(store, tokens)
    }

    #[tokio::test]
    async fn register_losing_unique_race_is_already_exists() {
        let svc = racy_service(RacyStore::new(None));
        let err = svc.register("race@example.com", "password123").await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyExists));
    }

    #[tokio::test]
    async fn federated_create_conflict_returns_concurrent_winner() {
        let mut winner = User::new("race@example.com");
        winner.federated_id = Some("google-9".into());
        let svc = racy_service(RacyStore::new(Some(winner.clone())));

        let user = svc
            .login_with_federated_provider("google-9", "race@example.com")
            .await
            .unwrap();
        assert_eq!(user.id, winner.id);
    }

    #[tokio::test]
    async fn federated_create_conflict_without_winner_is_already_exists() {
        let svc = racy_service(RacyStore::new(None));
        let err = svc
            .login_with_federated_provider("google-9", "race@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AlreadyExists));
    }
}
