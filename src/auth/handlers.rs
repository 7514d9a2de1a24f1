use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, LoginRequest, MessageResponse, PublicUser, RefreshRequest,
            RegisterRequest,
        },
        extractors::AuthUser,
    },
    error::{AppError, AppResult},
    state::AppState,
};

const MIN_PASSWORD_LEN: usize = 8;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(email: &str) -> AppResult<String> {
    let email = email.trim().to_lowercase();
    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(AppError::Validation("invalid email".into()));
    }
    Ok(email)
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<Json<AuthResponse>> {
    let email = normalize_email(&payload.email)?;
    if payload.password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AppError::Validation("password too short".into()));
    }

    let user = state.identity.register(&email, &payload.password).await?;
    let tokens = state.identity.generate_token_pair(&user)?;
    Ok(Json(AuthResponse::new(user, tokens)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    // A malformed email cannot belong to anyone.
    let email = normalize_email(&payload.email).map_err(|_| AppError::InvalidCredentials)?;

    let user = state.identity.login(&email, &payload.password).await?;
    let tokens = state.identity.generate_token_pair(&user)?;
    Ok(Json(AuthResponse::new(user, tokens)))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let (user, tokens) = state.identity.refresh(&payload.refresh_token).await?;
    info!(user_id = %user.id, "tokens refreshed");
    Ok(Json(AuthResponse::new(user, tokens)))
}

/// Tokens are stateless; the client discards them.
#[instrument(skip_all)]
pub async fn logout(AuthUser(user_id): AuthUser) -> Json<MessageResponse> {
    info!(%user_id, "user logged out");
    Json(MessageResponse {
        message: "logged out",
    })
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<PublicUser>> {
    let user = state.identity.current_user(user_id).await?;
    Ok(Json(user.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("test@example.com"));
        assert!(!is_valid_email("test.example.com"));
        assert!(!is_valid_email("a b@example.com"));
    }

    #[test]
    fn emails_are_trimmed_and_lowercased() {
        assert_eq!(
            normalize_email("  Test@Example.COM ").unwrap(),
            "test@example.com"
        );
        assert!(matches!(normalize_email("nope"), Err(AppError::Validation(_))));
    }

    #[test]
    fn me_response_hides_credentials() {
        let mut user = crate::auth::repo_types::User::new("test@example.com");
        user.password_hash = Some("secret-hash".into());
        let json = serde_json::to_string(&PublicUser::from(user)).unwrap();
        assert!(json.contains("test@example.com"));
        assert!(json.contains("\"default_currency\":\"RUB\""));
        assert!(!json.contains("secret-hash"));
    }
}
