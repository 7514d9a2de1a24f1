use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{CreateRuleRequest, RuleResponse};
use crate::{
    auth::extractors::AuthUser,
    categories::repo_types::Category,
    error::AppResult,
    state::AppState,
};

pub fn category_routes() -> Router<AppState> {
    Router::new().route("/categories", get(list_categories))
}

pub fn rule_routes() -> Router<AppState> {
    Router::new()
        .route("/category-rules", get(list_rules).post(create_rule))
        .route("/category-rules/:id", delete(delete_rule))
}

#[instrument(skip(state))]
pub async fn list_categories(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
) -> AppResult<Json<Vec<Category>>> {
    Ok(Json(state.categories.list_categories().await?))
}

#[instrument(skip(state))]
pub async fn list_rules(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Vec<RuleResponse>>> {
    let rules = state.categories.list_rules(user_id).await?;
    let categories = state.categories.list_categories().await?;
    Ok(Json(RuleResponse::with_names(rules, &categories)))
}

#[instrument(skip(state, payload))]
pub async fn create_rule(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateRuleRequest>,
) -> AppResult<(StatusCode, Json<RuleResponse>)> {
    let rule = state
        .categories
        .create_rule(user_id, &payload.keyword, payload.category_id)
        .await?;
    let category = state.categories.get_category(rule.category_id).await?;
    Ok((StatusCode::CREATED, Json(RuleResponse::new(rule, Some(category.name)))))
}

#[instrument(skip(state))]
pub async fn delete_rule(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.categories.delete_rule(user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
