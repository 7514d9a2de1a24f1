use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{ListQuery, TransactionListResponse, TransactionRequest};
use crate::{
    auth::extractors::AuthUser,
    error::AppResult,
    state::AppState,
    transactions::repo_types::{Transaction, TransactionFilter, TransactionPatch},
};

// --- public routers ---

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/transactions", get(list_transactions))
        .route("/transactions/:id", get(get_transaction))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/transactions", post(create_transaction))
        .route(
            "/transactions/:id",
            axum::routing::put(update_transaction).delete(delete_transaction),
        )
}

// --- handlers ---

#[instrument(skip(state))]
pub async fn list_transactions(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<ListQuery>,
) -> AppResult<Json<TransactionListResponse>> {
    let filter = TransactionFilter {
        category_id: q.category_id,
        from_date: q.from,
        to_date: q.to,
        limit: q.limit,
        offset: q.offset,
        ..TransactionFilter::for_user(user_id)
    };
    let page = state.transactions.list(filter).await?;
    Ok(Json(page.into()))
}

#[instrument(skip(state))]
pub async fn get_transaction(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Transaction>> {
    Ok(Json(state.transactions.get(user_id, id).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_transaction(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<TransactionRequest>,
) -> AppResult<(StatusCode, HeaderMap, Json<Transaction>)> {
    let draft = payload.into_draft()?;
    let tx = state.transactions.create(user_id, draft).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/api/v1/transactions/{}", tx.id)) {
        headers.insert(header::LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(tx)))
}

#[instrument(skip(state, payload))]
pub async fn update_transaction(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransactionRequest>,
) -> AppResult<Json<Transaction>> {
    let category_id = payload.category_id;
    let patch = TransactionPatch {
        draft: payload.into_draft()?,
        category_id,
    };
    Ok(Json(state.transactions.update(user_id, id, patch).await?))
}

#[instrument(skip(state))]
pub async fn delete_transaction(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.transactions.delete(user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
