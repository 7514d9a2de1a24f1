use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::currency::Currency;

/// Transaction record in the database.
///
/// `is_confirmed` is true only when `category_id` was set with certainty
/// (a rule match or a manual choice). `user_id` never changes after insert.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub currency: Currency,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub place_name: Option<String>,
    pub place_lat: Option<f64>,
    pub place_lon: Option<f64>,
    pub category_id: Option<i32>,
    pub is_confirmed: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Caller-supplied fields of a transaction before it gets an id and owner.
#[derive(Debug, Clone)]
pub struct TransactionDraft {
    pub amount: Decimal,
    pub currency: Currency,
    pub description: String,
    pub date: OffsetDateTime,
    pub place_name: Option<String>,
    pub place_lat: Option<f64>,
    pub place_lon: Option<f64>,
}

/// Replacement fields for an update. A `category_id` here is a manual
/// assignment; without one the description is categorized again.
#[derive(Debug, Clone)]
pub struct TransactionPatch {
    pub draft: TransactionDraft,
    pub category_id: Option<i32>,
}

impl Transaction {
    /// Uncategorized transaction owned by `user_id`.
    pub fn from_draft(user_id: Uuid, draft: TransactionDraft) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            user_id,
            amount: draft.amount,
            currency: draft.currency,
            description: draft.description,
            date: draft.date,
            place_name: draft.place_name,
            place_lat: draft.place_lat,
            place_lon: draft.place_lon,
            category_id: None,
            is_confirmed: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrites the mutable fields and clears any category assignment.
    pub fn apply_draft(&mut self, draft: TransactionDraft) {
        self.amount = draft.amount;
        self.currency = draft.currency;
        self.description = draft.description;
        self.date = draft.date;
        self.place_name = draft.place_name;
        self.place_lat = draft.place_lat;
        self.place_lon = draft.place_lon;
        self.category_id = None;
        self.is_confirmed = false;
        self.updated_at = OffsetDateTime::now_utc();
    }
}

/// Listing filter. Date bounds are inclusive.
#[derive(Debug, Clone)]
pub struct TransactionFilter {
    pub user_id: Uuid,
    pub category_id: Option<i32>,
    pub from_date: Option<OffsetDateTime>,
    pub to_date: Option<OffsetDateTime>,
    pub limit: i64,
    pub offset: i64,
}

impl TransactionFilter {
    pub fn for_user(user_id: Uuid) -> Self {
        Self {
            user_id,
            category_id: None,
            from_date: None,
            to_date: None,
            limit: 20,
            offset: 0,
        }
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        tx.user_id == self.user_id
            && self.category_id.map_or(true, |c| tx.category_id == Some(c))
            && self.from_date.map_or(true, |from| tx.date >= from)
            && self.to_date.map_or(true, |to| tx.date <= to)
    }
}
