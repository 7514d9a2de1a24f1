use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::currency::Currency;
use crate::error::{AppError, AppResult};
use crate::transactions::repo_types::{Transaction, TransactionDraft};
use crate::transactions::services::{TransactionPage, DEFAULT_PAGE_LIMIT};

/// Body of `POST /transactions` and `PUT /transactions/:id`.
#[derive(Debug, Deserialize)]
pub struct TransactionRequest {
    pub amount: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    #[serde(default)]
    pub place_name: Option<String>,
    #[serde(default)]
    pub place_lat: Option<f64>,
    #[serde(default)]
    pub place_lon: Option<f64>,
    /// Manual category assignment, honoured on update only.
    #[serde(default)]
    pub category_id: Option<i32>,
}

impl TransactionRequest {
    pub fn into_draft(self) -> AppResult<TransactionDraft> {
        let description = self.description.trim().to_string();
        if description.is_empty() {
            return Err(AppError::Validation("description is required".into()));
        }
        if self.amount <= Decimal::ZERO {
            return Err(AppError::Validation("amount must be positive".into()));
        }
        let currency = match self.currency.as_deref() {
            Some(code) => Currency::try_from(code)?,
            None => Currency::default(),
        };
        Ok(TransactionDraft {
            amount: self.amount,
            currency,
            description,
            date: self.date,
            place_name: self.place_name,
            place_lat: self.place_lat,
            place_lon: self.place_lon,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub category_id: Option<i32>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub from: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub to: Option<OffsetDateTime>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    DEFAULT_PAGE_LIMIT
}

#[derive(Debug, Serialize)]
pub struct TransactionListResponse {
    pub items: Vec<Transaction>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

impl From<TransactionPage> for TransactionListResponse {
    fn from(page: TransactionPage) -> Self {
        Self {
            items: page.items,
            total: page.total,
            limit: page.limit,
            offset: page.offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: &str) -> TransactionRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn request_becomes_draft_with_default_currency() {
        let draft = request(
            r#"{"amount": "12.50", "description": "  Coffee  ", "date": "2024-03-01T10:00:00Z"}"#,
        )
        .into_draft()
        .unwrap();
        assert_eq!(draft.amount, Decimal::new(1250, 2));
        assert_eq!(draft.currency, Currency::Rub);
        assert_eq!(draft.description, "Coffee");
    }

    #[test]
    fn request_validation() {
        let no_desc = request(r#"{"amount": 5, "description": " ", "date": "2024-03-01T10:00:00Z"}"#);
        assert!(matches!(no_desc.into_draft(), Err(AppError::Validation(_))));

        let negative = request(r#"{"amount": -5, "description": "x", "date": "2024-03-01T10:00:00Z"}"#);
        assert!(matches!(negative.into_draft(), Err(AppError::Validation(_))));

        let bad_currency = request(
            r#"{"amount": 5, "currency": "GBP", "description": "x", "date": "2024-03-01T10:00:00Z"}"#,
        );
        assert!(matches!(bad_currency.into_draft(), Err(AppError::Validation(_))));
    }
}
