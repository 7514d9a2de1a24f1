use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Currency codes accepted for user defaults and transactions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Rub,
    Usd,
    Eur,
}

impl Currency {
    pub const fn code(self) -> &'static str {
        match self {
            Currency::Rub => "RUB",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<&str> for Currency {
    type Error = AppError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "RUB" => Ok(Currency::Rub),
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            other => Err(AppError::Validation(format!("unsupported currency: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_codes_case_insensitively() {
        assert_eq!(Currency::try_from("rub").unwrap(), Currency::Rub);
        assert_eq!(Currency::try_from(" USD ").unwrap(), Currency::Usd);
        assert_eq!(Currency::try_from("Eur").unwrap(), Currency::Eur);
    }

    #[test]
    fn rejects_unknown_code() {
        assert!(matches!(Currency::try_from("GBP"), Err(AppError::Validation(_))));
    }

    #[test]
    fn default_is_rub() {
        assert_eq!(Currency::default().code(), "RUB");
    }
}
