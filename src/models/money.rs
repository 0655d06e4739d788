//! Monetary amount value object

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AppError, AppResult};

pub const DEFAULT_CURRENCY: &str = "BRL";

/// Non-negative amount rounded to cents, tagged with an ISO currency code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawMoney")]
pub struct Money {
    amount: Decimal,
    currency: String,
}

#[derive(Deserialize)]
struct RawMoney {
    amount: Decimal,
    #[serde(default = "default_currency")]
    currency: String,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

impl TryFrom<RawMoney> for Money {
    type Error = AppError;

    fn try_from(raw: RawMoney) -> Result<Self, Self::Error> {
        Money::new(raw.amount, &raw.currency)
    }
}

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> AppResult<Self> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(AppError::Validation("monetary amount cannot be negative".to_string()));
        }
        let currency = currency.trim().to_uppercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(AppError::Validation(format!("invalid currency code '{}'", currency)));
        }

        Ok(Self {
            amount: amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
            currency,
        })
    }

    pub fn brl(amount: Decimal) -> AppResult<Self> {
        Self::new(amount, DEFAULT_CURRENCY)
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    pub fn add(&self, other: &Money) -> AppResult<Money> {
        self.ensure_same_currency(other)?;
        Money::new(self.amount + other.amount, &self.currency)
    }

    pub fn subtract(&self, other: &Money) -> AppResult<Money> {
        self.ensure_same_currency(other)?;
        let result = self.amount - other.amount;
        if result.is_sign_negative() && !result.is_zero() {
            return Err(AppError::Validation(
                "operation would result in a negative amount".to_string(),
            ));
        }
        Money::new(result, &self.currency)
    }

    pub fn multiply(&self, factor: Decimal) -> AppResult<Money> {
        if factor.is_sign_negative() && !factor.is_zero() {
            return Err(AppError::Validation("multiplication factor cannot be negative".to_string()));
        }
        Money::new(self.amount * factor, &self.currency)
    }

    fn ensure_same_currency(&self, other: &Money) -> AppResult<()> {
        if self.currency != other.currency {
            return Err(AppError::Validation(format!(
                "cannot combine {} with {}",
                self.currency, other.currency
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:.2}", self.currency, self.amount)
    }
}
