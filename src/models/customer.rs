//! Customer who books appointments through a shop's public page

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::{AppError, AppResult};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid regex"));

#[derive(Debug, Clone, Serialize)]
pub struct Customer {
    id: Option<i32>,
    name: String,
    email: String,
    phone: String,
    created_at: DateTime<Utc>,
}

/// Contact details given with a public booking
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CustomerContact {
    #[validate(length(min = 2, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    /// Any formatting is accepted; only digits and a leading `+` are kept
    #[validate(length(min = 8, max = 30))]
    pub phone: String,
}

impl Customer {
    pub fn new(contact: CustomerContact) -> AppResult<Self> {
        let name = contact.name.trim().to_string();
        if name.chars().count() < 2 {
            return Err(AppError::Validation(
                "customer name must be at least 2 characters".to_string(),
            ));
        }
        let email = normalize_email(&contact.email)?;
        let phone = normalize_phone(&contact.phone)?;

        Ok(Self {
            id: None,
            name,
            email,
            phone,
            created_at: Utc::now(),
        })
    }

    /// Rebuild a persisted customer
    pub fn restore(id: i32, contact: CustomerContact, created_at: DateTime<Utc>) -> AppResult<Self> {
        let mut customer = Self::new(contact)?;
        customer.id = Some(id);
        customer.created_at = created_at;
        Ok(customer)
    }

    pub fn with_id(mut self, id: i32) -> Self {
        self.id = Some(id);
        self
    }

    pub fn id(&self) -> Option<i32> {
        self.id
    }

    pub fn persisted_id(&self) -> AppResult<i32> {
        self.id.ok_or_else(|| {
            AppError::Internal(format!("customer '{}' has not been persisted", self.email))
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Lowercased, trimmed email
pub fn normalize_email(email: &str) -> AppResult<String> {
    let email = email.trim().to_lowercase();
    if !EMAIL_RE.is_match(&email) {
        return Err(AppError::Validation(format!("invalid email '{}'", email)));
    }
    Ok(email)
}

/// Digits only, keeping a leading `+`: `"+55 (11) 99999-0000"` -> `"+5511999990000"`
pub fn normalize_phone(phone: &str) -> AppResult<String> {
    let trimmed = phone.trim();
    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    if digits.len() < 8 || digits.len() > 15 {
        return Err(AppError::Validation(format!("invalid phone number '{}'", phone)));
    }
    if trimmed.starts_with('+') {
        Ok(format!("+{}", digits))
    } else {
        Ok(digits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(email: &str, phone: &str) -> CustomerContact {
        CustomerContact {
            name: " João Silva ".to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
        }
    }

    #[test]
    fn test_contact_is_normalized() {
        let customer = Customer::new(contact(" Joao@Example.COM", "+55 (11) 99999-0000")).unwrap();
        assert_eq!(customer.name(), "João Silva");
        assert_eq!(customer.email(), "joao@example.com");
        assert_eq!(customer.phone(), "+5511999990000");

        let local = Customer::new(contact("a@b.co", "11 9999-0000")).unwrap();
        assert_eq!(local.phone(), "1199990000");
    }

    #[test]
    fn test_invalid_contact() {
        assert!(Customer::new(contact("not-an-email", "11999990000")).is_err());
        assert!(Customer::new(contact("a@b.co", "123")).is_err());
        let mut nameless = contact("a@b.co", "11999990000");
        nameless.name = " ".to_string();
        assert!(Customer::new(nameless).is_err());
    }

    #[test]
    fn test_persisted_id() {
        let customer = Customer::new(contact("a@b.co", "11999990000")).unwrap();
        assert!(customer.persisted_id().is_err());
        assert_eq!(customer.with_id(5).persisted_id().unwrap(), 5);
    }
}
