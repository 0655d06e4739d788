//! Customers (Postgres)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use super::CustomerRepository;
use crate::{
    error::{AppError, AppResult},
    models::{Customer, CustomerContact},
};

const CUSTOMER_COLUMNS: &str = "id, name, email, phone, created_at";

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: i32,
    name: String,
    email: String,
    phone: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<CustomerRow> for Customer {
    type Error = AppError;

    fn try_from(row: CustomerRow) -> AppResult<Self> {
        Customer::restore(
            row.id,
            CustomerContact {
                name: row.name,
                email: row.email,
                phone: row.phone,
            },
            row.created_at,
        )
    }
}

#[derive(Clone)]
pub struct CustomersRepository {
    pool: Pool<Postgres>,
}

impl CustomersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn find_by(&self, column: &str, value: &str) -> AppResult<Option<Customer>> {
        sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {} FROM customers WHERE {} = $1",
            CUSTOMER_COLUMNS, column
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await?
        .map(Customer::try_from)
        .transpose()
    }
}

#[async_trait]
impl CustomerRepository for CustomersRepository {
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Customer>> {
        sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {} FROM customers WHERE id = $1",
            CUSTOMER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Customer::try_from)
        .transpose()
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Customer>> {
        self.find_by("email", email).await
    }

    async fn find_by_phone(&self, phone: &str) -> AppResult<Option<Customer>> {
        self.find_by("phone", phone).await
    }

    async fn create(&self, customer: Customer) -> AppResult<Customer> {
        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO customers (name, email, phone, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(customer.name())
        .bind(customer.email())
        .bind(customer.phone())
        .bind(customer.created_at())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| match &err {
            sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                AppError::Validation("a customer with this email or phone already exists".to_string())
            }
            _ => AppError::Database(err),
        })?;
        Ok(customer.with_id(id))
    }
}
