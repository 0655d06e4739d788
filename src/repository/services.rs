//! Services offered by a shop (Postgres)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Pool, Postgres};

use super::ServiceRepository;
use crate::{
    error::{AppError, AppResult},
    models::{Money, NewService, Service},
};

const SERVICE_COLUMNS: &str = "id, barbershop_id, name, description, price, currency, \
     duration_minutes, is_active, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
pub(super) struct ServiceRow {
    id: i32,
    barbershop_id: i32,
    name: String,
    description: Option<String>,
    price: Decimal,
    currency: String,
    duration_minutes: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ServiceRow> for Service {
    type Error = AppError;

    fn try_from(row: ServiceRow) -> AppResult<Self> {
        let duration_minutes = u32::try_from(row.duration_minutes).map_err(|_| {
            AppError::Internal(format!("service {} has a negative duration", row.id))
        })?;
        Service::restore(
            row.id,
            NewService {
                shop_id: row.barbershop_id,
                name: row.name,
                description: row.description,
                price: Money::new(row.price, &row.currency)?,
                duration_minutes,
            },
            row.is_active,
            row.created_at,
            row.updated_at,
        )
    }
}

/// Services of a shop, active or not
pub(super) async fn load_for_shop(pool: &Pool<Postgres>, shop_id: i32) -> AppResult<Vec<Service>> {
    let rows = sqlx::query_as::<_, ServiceRow>(&format!(
        "SELECT {} FROM services WHERE barbershop_id = $1 ORDER BY id",
        SERVICE_COLUMNS
    ))
    .bind(shop_id)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(Service::try_from).collect()
}

#[derive(Clone)]
pub struct ServicesRepository {
    pool: Pool<Postgres>,
}

impl ServicesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ServiceRepository for ServicesRepository {
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Service>> {
        sqlx::query_as::<_, ServiceRow>(&format!(
            "SELECT {} FROM services WHERE id = $1",
            SERVICE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Service::try_from)
        .transpose()
    }

    async fn find_by_shop_id(&self, shop_id: i32) -> AppResult<Vec<Service>> {
        load_for_shop(&self.pool, shop_id).await
    }

    async fn create(&self, service: Service) -> AppResult<Service> {
        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO services (barbershop_id, name, description, price, currency,
                                  duration_minutes, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(service.shop_id())
        .bind(service.name())
        .bind(service.description())
        .bind(service.price().amount())
        .bind(service.price().currency())
        .bind(service.duration_minutes() as i32)
        .bind(service.is_active())
        .bind(service.created_at())
        .bind(service.updated_at())
        .fetch_one(&self.pool)
        .await?;
        Ok(service.with_id(id))
    }

    async fn update(&self, service: Service) -> AppResult<Service> {
        let id = service.persisted_id()?;
        let result = sqlx::query(
            r#"
            UPDATE services
            SET name = $1, description = $2, price = $3, currency = $4,
                duration_minutes = $5, is_active = $6, updated_at = $7
            WHERE id = $8
            "#,
        )
        .bind(service.name())
        .bind(service.description())
        .bind(service.price().amount())
        .bind(service.price().currency())
        .bind(service.duration_minutes() as i32)
        .bind(service.is_active())
        .bind(service.updated_at())
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Service {} not found", id)));
        }
        Ok(service)
    }
}
