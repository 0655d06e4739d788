//! Shops (Postgres)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use super::{schedules, services, ShopRepository};
use crate::{
    error::{AppError, AppResult},
    models::{NewShop, Shop},
};

const SHOP_COLUMNS: &str =
    "id, name, slug, description, address, logo_url, owner_id, timezone, created_at, updated_at";

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, sqlx::FromRow)]
struct ShopRow {
    id: i32,
    name: String,
    slug: String,
    description: Option<String>,
    address: Option<String>,
    logo_url: Option<String>,
    owner_id: i32,
    timezone: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct ShopsRepository {
    pool: Pool<Postgres>,
}

impl ShopsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Attach services and rules to a shop row
    async fn load(&self, row: ShopRow) -> AppResult<Shop> {
        let services = services::load_for_shop(&self.pool, row.id).await?;
        let rules = schedules::load_for_shop(&self.pool, row.id)
            .await?
            .into_iter()
            .map(|r| r.rule)
            .collect();
        Shop::restore(
            row.id,
            NewShop {
                name: row.name,
                slug: row.slug,
                description: row.description,
                address: row.address,
                logo_url: row.logo_url,
                owner_id: row.owner_id,
                timezone: Some(row.timezone),
            },
            row.created_at,
            row.updated_at,
            services,
            rules,
        )
    }
}

fn slug_taken(err: sqlx::Error, slug: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            AppError::Validation(format!("slug '{}' is already taken", slug))
        }
        _ => AppError::Database(err),
    }
}

#[async_trait]
impl ShopRepository for ShopsRepository {
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Shop>> {
        let row = sqlx::query_as::<_, ShopRow>(&format!(
            "SELECT {} FROM barbershops WHERE id = $1",
            SHOP_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(Some(self.load(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_slug(&self, slug: &str) -> AppResult<Option<Shop>> {
        let row = sqlx::query_as::<_, ShopRow>(&format!(
            "SELECT {} FROM barbershops WHERE slug = $1",
            SHOP_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(Some(self.load(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_owner_id(&self, owner_id: i32) -> AppResult<Vec<Shop>> {
        let rows = sqlx::query_as::<_, ShopRow>(&format!(
            "SELECT {} FROM barbershops WHERE owner_id = $1 ORDER BY id",
            SHOP_COLUMNS
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        let mut shops = Vec::with_capacity(rows.len());
        for row in rows {
            shops.push(self.load(row).await?);
        }
        Ok(shops)
    }

    async fn create(&self, shop: Shop) -> AppResult<Shop> {
        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO barbershops (name, slug, description, address, logo_url, owner_id,
                                     timezone, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(shop.name())
        .bind(shop.slug())
        .bind(shop.description())
        .bind(shop.address())
        .bind(shop.logo_url())
        .bind(shop.owner_id())
        .bind(shop.timezone())
        .bind(shop.created_at())
        .bind(shop.updated_at())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| slug_taken(e, shop.slug()))?;
        Ok(shop.with_id(id).with_children(Vec::new(), Vec::new()))
    }

    async fn update(&self, shop: Shop) -> AppResult<Shop> {
        let id = shop.persisted_id()?;
        let result = sqlx::query(
            r#"
            UPDATE barbershops
            SET name = $1, slug = $2, description = $3, address = $4, logo_url = $5,
                timezone = $6, updated_at = $7
            WHERE id = $8
            "#,
        )
        .bind(shop.name())
        .bind(shop.slug())
        .bind(shop.description())
        .bind(shop.address())
        .bind(shop.logo_url())
        .bind(shop.timezone())
        .bind(shop.updated_at())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| slug_taken(e, shop.slug()))?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Shop {} not found", id)));
        }
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Shop {} not found", id)))
    }
}
