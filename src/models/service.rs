//! Bookable service offered by a shop

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::money::Money;
use crate::error::{AppError, AppResult};

/// A service (haircut, beard trim, ...) owned by exactly one shop
#[derive(Debug, Clone, Serialize)]
pub struct Service {
    id: Option<i32>,
    shop_id: i32,
    name: String,
    description: Option<String>,
    price: Money,
    duration_minutes: u32,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Fields needed to create a service
#[derive(Debug, Clone)]
pub struct NewService {
    pub shop_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub duration_minutes: u32,
}

impl Service {
    pub fn new(data: NewService) -> AppResult<Self> {
        validate_name(&data.name)?;
        validate_duration(data.duration_minutes)?;
        validate_price(&data.price)?;
        if data.shop_id <= 0 {
            return Err(AppError::Validation("invalid shop id".to_string()));
        }

        let now = Utc::now();
        Ok(Self {
            id: None,
            shop_id: data.shop_id,
            name: data.name,
            description: data.description,
            price: data.price,
            duration_minutes: data.duration_minutes,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rebuild a persisted service
    pub fn restore(
        id: i32,
        data: NewService,
        is_active: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        let mut service = Self::new(data)?;
        service.id = Some(id);
        service.is_active = is_active;
        service.created_at = created_at;
        service.updated_at = updated_at;
        Ok(service)
    }

    /// Assign the id given by the store on first insert
    pub fn with_id(mut self, id: i32) -> Self {
        self.id = Some(id);
        self
    }

    pub fn id(&self) -> Option<i32> {
        self.id
    }

    /// Id of a persisted service
    pub fn persisted_id(&self) -> AppResult<i32> {
        self.id
            .ok_or_else(|| AppError::Internal(format!("service '{}' has not been persisted", self.name)))
    }

    pub fn shop_id(&self) -> i32 {
        self.shop_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn price(&self) -> &Money {
        &self.price
    }

    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn set_name(&mut self, name: String) -> AppResult<()> {
        validate_name(&name)?;
        self.name = name;
        self.touch();
        Ok(())
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description;
        self.touch();
    }

    pub fn set_price(&mut self, price: Money) -> AppResult<()> {
        validate_price(&price)?;
        self.price = price;
        self.touch();
        Ok(())
    }

    pub fn set_duration_minutes(&mut self, duration_minutes: u32) -> AppResult<()> {
        validate_duration(duration_minutes)?;
        self.duration_minutes = duration_minutes;
        self.touch();
        Ok(())
    }

    pub fn activate(&mut self) {
        self.is_active = true;
        self.touch();
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn validate_name(name: &str) -> AppResult<()> {
    if name.trim().chars().count() < 3 {
        return Err(AppError::Validation(
            "service name must be at least 3 characters".to_string(),
        ));
    }
    Ok(())
}

fn validate_duration(duration_minutes: u32) -> AppResult<()> {
    if duration_minutes == 0 {
        return Err(AppError::Validation(
            "service duration must be greater than 0 minutes".to_string(),
        ));
    }
    Ok(())
}

fn validate_price(price: &Money) -> AppResult<()> {
    if price.is_zero() {
        return Err(AppError::Validation("service price must be positive".to_string()));
    }
    Ok(())
}
