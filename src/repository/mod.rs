//! Repository layer: one capability trait per aggregate, with in-memory and
//! Postgres implementations behind the same `Repository` container.

pub mod appointments;
pub mod customers;
pub mod memory;
pub mod schedules;
pub mod services;
pub mod shops;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{
        Appointment, Customer, NewScheduleRule, ScheduleRuleRecord, Service, Shop, TimeRange, WeeklyRule,
    },
};

/// Shop lookup. Shops come back with their services and weekly rules loaded.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShopRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Shop>>;
    async fn find_by_slug(&self, slug: &str) -> AppResult<Option<Shop>>;
    async fn find_by_owner_id(&self, owner_id: i32) -> AppResult<Vec<Shop>>;
    /// Insert a new shop (services and rules are stored through their own repositories)
    async fn create(&self, shop: Shop) -> AppResult<Shop>;
    /// Persist the shop's own fields
    async fn update(&self, shop: Shop) -> AppResult<Shop>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ServiceRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Service>>;
    async fn find_by_shop_id(&self, shop_id: i32) -> AppResult<Vec<Service>>;
    async fn create(&self, service: Service) -> AppResult<Service>;
    async fn update(&self, service: Service) -> AppResult<Service>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScheduleRuleRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> AppResult<Option<ScheduleRuleRecord>>;
    /// All rules of a shop, ordered by day then position
    async fn find_by_shop_id(&self, shop_id: i32) -> AppResult<Vec<ScheduleRuleRecord>>;
    async fn find_by_shop_and_day(
        &self,
        shop_id: i32,
        day_of_week: u8,
    ) -> AppResult<Vec<ScheduleRuleRecord>>;
    async fn create(&self, rule: NewScheduleRule) -> AppResult<ScheduleRuleRecord>;
    async fn update(&self, id: i32, rule: WeeklyRule) -> AppResult<ScheduleRuleRecord>;
    /// Returns false when nothing was deleted
    async fn delete(&self, id: i32) -> AppResult<bool>;
}

/// Customers are unique by email and by phone
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Customer>>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<Customer>>;
    async fn find_by_phone(&self, phone: &str) -> AppResult<Option<Customer>>;
    async fn create(&self, customer: Customer) -> AppResult<Customer>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Appointment>>;
    async fn find_by_cancel_token(&self, cancel_token: &str) -> AppResult<Option<Appointment>>;
    async fn find_by_customer_id(&self, customer_id: i32) -> AppResult<Vec<Appointment>>;
    async fn find_by_shop_id(&self, shop_id: i32) -> AppResult<Vec<Appointment>>;
    /// Appointments of any status starting in `[start, end)`, ordered by start
    async fn find_by_date_range(
        &self,
        shop_id: i32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<Appointment>>;
    async fn create(&self, appointment: Appointment) -> AppResult<Appointment>;
    /// Full replace of a persisted appointment
    async fn update(&self, appointment: Appointment) -> AppResult<Appointment>;
    async fn delete(&self, id: i32) -> AppResult<bool>;
    /// Whether a non-canceled appointment of the shop overlaps `range`,
    /// ignoring `exclude_id` when given
    async fn check_for_conflicts(
        &self,
        shop_id: i32,
        range: TimeRange,
        exclude_id: Option<i32>,
    ) -> AppResult<bool>;
}

/// Main repository struct holding one handle per aggregate store
#[derive(Clone)]
pub struct Repository {
    pub shops: Arc<dyn ShopRepository>,
    pub services: Arc<dyn ServiceRepository>,
    pub schedules: Arc<dyn ScheduleRuleRepository>,
    pub customers: Arc<dyn CustomerRepository>,
    pub appointments: Arc<dyn AppointmentRepository>,
}

impl Repository {
    /// Repositories backed by the given Postgres pool
    pub fn postgres(pool: Pool<Postgres>) -> Self {
        Self {
            shops: Arc::new(shops::ShopsRepository::new(pool.clone())),
            services: Arc::new(services::ServicesRepository::new(pool.clone())),
            schedules: Arc::new(schedules::SchedulesRepository::new(pool.clone())),
            customers: Arc::new(customers::CustomersRepository::new(pool.clone())),
            appointments: Arc::new(appointments::AppointmentsRepository::new(pool)),
        }
    }

    /// Repositories sharing one in-process store
    pub fn in_memory() -> Self {
        Self::from_memory(memory::InMemoryStore::default())
    }

    pub fn from_memory(store: memory::InMemoryStore) -> Self {
        Self {
            shops: Arc::new(store.clone()),
            services: Arc::new(store.clone()),
            schedules: Arc::new(store.clone()),
            customers: Arc::new(store.clone()),
            appointments: Arc::new(store),
        }
    }
}
