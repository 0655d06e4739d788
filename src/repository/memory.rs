//! In-process store implementing every repository trait.
//!
//! Used by tests and by `memory://` database URLs. Appointment writes enforce
//! the same no-overlap rule the Postgres exclusion constraint does.

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{
    AppointmentRepository, CustomerRepository, ScheduleRuleRepository, ServiceRepository,
    ShopRepository,
};
use crate::{
    error::{AppError, AppResult},
    models::{
        Appointment, Customer, NewScheduleRule, ScheduleRuleRecord, Service, Shop, TimeRange,
        WeeklyRule,
    },
};

#[derive(Default)]
struct Tables {
    shops: BTreeMap<i32, Shop>,
    services: BTreeMap<i32, Service>,
    rules: BTreeMap<i32, ScheduleRuleRecord>,
    customers: BTreeMap<i32, Customer>,
    appointments: BTreeMap<i32, Appointment>,
    last_shop_id: i32,
    last_service_id: i32,
    last_rule_id: i32,
    last_customer_id: i32,
    last_appointment_id: i32,
}

impl Tables {
    /// Shop with its services and rules attached
    fn load_shop(&self, shop: &Shop) -> Shop {
        let id = shop.id();
        let services = self
            .services
            .values()
            .filter(|s| Some(s.shop_id()) == id)
            .cloned()
            .collect();
        let rules = self
            .rules_of(shop.id().unwrap_or_default())
            .into_iter()
            .map(|r| r.rule)
            .collect();
        shop.clone().with_children(services, rules)
    }

    fn rules_of(&self, shop_id: i32) -> Vec<ScheduleRuleRecord> {
        let mut rules: Vec<ScheduleRuleRecord> = self
            .rules
            .values()
            .filter(|r| r.shop_id == shop_id)
            .cloned()
            .collect();
        rules.sort_by_key(|r| (r.rule.day_of_week(), r.order, r.rule.start_minutes()));
        rules
    }

    fn has_conflict(&self, shop_id: i32, range: &TimeRange, exclude_id: Option<i32>) -> bool {
        self.appointments.values().any(|a| {
            a.shop_id() == shop_id
                && a.id() != exclude_id
                && a.status().blocks_slot()
                && a.time_slot().overlaps(range)
        })
    }
}

/// Cloneable handle; clones share the same tables
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ShopRepository for InMemoryStore {
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Shop>> {
        let tables = self.tables.read().await;
        Ok(tables.shops.get(&id).map(|s| tables.load_shop(s)))
    }

    async fn find_by_slug(&self, slug: &str) -> AppResult<Option<Shop>> {
        let tables = self.tables.read().await;
        Ok(tables
            .shops
            .values()
            .find(|s| s.slug() == slug)
            .map(|s| tables.load_shop(s)))
    }

    async fn find_by_owner_id(&self, owner_id: i32) -> AppResult<Vec<Shop>> {
        let tables = self.tables.read().await;
        Ok(tables
            .shops
            .values()
            .filter(|s| s.is_owned_by(owner_id))
            .map(|s| tables.load_shop(s))
            .collect())
    }

    async fn create(&self, shop: Shop) -> AppResult<Shop> {
        let mut tables = self.tables.write().await;
        if tables.shops.values().any(|s| s.slug() == shop.slug()) {
            return Err(AppError::Validation(format!(
                "slug '{}' is already taken",
                shop.slug()
            )));
        }
        tables.last_shop_id += 1;
        let id = tables.last_shop_id;
        let shop = shop.with_id(id).with_children(Vec::new(), Vec::new());
        tables.shops.insert(id, shop.clone());
        Ok(shop)
    }

    async fn update(&self, shop: Shop) -> AppResult<Shop> {
        let id = shop.persisted_id()?;
        let mut tables = self.tables.write().await;
        if tables.shops.values().any(|s| s.slug() == shop.slug() && s.id() != Some(id)) {
            return Err(AppError::Validation(format!(
                "slug '{}' is already taken",
                shop.slug()
            )));
        }
        let stored = tables
            .shops
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Shop {} not found", id)))?;
        *stored = shop.with_children(Vec::new(), Vec::new());
        let stored = stored.clone();
        Ok(tables.load_shop(&stored))
    }
}

#[async_trait]
impl ServiceRepository for InMemoryStore {
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Service>> {
        Ok(self.tables.read().await.services.get(&id).cloned())
    }

    async fn find_by_shop_id(&self, shop_id: i32) -> AppResult<Vec<Service>> {
        Ok(self
            .tables
            .read()
            .await
            .services
            .values()
            .filter(|s| s.shop_id() == shop_id)
            .cloned()
            .collect())
    }

    async fn create(&self, service: Service) -> AppResult<Service> {
        let mut tables = self.tables.write().await;
        if !tables.shops.contains_key(&service.shop_id()) {
            return Err(AppError::NotFound(format!("Shop {} not found", service.shop_id())));
        }
        tables.last_service_id += 1;
        let id = tables.last_service_id;
        let service = service.with_id(id);
        tables.services.insert(id, service.clone());
        Ok(service)
    }

    async fn update(&self, service: Service) -> AppResult<Service> {
        let id = service.persisted_id()?;
        let mut tables = self.tables.write().await;
        let stored = tables
            .services
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Service {} not found", id)))?;
        *stored = service.clone();
        Ok(service)
    }
}

#[async_trait]
impl ScheduleRuleRepository for InMemoryStore {
    async fn find_by_id(&self, id: i32) -> AppResult<Option<ScheduleRuleRecord>> {
        Ok(self.tables.read().await.rules.get(&id).cloned())
    }

    async fn find_by_shop_id(&self, shop_id: i32) -> AppResult<Vec<ScheduleRuleRecord>> {
        Ok(self.tables.read().await.rules_of(shop_id))
    }

    async fn find_by_shop_and_day(
        &self,
        shop_id: i32,
        day_of_week: u8,
    ) -> AppResult<Vec<ScheduleRuleRecord>> {
        Ok(self
            .tables
            .read()
            .await
            .rules_of(shop_id)
            .into_iter()
            .filter(|r| r.rule.day_of_week() == day_of_week)
            .collect())
    }

    async fn create(&self, rule: NewScheduleRule) -> AppResult<ScheduleRuleRecord> {
        let mut tables = self.tables.write().await;
        if !tables.shops.contains_key(&rule.shop_id) {
            return Err(AppError::NotFound(format!("Shop {} not found", rule.shop_id)));
        }
        tables.last_rule_id += 1;
        let now = Utc::now();
        let record = ScheduleRuleRecord {
            id: tables.last_rule_id,
            shop_id: rule.shop_id,
            rule: rule.rule,
            order: rule.order,
            created_at: now,
            updated_at: now,
        };
        tables.rules.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update(&self, id: i32, rule: WeeklyRule) -> AppResult<ScheduleRuleRecord> {
        let mut tables = self.tables.write().await;
        let record = tables
            .rules
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Schedule rule {} not found", id)))?;
        record.rule = rule;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        Ok(self.tables.write().await.rules.remove(&id).is_some())
    }
}

#[async_trait]
impl CustomerRepository for InMemoryStore {
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Customer>> {
        Ok(self.tables.read().await.customers.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Customer>> {
        Ok(self
            .tables
            .read()
            .await
            .customers
            .values()
            .find(|c| c.email() == email)
            .cloned())
    }

    async fn find_by_phone(&self, phone: &str) -> AppResult<Option<Customer>> {
        Ok(self
            .tables
            .read()
            .await
            .customers
            .values()
            .find(|c| c.phone() == phone)
            .cloned())
    }

    async fn create(&self, customer: Customer) -> AppResult<Customer> {
        let mut tables = self.tables.write().await;
        if tables
            .customers
            .values()
            .any(|c| c.email() == customer.email() || c.phone() == customer.phone())
        {
            return Err(AppError::Validation(
                "a customer with this email or phone already exists".to_string(),
            ));
        }
        tables.last_customer_id += 1;
        let id = tables.last_customer_id;
        let customer = customer.with_id(id);
        tables.customers.insert(id, customer.clone());
        Ok(customer)
    }
}

#[async_trait]
impl AppointmentRepository for InMemoryStore {
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Appointment>> {
        Ok(self.tables.read().await.appointments.get(&id).cloned())
    }

    async fn find_by_cancel_token(&self, cancel_token: &str) -> AppResult<Option<Appointment>> {
        Ok(self
            .tables
            .read()
            .await
            .appointments
            .values()
            .find(|a| a.cancel_token() == cancel_token)
            .cloned())
    }

    async fn find_by_customer_id(&self, customer_id: i32) -> AppResult<Vec<Appointment>> {
        let tables = self.tables.read().await;
        let mut found: Vec<Appointment> = tables
            .appointments
            .values()
            .filter(|a| a.customer_id() == customer_id)
            .cloned()
            .collect();
        found.sort_by_key(|a| std::cmp::Reverse(a.start_time()));
        Ok(found)
    }

    async fn find_by_shop_id(&self, shop_id: i32) -> AppResult<Vec<Appointment>> {
        let tables = self.tables.read().await;
        let mut found: Vec<Appointment> = tables
            .appointments
            .values()
            .filter(|a| a.shop_id() == shop_id)
            .cloned()
            .collect();
        found.sort_by_key(|a| a.start_time());
        Ok(found)
    }

    async fn find_by_date_range(
        &self,
        shop_id: i32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<Appointment>> {
        let tables = self.tables.read().await;
        let mut found: Vec<Appointment> = tables
            .appointments
            .values()
            .filter(|a| a.shop_id() == shop_id && a.start_time() >= start && a.start_time() < end)
            .cloned()
            .collect();
        found.sort_by_key(|a| a.start_time());
        Ok(found)
    }

    async fn create(&self, appointment: Appointment) -> AppResult<Appointment> {
        let mut tables = self.tables.write().await;
        if appointment.status().blocks_slot()
            && tables.has_conflict(appointment.shop_id(), appointment.time_slot(), None)
        {
            return Err(AppError::SlotUnavailable(
                "The requested time slot is already booked".to_string(),
            ));
        }
        if tables
            .appointments
            .values()
            .any(|a| a.cancel_token() == appointment.cancel_token())
        {
            return Err(AppError::Internal("duplicate cancel token".to_string()));
        }
        tables.last_appointment_id += 1;
        let id = tables.last_appointment_id;
        let appointment = appointment.with_id(id);
        tables.appointments.insert(id, appointment.clone());
        Ok(appointment)
    }

    async fn update(&self, appointment: Appointment) -> AppResult<Appointment> {
        let id = appointment.persisted_id()?;
        let mut tables = self.tables.write().await;
        if !tables.appointments.contains_key(&id) {
            return Err(AppError::NotFound(format!("Appointment {} not found", id)));
        }
        if appointment.status().blocks_slot()
            && tables.has_conflict(appointment.shop_id(), appointment.time_slot(), Some(id))
        {
            return Err(AppError::SlotUnavailable(
                "The requested time slot is already booked".to_string(),
            ));
        }
        tables.appointments.insert(id, appointment.clone());
        Ok(appointment)
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        Ok(self.tables.write().await.appointments.remove(&id).is_some())
    }

    async fn check_for_conflicts(
        &self,
        shop_id: i32,
        range: TimeRange,
        exclude_id: Option<i32>,
    ) -> AppResult<bool> {
        Ok(self
            .tables
            .read()
            .await
            .has_conflict(shop_id, &range, exclude_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AppointmentStatus, CustomerContact, NewAppointment, NewShop};
    use chrono::TimeZone;

    fn range(sh: u32, sm: u32, eh: u32, em: u32) -> TimeRange {
        TimeRange::new(
            Utc.with_ymd_and_hms(2025, 3, 10, sh, sm, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 10, eh, em, 0).unwrap(),
        )
        .unwrap()
    }

    fn appointment(shop_id: i32, slot: TimeRange) -> Appointment {
        Appointment::new(NewAppointment {
            time_slot: slot,
            shop_id,
            service_id: 1,
            customer_id: 1,
            notes: None,
        })
        .unwrap()
    }

    fn shop(slug: &str) -> Shop {
        Shop::new(NewShop {
            name: "Navalha".to_string(),
            slug: slug.to_string(),
            description: None,
            address: None,
            logo_url: None,
            owner_id: 1,
            timezone: None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_conflict_check_ignores_canceled_and_excluded() {
        let store = InMemoryStore::new();
        let booked = AppointmentRepository::create(&store, appointment(1, range(10, 0, 10, 30)))
            .await
            .unwrap();
        let id = booked.persisted_id().unwrap();

        assert!(store.check_for_conflicts(1, range(10, 15, 10, 45), None).await.unwrap());
        assert!(!store.check_for_conflicts(1, range(10, 30, 11, 0), None).await.unwrap());
        assert!(!store.check_for_conflicts(2, range(10, 0, 10, 30), None).await.unwrap());
        assert!(!store.check_for_conflicts(1, range(10, 0, 10, 30), Some(id)).await.unwrap());

        let mut canceled = booked.clone();
        canceled.cancel(None).unwrap();
        AppointmentRepository::update(&store, canceled).await.unwrap();
        assert!(!store.check_for_conflicts(1, range(10, 0, 10, 30), None).await.unwrap());
    }

    #[tokio::test]
    async fn test_create_rejects_overlap() {
        let store = InMemoryStore::new();
        AppointmentRepository::create(&store, appointment(1, range(10, 0, 10, 30)))
            .await
            .unwrap();
        let err = AppointmentRepository::create(&store, appointment(1, range(10, 20, 10, 50)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::SlotUnavailable(_)));
    }

    #[tokio::test]
    async fn test_find_by_date_range_uses_start_time() {
        let store = InMemoryStore::new();
        for slot in [range(9, 0, 9, 30), range(11, 0, 11, 30), range(23, 0, 23, 45)] {
            AppointmentRepository::create(&store, appointment(1, slot)).await.unwrap();
        }
        let found = store
            .find_by_date_range(
                1,
                Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2025, 3, 10, 23, 0, 0).unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|a| a.status() == AppointmentStatus::Confirmed));
        assert!(found[0].start_time() < found[1].start_time());
    }

    #[tokio::test]
    async fn test_shop_loads_rules_in_day_order() {
        let store = InMemoryStore::new();
        let created = ShopRepository::create(&store, shop("navalha")).await.unwrap();
        let shop_id = created.persisted_id().unwrap();

        for (day, order, start, end) in [(2, 0, "09:00", "12:00"), (1, 1, "14:00", "18:00"), (1, 0, "09:00", "12:00")] {
            ScheduleRuleRepository::create(
                &store,
                NewScheduleRule {
                    shop_id,
                    rule: WeeklyRule::active(day, start, end).unwrap(),
                    order,
                },
            )
            .await
            .unwrap();
        }

        let loaded = store.find_by_slug("navalha").await.unwrap().unwrap();
        let days: Vec<(u8, String)> = loaded
            .schedule_rules()
            .iter()
            .map(|r| (r.day_of_week(), r.start_time()))
            .collect();
        assert_eq!(
            days,
            vec![(1, "09:00".into()), (1, "14:00".into()), (2, "09:00".into())]
        );
        assert!(ShopRepository::create(&store, shop("navalha")).await.is_err());
    }

    #[tokio::test]
    async fn test_customers_are_unique_by_email_and_phone() {
        let store = InMemoryStore::new();
        let contact = |email: &str, phone: &str| {
            Customer::new(CustomerContact {
                name: "Ana Souza".to_string(),
                email: email.to_string(),
                phone: phone.to_string(),
            })
            .unwrap()
        };

        let ana = CustomerRepository::create(&store, contact("ana@mail.com", "11988887777"))
            .await
            .unwrap();
        assert_eq!(ana.id(), Some(1));
        assert!(CustomerRepository::create(&store, contact("ana@mail.com", "11911112222"))
            .await
            .is_err());
        assert!(CustomerRepository::create(&store, contact("other@mail.com", "11988887777"))
            .await
            .is_err());

        let by_phone = store.find_by_phone("11988887777").await.unwrap().unwrap();
        assert_eq!(by_phone.email(), "ana@mail.com");
        assert!(store.find_by_email("nobody@mail.com").await.unwrap().is_none());
    }
}
