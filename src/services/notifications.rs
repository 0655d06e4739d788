//! Notifications driven by appointment events.
//!
//! A new booking notifies the customer and the shop owner; a cancellation
//! notifies the customer. Messages go through a [`NotificationGateway`]; the
//! bundled gateway only writes to the log.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use super::events::EventHandler;
use crate::{
    error::{AppError, AppResult},
    models::{Customer, DomainEvent, Shop},
    repository::Repository,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    Customer { id: i32, email: String, phone: String },
    /// Shop owner, addressed by account id
    Owner { id: i32 },
}

impl Recipient {
    fn customer(customer: &Customer) -> AppResult<Self> {
        Ok(Recipient::Customer {
            id: customer.persisted_id()?,
            email: customer.email().to_string(),
            phone: customer.phone().to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipient: Recipient,
    pub subject: String,
    pub body: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn send(&self, notification: Notification) -> AppResult<()>;
}

/// Gateway that logs each message instead of delivering it
pub struct LogGateway;

#[async_trait]
impl NotificationGateway for LogGateway {
    async fn send(&self, notification: Notification) -> AppResult<()> {
        match &notification.recipient {
            Recipient::Customer { id, email, .. } => tracing::info!(
                customer_id = id,
                %email,
                subject = %notification.subject,
                body = %notification.body,
                "Customer notification dispatched"
            ),
            Recipient::Owner { id } => tracing::info!(
                owner_id = id,
                subject = %notification.subject,
                body = %notification.body,
                "Owner notification dispatched"
            ),
        }
        Ok(())
    }
}

/// `(date, time)` of an instant in the shop's zone, e.g. `("14/03/2025", "09:30")`
pub fn local_date_time(instant: DateTime<Utc>, tz: Tz) -> (String, String) {
    let local = instant.with_timezone(&tz);
    (local.format("%d/%m/%Y").to_string(), local.format("%H:%M").to_string())
}

pub fn confirmation_message(
    shop: &Shop,
    service_name: &str,
    start_time: DateTime<Utc>,
    cancel_url: &str,
) -> (String, String) {
    let (date, time) = local_date_time(start_time, shop.tz());
    let subject = format!("Appointment confirmed at {}", shop.name());
    let body = format!(
        "Your {} at {} is confirmed for {} at {}.\nNeed to cancel? {}",
        service_name,
        shop.name(),
        date,
        time,
        cancel_url
    );
    (subject, body)
}

/// Heads-up for the shop owner about a new booking
pub fn new_booking_message(
    shop: &Shop,
    customer: &Customer,
    service_name: &str,
    start_time: DateTime<Utc>,
) -> (String, String) {
    let (date, time) = local_date_time(start_time, shop.tz());
    let subject = format!("New booking at {}", shop.name());
    let body = format!(
        "{} booked {} for {} at {}.\nContact: {} / {}",
        customer.name(),
        service_name,
        date,
        time,
        customer.email(),
        customer.phone()
    );
    (subject, body)
}

pub fn cancellation_message(
    shop: &Shop,
    service_name: &str,
    start_time: DateTime<Utc>,
    reason: Option<&str>,
) -> (String, String) {
    let (date, time) = local_date_time(start_time, shop.tz());
    let subject = format!("Appointment canceled at {}", shop.name());
    let mut body = format!(
        "Your {} at {} on {} at {} has been canceled.",
        service_name,
        shop.name(),
        date,
        time
    );
    if let Some(reason) = reason {
        body.push_str(&format!("\nReason: {}", reason));
    }
    (subject, body)
}

#[derive(Clone)]
pub struct AppointmentNotifier {
    repository: Repository,
    gateway: Arc<dyn NotificationGateway>,
    cancel_url_base: String,
}

impl AppointmentNotifier {
    pub fn new(
        repository: Repository,
        gateway: Arc<dyn NotificationGateway>,
        cancel_url_base: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            gateway,
            cancel_url_base: cancel_url_base.into(),
        }
    }

    pub fn cancel_url(&self, cancel_token: &str) -> String {
        format!("{}{}", self.cancel_url_base, cancel_token)
    }

    async fn shop_and_service(&self, shop_id: i32, service_id: i32) -> AppResult<(Shop, String)> {
        let shop = self
            .repository
            .shops
            .find_by_id(shop_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Shop {} not found", shop_id)))?;
        let service_name = shop
            .services()
            .iter()
            .find(|s| s.id() == Some(service_id))
            .map(|s| s.name().to_string())
            .ok_or_else(|| AppError::NotFound(format!("Service {} not found", service_id)))?;
        Ok((shop, service_name))
    }

    async fn customer(&self, customer_id: i32) -> AppResult<Customer> {
        self.repository
            .customers
            .find_by_id(customer_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Customer {} not found", customer_id)))
    }
}

#[async_trait]
impl EventHandler for AppointmentNotifier {
    async fn handle(&self, event: &DomainEvent) -> AppResult<()> {
        match event {
            DomainEvent::AppointmentCreated(created) => {
                let (shop, service_name) =
                    self.shop_and_service(created.shop_id, created.service_id).await?;
                let customer = self.customer(created.customer_id).await?;
                let cancel_url = self.cancel_url(&created.cancel_token);

                let (subject, body) =
                    confirmation_message(&shop, &service_name, created.start_time, &cancel_url);
                self.gateway
                    .send(Notification {
                        recipient: Recipient::customer(&customer)?,
                        subject,
                        body,
                    })
                    .await?;

                let (subject, body) =
                    new_booking_message(&shop, &customer, &service_name, created.start_time);
                self.gateway
                    .send(Notification {
                        recipient: Recipient::Owner { id: shop.owner_id() },
                        subject,
                        body,
                    })
                    .await
            }
            DomainEvent::AppointmentCanceled(canceled) => {
                let (shop, service_name) =
                    self.shop_and_service(canceled.shop_id, canceled.service_id).await?;
                let customer = self.customer(canceled.customer_id).await?;
                let (subject, body) = cancellation_message(
                    &shop,
                    &service_name,
                    canceled.start_time,
                    canceled.cancellation_reason.as_deref(),
                );
                self.gateway
                    .send(Notification {
                        recipient: Recipient::customer(&customer)?,
                        subject,
                        body,
                    })
                    .await
            }
        }
    }

    fn name(&self) -> &'static str {
        "appointment_notifier"
    }
}
