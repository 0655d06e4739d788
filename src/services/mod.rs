//! Business logic services

pub mod appointments;
pub mod availability;
pub mod customers;
pub mod events;
pub mod notifications;
pub mod schedules;
pub mod shops;

use std::sync::Arc;

use crate::{config::NotificationsConfig, models::EventKind, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub shops: shops::ShopsService,
    pub availability: availability::AvailabilityService,
    pub customers: customers::CustomersService,
    pub schedules: schedules::SchedulesService,
    pub appointments: appointments::AppointmentsService,
    pub events: events::EventBus,
}

impl Services {
    /// Create all services with the given repository and event bus
    pub fn new(repository: Repository, events: events::EventBus) -> Self {
        let shops = shops::ShopsService::new(repository.clone());
        let availability = availability::AvailabilityService::new(repository.clone());
        let customers = customers::CustomersService::new(repository.clone());
        Self {
            schedules: schedules::SchedulesService::new(repository.clone(), shops.clone()),
            appointments: appointments::AppointmentsService::new(
                repository,
                shops.clone(),
                customers.clone(),
                availability.clone(),
                events.clone(),
            ),
            shops,
            availability,
            customers,
            events,
        }
    }

    /// Services with customer notifications subscribed to appointment events
    pub fn with_notifications(repository: Repository, config: &NotificationsConfig) -> Self {
        let notifier = Arc::new(notifications::AppointmentNotifier::new(
            repository.clone(),
            Arc::new(notifications::LogGateway),
            config.cancel_url_base.clone(),
        ));
        let events = events::EventBus::builder()
            .subscribe(EventKind::AppointmentCreated, notifier.clone())
            .subscribe(EventKind::AppointmentCanceled, notifier)
            .build();
        Self::new(repository, events)
    }
}
