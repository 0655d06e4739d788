//! Domain events emitted by the booking services

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Emitted once an appointment has been committed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppointmentCreated {
    pub appointment_id: i32,
    pub shop_id: i32,
    pub customer_id: i32,
    pub service_id: i32,
    pub start_time: DateTime<Utc>,
    pub cancel_token: String,
}

/// Emitted when an appointment is canceled, by the customer or the owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppointmentCanceled {
    pub appointment_id: i32,
    pub shop_id: i32,
    pub customer_id: i32,
    pub service_id: i32,
    pub start_time: DateTime<Utc>,
    pub cancellation_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    AppointmentCreated(AppointmentCreated),
    AppointmentCanceled(AppointmentCanceled),
}

/// Discriminant used to subscribe to one kind of event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    AppointmentCreated,
    AppointmentCanceled,
}

impl DomainEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            DomainEvent::AppointmentCreated(_) => EventKind::AppointmentCreated,
            DomainEvent::AppointmentCanceled(_) => EventKind::AppointmentCanceled,
        }
    }
}
