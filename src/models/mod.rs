//! Data models for BarberFlow

pub mod appointment;
pub mod customer;
pub mod event;
pub mod money;
pub mod schedule;
pub mod service;
pub mod shop;
pub mod time_range;
pub mod weekly_rule;

// Re-export commonly used types
pub use appointment::{
    Appointment, AppointmentRecord, AppointmentResponse, AppointmentStatus, BookAppointment,
    BookingConfirmation, CancelAppointment, NewAppointment, UpdateAppointment,
};
pub use customer::{Customer, CustomerContact};
pub use event::{AppointmentCanceled, AppointmentCreated, DomainEvent, EventKind};
pub use money::Money;
pub use schedule::{NewScheduleRule, ScheduleRuleRecord};
pub use service::{NewService, Service};
pub use shop::{NewShop, Shop};
pub use time_range::TimeRange;
pub use weekly_rule::WeeklyRule;
