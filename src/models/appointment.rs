//! Appointment aggregate and status lifecycle

use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use utoipa::ToSchema;
use validator::Validate;

use super::{customer::CustomerContact, time_range::TimeRange};
use crate::error::{AppError, AppResult};

/// Length of generated cancel tokens
pub const CANCEL_TOKEN_LEN: usize = 32;

/// Appointment status. Only `Confirmed` accepts transitions; the other three are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Confirmed,
    Canceled,
    Completed,
    NoShow,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Confirmed => "CONFIRMED",
            AppointmentStatus::Canceled => "CANCELED",
            AppointmentStatus::Completed => "COMPLETED",
            AppointmentStatus::NoShow => "NO_SHOW",
        }
    }

    /// Whether an appointment in this status occupies its time window
    pub fn blocks_slot(&self) -> bool {
        !matches!(self, AppointmentStatus::Canceled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONFIRMED" => Ok(AppointmentStatus::Confirmed),
            "CANCELED" => Ok(AppointmentStatus::Canceled),
            "COMPLETED" => Ok(AppointmentStatus::Completed),
            "NO_SHOW" => Ok(AppointmentStatus::NoShow),
            other => Err(AppError::InvalidAppointment(format!("unknown status '{}'", other))),
        }
    }
}

/// A customer's booking of one service at one shop
#[derive(Debug, Clone, Serialize)]
pub struct Appointment {
    id: Option<i32>,
    time_slot: TimeRange,
    status: AppointmentStatus,
    shop_id: i32,
    service_id: i32,
    customer_id: i32,
    cancel_token: String,
    cancellation_reason: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Fields needed to create an appointment
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub time_slot: TimeRange,
    pub shop_id: i32,
    pub service_id: i32,
    pub customer_id: i32,
    pub notes: Option<String>,
}

/// Full persisted state, used by repositories to rebuild an appointment
#[derive(Debug, Clone)]
pub struct AppointmentRecord {
    pub id: i32,
    pub time_slot: TimeRange,
    pub status: AppointmentStatus,
    pub shop_id: i32,
    pub service_id: i32,
    pub customer_id: i32,
    pub cancel_token: String,
    pub cancellation_reason: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// New confirmed appointment with a freshly generated cancel token
    pub fn new(data: NewAppointment) -> AppResult<Self> {
        validate_refs(data.shop_id, data.service_id, data.customer_id)?;

        let now = Utc::now();
        Ok(Self {
            id: None,
            time_slot: data.time_slot,
            status: AppointmentStatus::Confirmed,
            shop_id: data.shop_id,
            service_id: data.service_id,
            customer_id: data.customer_id,
            cancel_token: generate_cancel_token(),
            cancellation_reason: None,
            notes: data.notes,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn restore(record: AppointmentRecord) -> AppResult<Self> {
        validate_refs(record.shop_id, record.service_id, record.customer_id)?;
        if record.cancel_token.is_empty() {
            return Err(AppError::InvalidAppointment(format!(
                "appointment {} has no cancel token",
                record.id
            )));
        }

        Ok(Self {
            id: Some(record.id),
            time_slot: record.time_slot,
            status: record.status,
            shop_id: record.shop_id,
            service_id: record.service_id,
            customer_id: record.customer_id,
            cancel_token: record.cancel_token,
            cancellation_reason: record.cancellation_reason,
            notes: record.notes,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    /// Assign the id given by the store on first insert
    pub fn with_id(mut self, id: i32) -> Self {
        self.id = Some(id);
        self
    }

    pub fn id(&self) -> Option<i32> {
        self.id
    }

    /// Id of a persisted appointment
    pub fn persisted_id(&self) -> AppResult<i32> {
        self.id
            .ok_or_else(|| AppError::Internal("appointment has not been persisted".to_string()))
    }

    pub fn time_slot(&self) -> &TimeRange {
        &self.time_slot
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.time_slot.start()
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.time_slot.end()
    }

    pub fn duration_minutes(&self) -> i64 {
        self.time_slot.duration_minutes()
    }

    pub fn status(&self) -> AppointmentStatus {
        self.status
    }

    pub fn shop_id(&self) -> i32 {
        self.shop_id
    }

    pub fn service_id(&self) -> i32 {
        self.service_id
    }

    pub fn customer_id(&self) -> i32 {
        self.customer_id
    }

    pub fn cancel_token(&self) -> &str {
        &self.cancel_token
    }

    pub fn cancellation_reason(&self) -> Option<&str> {
        self.cancellation_reason.as_deref()
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_active(&self) -> bool {
        self.status == AppointmentStatus::Confirmed
    }

    /// Same shop and overlapping windows
    pub fn overlaps(&self, other: &Appointment) -> bool {
        self.shop_id == other.shop_id && self.time_slot.overlaps(&other.time_slot)
    }

    pub fn set_notes(&mut self, notes: Option<String>) {
        self.notes = notes;
        self.touch();
    }

    pub fn cancel(&mut self, reason: Option<String>) -> AppResult<()> {
        match self.status {
            AppointmentStatus::Confirmed => {}
            AppointmentStatus::Canceled => {
                return Err(transition_error("Appointment is already canceled"))
            }
            AppointmentStatus::Completed => {
                return Err(transition_error("Cannot cancel a completed appointment"))
            }
            AppointmentStatus::NoShow => {
                return Err(transition_error(
                    "Cannot cancel an appointment marked as no-show",
                ))
            }
        }
        self.status = AppointmentStatus::Canceled;
        self.cancellation_reason = reason;
        self.touch();
        Ok(())
    }

    pub fn complete(&mut self) -> AppResult<()> {
        match self.status {
            AppointmentStatus::Confirmed => {}
            AppointmentStatus::Canceled => {
                return Err(transition_error("Cannot complete a canceled appointment"))
            }
            AppointmentStatus::Completed => {
                return Err(transition_error("Appointment is already completed"))
            }
            AppointmentStatus::NoShow => {
                return Err(transition_error(
                    "Cannot complete an appointment marked as no-show",
                ))
            }
        }
        self.status = AppointmentStatus::Completed;
        self.touch();
        Ok(())
    }

    pub fn mark_as_no_show(&mut self) -> AppResult<()> {
        match self.status {
            AppointmentStatus::Confirmed => {}
            AppointmentStatus::Canceled => {
                return Err(transition_error(
                    "Cannot mark a canceled appointment as no-show",
                ))
            }
            AppointmentStatus::Completed => {
                return Err(transition_error(
                    "Cannot mark a completed appointment as no-show",
                ))
            }
            AppointmentStatus::NoShow => {
                return Err(transition_error("Appointment is already marked as no-show"))
            }
        }
        self.status = AppointmentStatus::NoShow;
        self.touch();
        Ok(())
    }

    /// Apply the transition leading to `target`
    pub fn transition_to(&mut self, target: AppointmentStatus, reason: Option<String>) -> AppResult<()> {
        match target {
            AppointmentStatus::Canceled => self.cancel(reason),
            AppointmentStatus::Completed => self.complete(),
            AppointmentStatus::NoShow => self.mark_as_no_show(),
            AppointmentStatus::Confirmed => Err(transition_error(
                "Appointments cannot be moved back to confirmed",
            )),
        }
    }

    /// Move a confirmed appointment to a new window. Conflict checks are the
    /// caller's job (booking guard with this appointment excluded).
    pub fn reschedule(&mut self, time_slot: TimeRange) -> AppResult<()> {
        if !self.is_active() {
            return Err(transition_error(&format!(
                "Cannot reschedule an appointment in status {}",
                self.status
            )));
        }
        self.time_slot = time_slot;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Public booking request; the window ends after the service duration
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BookAppointment {
    #[validate(range(min = 1, message = "service_id must be positive"))]
    pub service_id: i32,
    /// Matched to an existing customer by email, then phone
    #[validate(nested)]
    pub customer: CustomerContact,
    /// Start of the chosen slot (RFC 3339)
    pub start_time: DateTime<Utc>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

/// Owner-side edit; absent fields are left untouched
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateAppointment {
    /// Target status (CANCELED, COMPLETED or NO_SHOW)
    pub status: Option<AppointmentStatus>,
    #[validate(length(max = 500))]
    pub cancellation_reason: Option<String>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
    /// New start; the duration is kept
    pub start_time: Option<DateTime<Utc>>,
}

/// Customer cancellation by token
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct CancelAppointment {
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

/// Appointment as returned by the API
#[derive(Debug, Serialize, ToSchema)]
pub struct AppointmentResponse {
    pub id: i32,
    pub shop_id: i32,
    pub service_id: i32,
    pub customer_id: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
}

impl From<&Appointment> for AppointmentResponse {
    fn from(a: &Appointment) -> Self {
        Self {
            id: a.id.unwrap_or_default(),
            shop_id: a.shop_id,
            service_id: a.service_id,
            customer_id: a.customer_id,
            start_time: a.start_time(),
            end_time: a.end_time(),
            status: a.status,
            notes: a.notes.clone(),
            cancellation_reason: a.cancellation_reason.clone(),
        }
    }
}

/// Returned to the customer after booking; the only place the cancel token is exposed
#[derive(Debug, Serialize, ToSchema)]
pub struct BookingConfirmation {
    pub appointment: AppointmentResponse,
    pub cancel_token: String,
}

impl From<&Appointment> for BookingConfirmation {
    fn from(a: &Appointment) -> Self {
        Self {
            appointment: a.into(),
            cancel_token: a.cancel_token.clone(),
        }
    }
}

fn transition_error(message: &str) -> AppError {
    AppError::InvalidTransition(message.to_string())
}

fn validate_refs(shop_id: i32, service_id: i32, customer_id: i32) -> AppResult<()> {
    if shop_id <= 0 {
        return Err(AppError::InvalidAppointment("invalid shop id".to_string()));
    }
    if service_id <= 0 {
        return Err(AppError::InvalidAppointment("invalid service id".to_string()));
    }
    if customer_id <= 0 {
        return Err(AppError::InvalidAppointment("invalid customer id".to_string()));
    }
    Ok(())
}

fn generate_cancel_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CANCEL_TOKEN_LEN)
        .map(char::from)
        .collect()
}
