//! Appointments (Postgres)
//!
//! The `appointments_no_overlap` exclusion constraint rejects overlapping
//! non-canceled rows of the same shop; violations surface as `SlotUnavailable`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use super::AppointmentRepository;
use crate::{
    error::{AppError, AppResult},
    models::{Appointment, AppointmentRecord, TimeRange},
};

const APPOINTMENT_COLUMNS: &str = "id, barbershop_id, service_id, customer_id, start_time, end_time, \
     status, cancel_token, cancellation_reason, notes, created_at, updated_at";

const EXCLUSION_VIOLATION: &str = "23P01";
const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Debug, sqlx::FromRow)]
struct AppointmentRow {
    id: i32,
    barbershop_id: i32,
    service_id: i32,
    customer_id: i32,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    status: String,
    cancel_token: String,
    cancellation_reason: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AppointmentRow> for Appointment {
    type Error = AppError;

    fn try_from(row: AppointmentRow) -> AppResult<Self> {
        Appointment::restore(AppointmentRecord {
            id: row.id,
            time_slot: TimeRange::new(row.start_time, row.end_time)?,
            status: row.status.parse()?,
            shop_id: row.barbershop_id,
            service_id: row.service_id,
            customer_id: row.customer_id,
            cancel_token: row.cancel_token,
            cancellation_reason: row.cancellation_reason,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Map a write error, turning overlap rejections into `SlotUnavailable`
fn map_write_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(EXCLUSION_VIOLATION) => {
            AppError::SlotUnavailable("The requested time slot is already booked".to_string())
        }
        sqlx::Error::Database(db) if db.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) => {
            AppError::NotFound("Referenced shop, service or customer not found".to_string())
        }
        _ => AppError::Database(err),
    }
}

fn into_appointments(rows: Vec<AppointmentRow>) -> AppResult<Vec<Appointment>> {
    rows.into_iter().map(Appointment::try_from).collect()
}

#[derive(Clone)]
pub struct AppointmentsRepository {
    pool: Pool<Postgres>,
}

impl AppointmentsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AppointmentRepository for AppointmentsRepository {
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Appointment>> {
        sqlx::query_as::<_, AppointmentRow>(&format!(
            "SELECT {} FROM appointments WHERE id = $1",
            APPOINTMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Appointment::try_from)
        .transpose()
    }

    async fn find_by_cancel_token(&self, cancel_token: &str) -> AppResult<Option<Appointment>> {
        sqlx::query_as::<_, AppointmentRow>(&format!(
            "SELECT {} FROM appointments WHERE cancel_token = $1",
            APPOINTMENT_COLUMNS
        ))
        .bind(cancel_token)
        .fetch_optional(&self.pool)
        .await?
        .map(Appointment::try_from)
        .transpose()
    }

    async fn find_by_customer_id(&self, customer_id: i32) -> AppResult<Vec<Appointment>> {
        let rows = sqlx::query_as::<_, AppointmentRow>(&format!(
            "SELECT {} FROM appointments WHERE customer_id = $1 ORDER BY start_time DESC",
            APPOINTMENT_COLUMNS
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;
        into_appointments(rows)
    }

    async fn find_by_shop_id(&self, shop_id: i32) -> AppResult<Vec<Appointment>> {
        let rows = sqlx::query_as::<_, AppointmentRow>(&format!(
            "SELECT {} FROM appointments WHERE barbershop_id = $1 ORDER BY start_time",
            APPOINTMENT_COLUMNS
        ))
        .bind(shop_id)
        .fetch_all(&self.pool)
        .await?;
        into_appointments(rows)
    }

    async fn find_by_date_range(
        &self,
        shop_id: i32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<Appointment>> {
        let rows = sqlx::query_as::<_, AppointmentRow>(&format!(
            r#"
            SELECT {} FROM appointments
            WHERE barbershop_id = $1 AND start_time >= $2 AND start_time < $3
            ORDER BY start_time
            "#,
            APPOINTMENT_COLUMNS
        ))
        .bind(shop_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        into_appointments(rows)
    }

    async fn create(&self, appointment: Appointment) -> AppResult<Appointment> {
        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO appointments (barbershop_id, service_id, customer_id, start_time, end_time,
                                      status, cancel_token, cancellation_reason, notes,
                                      created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id
            "#,
        )
        .bind(appointment.shop_id())
        .bind(appointment.service_id())
        .bind(appointment.customer_id())
        .bind(appointment.start_time())
        .bind(appointment.end_time())
        .bind(appointment.status().as_str())
        .bind(appointment.cancel_token())
        .bind(appointment.cancellation_reason())
        .bind(appointment.notes())
        .bind(appointment.created_at())
        .bind(appointment.updated_at())
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(appointment.with_id(id))
    }

    async fn update(&self, appointment: Appointment) -> AppResult<Appointment> {
        let id = appointment.persisted_id()?;
        let result = sqlx::query(
            r#"
            UPDATE appointments
            SET start_time = $1, end_time = $2, status = $3, cancellation_reason = $4,
                notes = $5, updated_at = $6
            WHERE id = $7
            "#,
        )
        .bind(appointment.start_time())
        .bind(appointment.end_time())
        .bind(appointment.status().as_str())
        .bind(appointment.cancellation_reason())
        .bind(appointment.notes())
        .bind(appointment.updated_at())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Appointment {} not found", id)));
        }
        Ok(appointment)
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM appointments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn check_for_conflicts(
        &self,
        shop_id: i32,
        range: TimeRange,
        exclude_id: Option<i32>,
    ) -> AppResult<bool> {
        let conflict: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM appointments
                WHERE barbershop_id = $1
                  AND status <> 'CANCELED'
                  AND start_time < $3
                  AND end_time > $2
                  AND ($4::INTEGER IS NULL OR id <> $4)
            )
            "#,
        )
        .bind(shop_id)
        .bind(range.start())
        .bind(range.end())
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(conflict)
    }
}
