//! Appointment endpoints (shop owner)

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    error::AppResult,
    models::{AppointmentResponse, UpdateAppointment},
    AppState,
};

use super::AuthenticatedOwner;

#[derive(Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct AppointmentsQuery {
    /// First day (YYYY-MM-DD, UTC)
    pub start_date: NaiveDate,
    /// Last day, included (YYYY-MM-DD, UTC)
    pub end_date: NaiveDate,
}

/// List the appointments of a shop starting in a day range
#[utoipa::path(
    get,
    path = "/shops/{shop_id}/appointments",
    tag = "appointments",
    security(("bearer_auth" = [])),
    params(("shop_id" = i32, Path, description = "Shop ID"), AppointmentsQuery),
    responses(
        (status = 200, description = "Appointments ordered by start", body = Vec<AppointmentResponse>),
        (status = 403, description = "Not the shop owner", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_appointments(
    State(state): State<AppState>,
    AuthenticatedOwner(claims): AuthenticatedOwner,
    Path(shop_id): Path<i32>,
    Query(query): Query<AppointmentsQuery>,
) -> AppResult<Json<Vec<AppointmentResponse>>> {
    let appointments = state
        .services
        .appointments
        .list_for_shop(claims.owner_id(), shop_id, query.start_date, query.end_date)
        .await?;
    Ok(Json(appointments.iter().map(AppointmentResponse::from).collect()))
}

/// Get one appointment
#[utoipa::path(
    get,
    path = "/shops/{shop_id}/appointments/{id}",
    tag = "appointments",
    security(("bearer_auth" = [])),
    params(
        ("shop_id" = i32, Path, description = "Shop ID"),
        ("id" = i32, Path, description = "Appointment ID")
    ),
    responses(
        (status = 200, description = "Appointment", body = AppointmentResponse),
        (status = 404, description = "Appointment not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_appointment(
    State(state): State<AppState>,
    AuthenticatedOwner(claims): AuthenticatedOwner,
    Path((shop_id, id)): Path<(i32, i32)>,
) -> AppResult<Json<AppointmentResponse>> {
    let appointment = state
        .services
        .appointments
        .get(claims.owner_id(), shop_id, id)
        .await?;
    Ok(Json(AppointmentResponse::from(&appointment)))
}

/// Change status, notes or time of an appointment
#[utoipa::path(
    put,
    path = "/shops/{shop_id}/appointments/{id}",
    tag = "appointments",
    security(("bearer_auth" = [])),
    params(
        ("shop_id" = i32, Path, description = "Shop ID"),
        ("id" = i32, Path, description = "Appointment ID")
    ),
    request_body = UpdateAppointment,
    responses(
        (status = 200, description = "Appointment updated", body = AppointmentResponse),
        (status = 409, description = "New time overlaps another appointment", body = crate::error::ErrorResponse),
        (status = 422, description = "Status change not allowed", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_appointment(
    State(state): State<AppState>,
    AuthenticatedOwner(claims): AuthenticatedOwner,
    Path((shop_id, id)): Path<(i32, i32)>,
    Json(data): Json<UpdateAppointment>,
) -> AppResult<Json<AppointmentResponse>> {
    data.validate()?;
    let appointment = state
        .services
        .appointments
        .update(claims.owner_id(), shop_id, id, &data)
        .await?;
    Ok(Json(AppointmentResponse::from(&appointment)))
}
