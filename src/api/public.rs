//! Public (customer-facing) endpoints: shop page, availability, booking, cancellation

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        AppointmentResponse, BookAppointment, BookingConfirmation, CancelAppointment, Service,
        Shop, WeeklyRule,
    },
    AppState,
};

#[derive(Serialize, ToSchema)]
pub struct ServiceResponse {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    /// Amount with two decimals, e.g. "45.00"
    pub price: String,
    pub currency: String,
    pub duration_minutes: u32,
}

impl From<&Service> for ServiceResponse {
    fn from(service: &Service) -> Self {
        Self {
            id: service.id().unwrap_or_default(),
            name: service.name().to_string(),
            description: service.description().map(str::to_string),
            price: format!("{:.2}", service.price().amount()),
            currency: service.price().currency().to_string(),
            duration_minutes: service.duration_minutes(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct OpeningHours {
    pub day_of_week: u8,
    pub day_name: String,
    pub start_time: String,
    pub end_time: String,
}

impl From<&WeeklyRule> for OpeningHours {
    fn from(rule: &WeeklyRule) -> Self {
        Self {
            day_of_week: rule.day_of_week(),
            day_name: rule.day_name().to_string(),
            start_time: rule.start_time(),
            end_time: rule.end_time(),
        }
    }
}

/// Public shop page: active services and opening hours
#[derive(Serialize, ToSchema)]
pub struct ShopResponse {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub address: Option<String>,
    pub logo_url: Option<String>,
    pub timezone: String,
    pub services: Vec<ServiceResponse>,
    pub opening_hours: Vec<OpeningHours>,
}

impl From<&Shop> for ShopResponse {
    fn from(shop: &Shop) -> Self {
        Self {
            id: shop.id().unwrap_or_default(),
            name: shop.name().to_string(),
            slug: shop.slug().to_string(),
            description: shop.description().map(str::to_string),
            address: shop.address().map(str::to_string),
            logo_url: shop.logo_url().map(str::to_string),
            timezone: shop.timezone().to_string(),
            services: shop
                .services()
                .iter()
                .filter(|s| s.is_active())
                .map(ServiceResponse::from)
                .collect(),
            opening_hours: shop
                .schedule_rules()
                .iter()
                .filter(|r| r.is_active())
                .map(OpeningHours::from)
                .collect(),
        }
    }
}

#[derive(Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct AvailabilityQuery {
    /// Calendar day (YYYY-MM-DD), taken as a UTC day
    pub date: NaiveDate,
    pub service_id: i32,
}

#[derive(Serialize, ToSchema)]
pub struct SlotResponse {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Start in the shop's timezone (HH:MM)
    pub local_start: String,
    /// End in the shop's timezone (HH:MM)
    pub local_end: String,
}

#[derive(Serialize, ToSchema)]
pub struct AvailabilityResponse {
    pub date: NaiveDate,
    pub service_id: i32,
    pub timezone: String,
    pub slots: Vec<SlotResponse>,
}

/// Get a shop's public page
#[utoipa::path(
    get,
    path = "/public/shops/{slug}",
    tag = "public",
    params(("slug" = String, Path, description = "Shop slug")),
    responses(
        (status = 200, description = "Shop", body = ShopResponse),
        (status = 404, description = "Shop not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_shop(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<ShopResponse>> {
    let shop = state.services.shops.get_by_slug(&slug).await?;
    Ok(Json(ShopResponse::from(&shop)))
}

/// Bookable slots of a service on a given day
#[utoipa::path(
    get,
    path = "/public/shops/{slug}/availability",
    tag = "public",
    params(("slug" = String, Path, description = "Shop slug"), AvailabilityQuery),
    responses(
        (status = 200, description = "Available slots", body = AvailabilityResponse),
        (status = 404, description = "Shop or service not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_availability(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> AppResult<Json<AvailabilityResponse>> {
    let (shop, slots) = state
        .services
        .availability
        .for_slug(&slug, query.date, query.service_id)
        .await?;
    let tz = shop.tz();

    Ok(Json(AvailabilityResponse {
        date: query.date,
        service_id: query.service_id,
        timezone: shop.timezone().to_string(),
        slots: slots
            .iter()
            .map(|slot| {
                let (local_start, local_end) = slot.format(tz);
                SlotResponse {
                    start_time: slot.start(),
                    end_time: slot.end(),
                    local_start,
                    local_end,
                }
            })
            .collect(),
    }))
}

/// Book an appointment
#[utoipa::path(
    post,
    path = "/public/shops/{slug}/appointments",
    tag = "public",
    params(("slug" = String, Path, description = "Shop slug")),
    request_body = BookAppointment,
    responses(
        (status = 201, description = "Appointment booked", body = BookingConfirmation),
        (status = 409, description = "Slot no longer available", body = crate::error::ErrorResponse)
    )
)]
pub async fn book_appointment(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(data): Json<BookAppointment>,
) -> AppResult<(StatusCode, Json<BookingConfirmation>)> {
    data.validate()?;
    let appointment = state.services.appointments.book_public(&slug, &data).await?;
    Ok((StatusCode::CREATED, Json(BookingConfirmation::from(&appointment))))
}

/// Cancel an appointment with its cancel token
#[utoipa::path(
    post,
    path = "/public/appointments/cancel/{token}",
    tag = "public",
    params(("token" = String, Path, description = "Cancel token received at booking")),
    request_body(content = CancelAppointment, description = "Optional reason"),
    responses(
        (status = 200, description = "Appointment canceled", body = AppointmentResponse),
        (status = 404, description = "Unknown token", body = crate::error::ErrorResponse),
        (status = 422, description = "Appointment can no longer be canceled", body = crate::error::ErrorResponse)
    )
)]
pub async fn cancel_appointment(
    State(state): State<AppState>,
    Path(token): Path<String>,
    data: Option<Json<CancelAppointment>>,
) -> AppResult<Json<AppointmentResponse>> {
    let data = data.map(|Json(d)| d).unwrap_or_default();
    data.validate()?;
    let appointment = state
        .services
        .appointments
        .cancel_by_token(&token, data.reason)
        .await?;
    Ok(Json(AppointmentResponse::from(&appointment)))
}
