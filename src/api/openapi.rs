//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{appointments, health, public, schedules, shops};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "BarberFlow API",
        version = "0.3.0",
        description = "Barbershop appointment booking REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html"),
        contact(name = "BarberFlow Team", email = "dev@barberflow.com")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        // Public
        public::get_shop,
        public::get_availability,
        public::book_appointment,
        public::cancel_appointment,
        // Shops and services
        shops::list_shops,
        shops::create_shop,
        shops::get_shop,
        shops::update_shop,
        shops::list_services,
        shops::create_service,
        shops::update_service,
        shops::deactivate_service,
        shops::customer_appointments,
        // Schedule rules
        schedules::list_rules,
        schedules::create_rule,
        schedules::update_rule,
        schedules::delete_rule,
        // Appointments
        appointments::list_appointments,
        appointments::get_appointment,
        appointments::update_appointment,
    ),
    components(
        schemas(
            // Public
            public::ShopResponse,
            public::ServiceResponse,
            public::OpeningHours,
            public::AvailabilityQuery,
            public::AvailabilityResponse,
            public::SlotResponse,
            crate::models::BookAppointment,
            crate::models::CustomerContact,
            crate::models::BookingConfirmation,
            crate::models::CancelAppointment,
            // Shops and services
            shops::CreateShop,
            shops::UpdateShop,
            shops::CreateService,
            shops::UpdateService,
            shops::OwnerShopResponse,
            shops::OwnerServiceResponse,
            // Schedule rules
            crate::models::schedule::ScheduleRuleResponse,
            crate::models::schedule::CreateScheduleRule,
            crate::models::schedule::UpdateScheduleRule,
            // Appointments
            appointments::AppointmentsQuery,
            crate::models::AppointmentResponse,
            crate::models::AppointmentStatus,
            crate::models::UpdateAppointment,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "public", description = "Customer-facing shop page, availability and booking"),
        (name = "shops", description = "Shops and their services, for shop owners"),
        (name = "schedules", description = "Weekly opening-hour rules"),
        (name = "appointments", description = "Appointment management for shop owners")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
