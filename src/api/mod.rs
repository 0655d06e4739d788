//! API handlers for BarberFlow REST endpoints

pub mod appointments;
pub mod health;
pub mod openapi;
pub mod public;
pub mod schedules;
pub mod shops;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, AppState};

/// JWT claims of a shop owner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerClaims {
    /// Owner id
    pub sub: i32,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
}

impl OwnerClaims {
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn owner_id(&self) -> i32 {
        self.sub
    }
}

/// Extractor for the authenticated shop owner
pub struct AuthenticatedOwner(pub OwnerClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedOwner {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let claims = OwnerClaims::from_token(token, &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedOwner(claims))
    }
}

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Public booking
        .route("/public/shops/:slug", get(public::get_shop))
        .route("/public/shops/:slug/availability", get(public::get_availability))
        .route("/public/shops/:slug/appointments", post(public::book_appointment))
        .route("/public/appointments/cancel/:token", post(public::cancel_appointment))
        // Owner: shops and services
        .route("/shops", get(shops::list_shops).post(shops::create_shop))
        .route("/shops/:shop_id", get(shops::get_shop).put(shops::update_shop))
        .route(
            "/shops/:shop_id/services",
            get(shops::list_services).post(shops::create_service),
        )
        .route(
            "/shops/:shop_id/services/:id",
            put(shops::update_service).delete(shops::deactivate_service),
        )
        .route(
            "/shops/:shop_id/customers/:customer_id/appointments",
            get(shops::customer_appointments),
        )
        // Owner: schedule rules
        .route(
            "/shops/:shop_id/schedule-rules",
            get(schedules::list_rules).post(schedules::create_rule),
        )
        .route(
            "/shops/:shop_id/schedule-rules/:id",
            put(schedules::update_rule).delete(schedules::delete_rule),
        )
        // Owner: appointments
        .route("/shops/:shop_id/appointments", get(appointments::list_appointments))
        .route(
            "/shops/:shop_id/appointments/:id",
            get(appointments::get_appointment).put(appointments::update_appointment),
        )
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
