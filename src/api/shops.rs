//! Shop and service endpoints (shop owner)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{AppointmentResponse, Money, NewService, NewShop, Service, Shop},
    services::shops::{ServiceChanges, ShopChanges},
    AppState,
};

use super::{public::ServiceResponse, AuthenticatedOwner};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateShop {
    #[validate(length(min = 3, max = 100))]
    pub name: String,
    /// Lowercase letters, digits and hyphens
    #[validate(length(min = 3, max = 60))]
    pub slug: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(length(max = 255))]
    pub address: Option<String>,
    #[validate(url)]
    pub logo_url: Option<String>,
    /// IANA zone name, defaults to UTC
    pub timezone: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateShop {
    #[validate(length(min = 3, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 3, max = 60))]
    pub slug: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(length(max = 255))]
    pub address: Option<String>,
    #[validate(url)]
    pub logo_url: Option<String>,
    pub timezone: Option<String>,
}

impl From<UpdateShop> for ShopChanges {
    fn from(data: UpdateShop) -> Self {
        Self {
            name: data.name,
            slug: data.slug,
            description: data.description,
            address: data.address,
            logo_url: data.logo_url,
            timezone: data.timezone,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateService {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[schema(value_type = String, example = "45.00")]
    pub price: Decimal,
    /// ISO 4217 code, defaults to BRL
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    #[validate(range(min = 1, max = 1440))]
    pub duration_minutes: u32,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateService {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[schema(value_type = Option<String>, example = "50.00")]
    pub price: Option<Decimal>,
    #[validate(range(min = 1, max = 1440))]
    pub duration_minutes: Option<u32>,
    pub is_active: Option<bool>,
}

impl From<UpdateService> for ServiceChanges {
    fn from(data: UpdateService) -> Self {
        Self {
            name: data.name,
            description: data.description,
            price: data.price,
            duration_minutes: data.duration_minutes,
            is_active: data.is_active,
        }
    }
}

/// Shop as its owner sees it
#[derive(Serialize, ToSchema)]
pub struct OwnerShopResponse {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub address: Option<String>,
    pub logo_url: Option<String>,
    pub timezone: String,
    pub owner_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Shop> for OwnerShopResponse {
    fn from(shop: &Shop) -> Self {
        Self {
            id: shop.id().unwrap_or_default(),
            name: shop.name().to_string(),
            slug: shop.slug().to_string(),
            description: shop.description().map(str::to_string),
            address: shop.address().map(str::to_string),
            logo_url: shop.logo_url().map(str::to_string),
            timezone: shop.timezone().to_string(),
            owner_id: shop.owner_id(),
            created_at: shop.created_at(),
            updated_at: shop.updated_at(),
        }
    }
}

/// Service with its active flag, inactive services included
#[derive(Serialize, ToSchema)]
pub struct OwnerServiceResponse {
    #[serde(flatten)]
    pub service: ServiceResponse,
    pub is_active: bool,
}

impl From<&Service> for OwnerServiceResponse {
    fn from(service: &Service) -> Self {
        Self {
            service: ServiceResponse::from(service),
            is_active: service.is_active(),
        }
    }
}

/// List the shops of the authenticated owner
#[utoipa::path(
    get,
    path = "/shops",
    tag = "shops",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Owned shops", body = Vec<OwnerShopResponse>),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_shops(
    State(state): State<AppState>,
    AuthenticatedOwner(claims): AuthenticatedOwner,
) -> AppResult<Json<Vec<OwnerShopResponse>>> {
    let shops = state.services.shops.list_for_owner(claims.owner_id()).await?;
    Ok(Json(shops.iter().map(OwnerShopResponse::from).collect()))
}

/// Create a shop owned by the caller
#[utoipa::path(
    post,
    path = "/shops",
    tag = "shops",
    security(("bearer_auth" = [])),
    request_body = CreateShop,
    responses(
        (status = 201, description = "Shop created", body = OwnerShopResponse),
        (status = 400, description = "Invalid shop or slug taken", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_shop(
    State(state): State<AppState>,
    AuthenticatedOwner(claims): AuthenticatedOwner,
    Json(data): Json<CreateShop>,
) -> AppResult<(StatusCode, Json<OwnerShopResponse>)> {
    data.validate()?;
    let shop = state
        .services
        .shops
        .create(NewShop {
            name: data.name,
            slug: data.slug,
            description: data.description,
            address: data.address,
            logo_url: data.logo_url,
            owner_id: claims.owner_id(),
            timezone: data.timezone,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(OwnerShopResponse::from(&shop))))
}

/// Get an owned shop
#[utoipa::path(
    get,
    path = "/shops/{shop_id}",
    tag = "shops",
    security(("bearer_auth" = [])),
    params(("shop_id" = i32, Path, description = "Shop ID")),
    responses(
        (status = 200, description = "Shop", body = OwnerShopResponse),
        (status = 403, description = "Not the shop owner", body = crate::error::ErrorResponse),
        (status = 404, description = "Shop not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_shop(
    State(state): State<AppState>,
    AuthenticatedOwner(claims): AuthenticatedOwner,
    Path(shop_id): Path<i32>,
) -> AppResult<Json<OwnerShopResponse>> {
    let shop = state.services.shops.owned_shop(claims.owner_id(), shop_id).await?;
    Ok(Json(OwnerShopResponse::from(&shop)))
}

/// Update an owned shop
#[utoipa::path(
    put,
    path = "/shops/{shop_id}",
    tag = "shops",
    security(("bearer_auth" = [])),
    params(("shop_id" = i32, Path, description = "Shop ID")),
    request_body = UpdateShop,
    responses(
        (status = 200, description = "Shop updated", body = OwnerShopResponse),
        (status = 400, description = "Invalid value or slug taken", body = crate::error::ErrorResponse),
        (status = 403, description = "Not the shop owner", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_shop(
    State(state): State<AppState>,
    AuthenticatedOwner(claims): AuthenticatedOwner,
    Path(shop_id): Path<i32>,
    Json(data): Json<UpdateShop>,
) -> AppResult<Json<OwnerShopResponse>> {
    data.validate()?;
    let shop = state
        .services
        .shops
        .update(claims.owner_id(), shop_id, data.into())
        .await?;
    Ok(Json(OwnerShopResponse::from(&shop)))
}

/// List the services of a shop, inactive ones included
#[utoipa::path(
    get,
    path = "/shops/{shop_id}/services",
    tag = "shops",
    security(("bearer_auth" = [])),
    params(("shop_id" = i32, Path, description = "Shop ID")),
    responses(
        (status = 200, description = "Services", body = Vec<OwnerServiceResponse>),
        (status = 403, description = "Not the shop owner", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_services(
    State(state): State<AppState>,
    AuthenticatedOwner(claims): AuthenticatedOwner,
    Path(shop_id): Path<i32>,
) -> AppResult<Json<Vec<OwnerServiceResponse>>> {
    let services = state
        .services
        .shops
        .list_services(claims.owner_id(), shop_id)
        .await?;
    Ok(Json(services.iter().map(OwnerServiceResponse::from).collect()))
}

/// Add a service to a shop
#[utoipa::path(
    post,
    path = "/shops/{shop_id}/services",
    tag = "shops",
    security(("bearer_auth" = [])),
    params(("shop_id" = i32, Path, description = "Shop ID")),
    request_body = CreateService,
    responses(
        (status = 201, description = "Service created", body = OwnerServiceResponse),
        (status = 400, description = "Invalid service", body = crate::error::ErrorResponse),
        (status = 403, description = "Not the shop owner", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_service(
    State(state): State<AppState>,
    AuthenticatedOwner(claims): AuthenticatedOwner,
    Path(shop_id): Path<i32>,
    Json(data): Json<CreateService>,
) -> AppResult<(StatusCode, Json<OwnerServiceResponse>)> {
    data.validate()?;
    let price = match &data.currency {
        Some(currency) => Money::new(data.price, currency)?,
        None => Money::brl(data.price)?,
    };
    let service = state
        .services
        .shops
        .add_service(
            claims.owner_id(),
            shop_id,
            NewService {
                shop_id,
                name: data.name,
                description: data.description,
                price,
                duration_minutes: data.duration_minutes,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(OwnerServiceResponse::from(&service))))
}

/// Update a service
#[utoipa::path(
    put,
    path = "/shops/{shop_id}/services/{id}",
    tag = "shops",
    security(("bearer_auth" = [])),
    params(
        ("shop_id" = i32, Path, description = "Shop ID"),
        ("id" = i32, Path, description = "Service ID")
    ),
    request_body = UpdateService,
    responses(
        (status = 200, description = "Service updated", body = OwnerServiceResponse),
        (status = 404, description = "Service not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_service(
    State(state): State<AppState>,
    AuthenticatedOwner(claims): AuthenticatedOwner,
    Path((shop_id, id)): Path<(i32, i32)>,
    Json(data): Json<UpdateService>,
) -> AppResult<Json<OwnerServiceResponse>> {
    data.validate()?;
    let service = state
        .services
        .shops
        .update_service(claims.owner_id(), shop_id, id, data.into())
        .await?;
    Ok(Json(OwnerServiceResponse::from(&service)))
}

/// Deactivate a service; its past appointments keep referring to it
#[utoipa::path(
    delete,
    path = "/shops/{shop_id}/services/{id}",
    tag = "shops",
    security(("bearer_auth" = [])),
    params(
        ("shop_id" = i32, Path, description = "Shop ID"),
        ("id" = i32, Path, description = "Service ID")
    ),
    responses(
        (status = 204, description = "Service deactivated"),
        (status = 404, description = "Service not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn deactivate_service(
    State(state): State<AppState>,
    AuthenticatedOwner(claims): AuthenticatedOwner,
    Path((shop_id, id)): Path<(i32, i32)>,
) -> AppResult<StatusCode> {
    let changes = ServiceChanges {
        is_active: Some(false),
        ..Default::default()
    };
    state
        .services
        .shops
        .update_service(claims.owner_id(), shop_id, id, changes)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Appointment history of one customer at the shop, most recent first
#[utoipa::path(
    get,
    path = "/shops/{shop_id}/customers/{customer_id}/appointments",
    tag = "shops",
    security(("bearer_auth" = [])),
    params(
        ("shop_id" = i32, Path, description = "Shop ID"),
        ("customer_id" = i32, Path, description = "Customer ID")
    ),
    responses(
        (status = 200, description = "Appointments", body = Vec<AppointmentResponse>),
        (status = 403, description = "Not the shop owner", body = crate::error::ErrorResponse)
    )
)]
pub async fn customer_appointments(
    State(state): State<AppState>,
    AuthenticatedOwner(claims): AuthenticatedOwner,
    Path((shop_id, customer_id)): Path<(i32, i32)>,
) -> AppResult<Json<Vec<AppointmentResponse>>> {
    let history = state
        .services
        .appointments
        .list_for_customer(claims.owner_id(), shop_id, customer_id)
        .await?;
    Ok(Json(history.iter().map(AppointmentResponse::from).collect()))
}
