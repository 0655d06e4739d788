//! Schedule rule endpoints (shop owner)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::schedule::{CreateScheduleRule, ScheduleRuleResponse, UpdateScheduleRule},
    AppState,
};

use super::AuthenticatedOwner;

/// List the weekly rules of a shop
#[utoipa::path(
    get,
    path = "/shops/{shop_id}/schedule-rules",
    tag = "schedules",
    security(("bearer_auth" = [])),
    params(("shop_id" = i32, Path, description = "Shop ID")),
    responses(
        (status = 200, description = "Schedule rules", body = Vec<ScheduleRuleResponse>),
        (status = 403, description = "Not the shop owner", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_rules(
    State(state): State<AppState>,
    AuthenticatedOwner(claims): AuthenticatedOwner,
    Path(shop_id): Path<i32>,
) -> AppResult<Json<Vec<ScheduleRuleResponse>>> {
    let rules = state.services.schedules.list(claims.owner_id(), shop_id).await?;
    Ok(Json(rules.iter().map(ScheduleRuleResponse::from).collect()))
}

/// Add a weekly rule
#[utoipa::path(
    post,
    path = "/shops/{shop_id}/schedule-rules",
    tag = "schedules",
    security(("bearer_auth" = [])),
    params(("shop_id" = i32, Path, description = "Shop ID")),
    request_body = CreateScheduleRule,
    responses(
        (status = 201, description = "Rule created", body = ScheduleRuleResponse),
        (status = 400, description = "Invalid rule", body = crate::error::ErrorResponse),
        (status = 409, description = "Overlaps an existing rule", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_rule(
    State(state): State<AppState>,
    AuthenticatedOwner(claims): AuthenticatedOwner,
    Path(shop_id): Path<i32>,
    Json(data): Json<CreateScheduleRule>,
) -> AppResult<(StatusCode, Json<ScheduleRuleResponse>)> {
    data.validate()?;
    let rule = state
        .services
        .schedules
        .create(claims.owner_id(), shop_id, &data)
        .await?;
    Ok((StatusCode::CREATED, Json(ScheduleRuleResponse::from(&rule))))
}

/// Update a weekly rule
#[utoipa::path(
    put,
    path = "/shops/{shop_id}/schedule-rules/{id}",
    tag = "schedules",
    security(("bearer_auth" = [])),
    params(
        ("shop_id" = i32, Path, description = "Shop ID"),
        ("id" = i32, Path, description = "Rule ID")
    ),
    request_body = UpdateScheduleRule,
    responses(
        (status = 200, description = "Rule updated", body = ScheduleRuleResponse),
        (status = 409, description = "Overlaps an existing rule", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_rule(
    State(state): State<AppState>,
    AuthenticatedOwner(claims): AuthenticatedOwner,
    Path((shop_id, id)): Path<(i32, i32)>,
    Json(data): Json<UpdateScheduleRule>,
) -> AppResult<Json<ScheduleRuleResponse>> {
    data.validate()?;
    let rule = state
        .services
        .schedules
        .update(claims.owner_id(), shop_id, id, &data)
        .await?;
    Ok(Json(ScheduleRuleResponse::from(&rule)))
}

/// Delete a weekly rule
#[utoipa::path(
    delete,
    path = "/shops/{shop_id}/schedule-rules/{id}",
    tag = "schedules",
    security(("bearer_auth" = [])),
    params(
        ("shop_id" = i32, Path, description = "Shop ID"),
        ("id" = i32, Path, description = "Rule ID")
    ),
    responses(
        (status = 204, description = "Rule deleted"),
        (status = 404, description = "Rule not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_rule(
    State(state): State<AppState>,
    AuthenticatedOwner(claims): AuthenticatedOwner,
    Path((shop_id, id)): Path<(i32, i32)>,
) -> AppResult<StatusCode> {
    state
        .services
        .schedules
        .delete(claims.owner_id(), shop_id, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
