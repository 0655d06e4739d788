//! Schedule rule records and request payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::weekly_rule::WeeklyRule;

/// A persisted weekly rule belonging to a shop
#[derive(Debug, Clone)]
pub struct ScheduleRuleRecord {
    pub id: i32,
    pub shop_id: i32,
    pub rule: WeeklyRule,
    /// Position among the rules of the same day, assigned at creation
    pub order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Rule to be inserted
#[derive(Debug, Clone)]
pub struct NewScheduleRule {
    pub shop_id: i32,
    pub rule: WeeklyRule,
    pub order: i32,
}

/// Schedule rule as returned by the API
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScheduleRuleResponse {
    pub id: i32,
    /// Day of week (0=Sunday, 6=Saturday)
    pub day_of_week: u8,
    pub day_name: String,
    /// Opening time (HH:MM)
    pub start_time: String,
    /// Closing time (HH:MM)
    pub end_time: String,
    pub is_active: bool,
    pub order: i32,
}

impl From<&ScheduleRuleRecord> for ScheduleRuleResponse {
    fn from(record: &ScheduleRuleRecord) -> Self {
        Self {
            id: record.id,
            day_of_week: record.rule.day_of_week(),
            day_name: record.rule.day_name().to_string(),
            start_time: record.rule.start_time(),
            end_time: record.rule.end_time(),
            is_active: record.rule.is_active(),
            order: record.order,
        }
    }
}

/// Create schedule rule request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateScheduleRule {
    /// Day of week (0=Sunday, 6=Saturday)
    #[validate(range(max = 6, message = "day_of_week must be between 0 and 6"))]
    pub day_of_week: u8,
    /// Opening time (HH:MM)
    pub start_time: String,
    /// Closing time (HH:MM)
    pub end_time: String,
}

/// Update schedule rule request; absent fields keep their current value
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateScheduleRule {
    #[validate(range(max = 6, message = "day_of_week must be between 0 and 6"))]
    pub day_of_week: Option<u8>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub is_active: Option<bool>,
}
