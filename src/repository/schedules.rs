//! Weekly schedule rules (Postgres)

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use sqlx::{Pool, Postgres};

use super::ScheduleRuleRepository;
use crate::{
    error::{AppError, AppResult},
    models::{NewScheduleRule, ScheduleRuleRecord, WeeklyRule},
};

const RULE_COLUMNS: &str =
    "id, barbershop_id, day_of_week, start_time, end_time, is_active, sort_order, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
pub(super) struct RuleRow {
    id: i32,
    barbershop_id: i32,
    day_of_week: i16,
    start_time: NaiveTime,
    end_time: NaiveTime,
    is_active: bool,
    sort_order: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RuleRow> for ScheduleRuleRecord {
    type Error = AppError;

    fn try_from(row: RuleRow) -> AppResult<Self> {
        let day = u8::try_from(row.day_of_week)
            .map_err(|_| AppError::InvalidRule(format!("rule {} has an invalid day", row.id)))?;
        let rule = WeeklyRule::new(
            day,
            &row.start_time.format("%H:%M").to_string(),
            &row.end_time.format("%H:%M").to_string(),
            row.is_active,
        )?;
        Ok(ScheduleRuleRecord {
            id: row.id,
            shop_id: row.barbershop_id,
            rule,
            order: row.sort_order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn to_time(minutes: u16) -> AppResult<NaiveTime> {
    NaiveTime::from_hms_opt(u32::from(minutes / 60), u32::from(minutes % 60), 0)
        .ok_or_else(|| AppError::InvalidRule(format!("{} is not a time of day", minutes)))
}

/// Rules of a shop ordered by day, position and opening time
pub(super) async fn load_for_shop(
    pool: &Pool<Postgres>,
    shop_id: i32,
) -> AppResult<Vec<ScheduleRuleRecord>> {
    let rows = sqlx::query_as::<_, RuleRow>(&format!(
        "SELECT {} FROM schedule_rules WHERE barbershop_id = $1 \
         ORDER BY day_of_week, sort_order, start_time",
        RULE_COLUMNS
    ))
    .bind(shop_id)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(ScheduleRuleRecord::try_from).collect()
}

#[derive(Clone)]
pub struct SchedulesRepository {
    pool: Pool<Postgres>,
}

impl SchedulesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScheduleRuleRepository for SchedulesRepository {
    async fn find_by_id(&self, id: i32) -> AppResult<Option<ScheduleRuleRecord>> {
        sqlx::query_as::<_, RuleRow>(&format!(
            "SELECT {} FROM schedule_rules WHERE id = $1",
            RULE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(ScheduleRuleRecord::try_from)
        .transpose()
    }

    async fn find_by_shop_id(&self, shop_id: i32) -> AppResult<Vec<ScheduleRuleRecord>> {
        load_for_shop(&self.pool, shop_id).await
    }

    async fn find_by_shop_and_day(
        &self,
        shop_id: i32,
        day_of_week: u8,
    ) -> AppResult<Vec<ScheduleRuleRecord>> {
        let rows = sqlx::query_as::<_, RuleRow>(&format!(
            "SELECT {} FROM schedule_rules WHERE barbershop_id = $1 AND day_of_week = $2 \
             ORDER BY sort_order, start_time",
            RULE_COLUMNS
        ))
        .bind(shop_id)
        .bind(i16::from(day_of_week))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ScheduleRuleRecord::try_from).collect()
    }

    async fn create(&self, rule: NewScheduleRule) -> AppResult<ScheduleRuleRecord> {
        let row = sqlx::query_as::<_, RuleRow>(&format!(
            r#"
            INSERT INTO schedule_rules (barbershop_id, day_of_week, start_time, end_time, is_active, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            RULE_COLUMNS
        ))
        .bind(rule.shop_id)
        .bind(i16::from(rule.rule.day_of_week()))
        .bind(to_time(rule.rule.start_minutes())?)
        .bind(to_time(rule.rule.end_minutes())?)
        .bind(rule.rule.is_active())
        .bind(rule.order)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn update(&self, id: i32, rule: WeeklyRule) -> AppResult<ScheduleRuleRecord> {
        sqlx::query_as::<_, RuleRow>(&format!(
            r#"
            UPDATE schedule_rules
            SET day_of_week = $1, start_time = $2, end_time = $3, is_active = $4, updated_at = $5
            WHERE id = $6
            RETURNING {}
            "#,
            RULE_COLUMNS
        ))
        .bind(i16::from(rule.day_of_week()))
        .bind(to_time(rule.start_minutes())?)
        .bind(to_time(rule.end_minutes())?)
        .bind(rule.is_active())
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Schedule rule {} not found", id)))?
        .try_into()
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM schedule_rules WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
