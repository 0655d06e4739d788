//! Owner-side weekly schedule rules and the rule overlap guard

use tracing::instrument;

use crate::{
    error::{AppError, AppResult},
    models::{
        schedule::{CreateScheduleRule, UpdateScheduleRule},
        NewScheduleRule, ScheduleRuleRecord, WeeklyRule,
    },
    repository::Repository,
};

use super::shops::ShopsService;

/// Reject `candidate` when it overlaps another rule of the same day.
/// Rules on other days never conflict; `exclude_id` skips the rule being edited.
pub fn ensure_no_rule_conflict(
    candidate: &WeeklyRule,
    existing: &[ScheduleRuleRecord],
    exclude_id: Option<i32>,
) -> AppResult<()> {
    let clash = existing
        .iter()
        .filter(|r| Some(r.id) != exclude_id)
        .find(|r| candidate.overlaps(&r.rule));

    match clash {
        Some(record) => Err(AppError::RuleConflict(format!(
            "{} {} overlaps the existing rule {}",
            candidate.day_name(),
            candidate.formatted_time(),
            record.rule.formatted_time()
        ))),
        None => Ok(()),
    }
}

#[derive(Clone)]
pub struct SchedulesService {
    repository: Repository,
    shops: ShopsService,
}

impl SchedulesService {
    pub fn new(repository: Repository, shops: ShopsService) -> Self {
        Self { repository, shops }
    }

    pub async fn list(&self, owner_id: i32, shop_id: i32) -> AppResult<Vec<ScheduleRuleRecord>> {
        self.shops.owned_shop(owner_id, shop_id).await?;
        self.repository.schedules.find_by_shop_id(shop_id).await
    }

    #[instrument(name = "schedules.create", skip(self, data), fields(day = data.day_of_week))]
    pub async fn create(
        &self,
        owner_id: i32,
        shop_id: i32,
        data: &CreateScheduleRule,
    ) -> AppResult<ScheduleRuleRecord> {
        self.shops.owned_shop(owner_id, shop_id).await?;
        let rule = WeeklyRule::active(data.day_of_week, &data.start_time, &data.end_time)?;

        let same_day = self
            .repository
            .schedules
            .find_by_shop_and_day(shop_id, rule.day_of_week())
            .await?;
        if let Err(e) = ensure_no_rule_conflict(&rule, &same_day, None) {
            tracing::warn!(error = %e, "Schedule rule rejected");
            return Err(e);
        }

        let order = i32::try_from(same_day.len()).unwrap_or(i32::MAX);
        let record = self
            .repository
            .schedules
            .create(NewScheduleRule { shop_id, rule, order })
            .await?;
        tracing::info!(rule_id = record.id, "Schedule rule created");
        Ok(record)
    }

    /// Partial update; the result is checked against the target day's other rules
    #[instrument(name = "schedules.update", skip(self, data))]
    pub async fn update(
        &self,
        owner_id: i32,
        shop_id: i32,
        rule_id: i32,
        data: &UpdateScheduleRule,
    ) -> AppResult<ScheduleRuleRecord> {
        self.shops.owned_shop(owner_id, shop_id).await?;
        let current = self.rule_of_shop(shop_id, rule_id).await?;

        let rule = WeeklyRule::new(
            data.day_of_week.unwrap_or(current.rule.day_of_week()),
            data.start_time.as_deref().unwrap_or(&current.rule.start_time()),
            data.end_time.as_deref().unwrap_or(&current.rule.end_time()),
            data.is_active.unwrap_or(current.rule.is_active()),
        )?;

        let same_day = self
            .repository
            .schedules
            .find_by_shop_and_day(shop_id, rule.day_of_week())
            .await?;
        if let Err(e) = ensure_no_rule_conflict(&rule, &same_day, Some(rule_id)) {
            tracing::warn!(error = %e, "Schedule rule update rejected");
            return Err(e);
        }

        let record = self.repository.schedules.update(rule_id, rule).await?;
        tracing::info!("Schedule rule updated");
        Ok(record)
    }

    #[instrument(name = "schedules.delete", skip(self))]
    pub async fn delete(&self, owner_id: i32, shop_id: i32, rule_id: i32) -> AppResult<()> {
        self.shops.owned_shop(owner_id, shop_id).await?;
        self.rule_of_shop(shop_id, rule_id).await?;
        if !self.repository.schedules.delete(rule_id).await? {
            return Err(AppError::NotFound(format!("Schedule rule {} not found", rule_id)));
        }
        tracing::info!("Schedule rule deleted");
        Ok(())
    }

    async fn rule_of_shop(&self, shop_id: i32, rule_id: i32) -> AppResult<ScheduleRuleRecord> {
        self.repository
            .schedules
            .find_by_id(rule_id)
            .await?
            .filter(|r| r.shop_id == shop_id)
            .ok_or_else(|| AppError::NotFound(format!("Schedule rule {} not found", rule_id)))
    }
}
