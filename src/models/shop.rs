//! Shop aggregate (tenant): identity, timezone, services and weekly rules

use chrono::{DateTime, Datelike, Timelike, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::{
    service::Service,
    weekly_rule::{day_index, WeeklyRule},
};
use crate::error::{AppError, AppResult};

static SLUG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9-]+$").expect("valid regex"));

/// A barbershop and the schedule it publishes
#[derive(Debug, Clone, Serialize)]
pub struct Shop {
    id: Option<i32>,
    name: String,
    slug: String,
    description: Option<String>,
    address: Option<String>,
    logo_url: Option<String>,
    owner_id: i32,
    timezone: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    services: Vec<Service>,
    schedule_rules: Vec<WeeklyRule>,
}

/// Fields needed to create a shop
#[derive(Debug, Clone)]
pub struct NewShop {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub address: Option<String>,
    pub logo_url: Option<String>,
    pub owner_id: i32,
    /// IANA zone name, `UTC` when absent
    pub timezone: Option<String>,
}

impl Shop {
    pub fn new(data: NewShop) -> AppResult<Self> {
        validate_name(&data.name)?;
        validate_slug(&data.slug)?;
        if data.owner_id <= 0 {
            return Err(AppError::Validation("invalid owner id".to_string()));
        }
        let timezone = data.timezone.unwrap_or_else(|| "UTC".to_string());
        parse_timezone(&timezone)?;

        let now = Utc::now();
        Ok(Self {
            id: None,
            name: data.name,
            slug: data.slug,
            description: data.description,
            address: data.address,
            logo_url: data.logo_url,
            owner_id: data.owner_id,
            timezone,
            created_at: now,
            updated_at: now,
            services: Vec::new(),
            schedule_rules: Vec::new(),
        })
    }

    /// Rebuild a persisted shop. Rules are kept as loaded, including several
    /// rules on the same day.
    pub fn restore(
        id: i32,
        data: NewShop,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        services: Vec<Service>,
        schedule_rules: Vec<WeeklyRule>,
    ) -> AppResult<Self> {
        let mut shop = Self::new(data)?;
        shop.id = Some(id);
        shop.created_at = created_at;
        shop.updated_at = updated_at;
        shop.services = services;
        shop.schedule_rules = schedule_rules;
        Ok(shop)
    }

    /// Assign the id given by the store on first insert
    pub fn with_id(mut self, id: i32) -> Self {
        self.id = Some(id);
        self
    }

    /// Replace the loaded services and rules
    pub fn with_children(mut self, services: Vec<Service>, schedule_rules: Vec<WeeklyRule>) -> Self {
        self.services = services;
        self.schedule_rules = schedule_rules;
        self
    }

    pub fn id(&self) -> Option<i32> {
        self.id
    }

    /// Id of a persisted shop
    pub fn persisted_id(&self) -> AppResult<i32> {
        self.id
            .ok_or_else(|| AppError::Internal(format!("shop '{}' has not been persisted", self.slug)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn logo_url(&self) -> Option<&str> {
        self.logo_url.as_deref()
    }

    pub fn owner_id(&self) -> i32 {
        self.owner_id
    }

    pub fn timezone(&self) -> &str {
        &self.timezone
    }

    /// Parsed timezone; always valid because every write goes through validation
    pub fn tz(&self) -> Tz {
        self.timezone.parse().unwrap_or(Tz::UTC)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    pub fn schedule_rules(&self) -> &[WeeklyRule] {
        &self.schedule_rules
    }

    pub fn is_owned_by(&self, owner_id: i32) -> bool {
        self.owner_id == owner_id
    }

    pub fn set_name(&mut self, name: String) -> AppResult<()> {
        validate_name(&name)?;
        self.name = name;
        self.touch();
        Ok(())
    }

    pub fn set_slug(&mut self, slug: String) -> AppResult<()> {
        validate_slug(&slug)?;
        self.slug = slug;
        self.touch();
        Ok(())
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description;
        self.touch();
    }

    pub fn set_address(&mut self, address: Option<String>) {
        self.address = address;
        self.touch();
    }

    pub fn set_logo_url(&mut self, logo_url: Option<String>) {
        self.logo_url = logo_url;
        self.touch();
    }

    pub fn set_timezone(&mut self, timezone: String) -> AppResult<()> {
        parse_timezone(&timezone)?;
        self.timezone = timezone;
        self.touch();
        Ok(())
    }

    pub fn add_service(&mut self, service: Service) -> AppResult<()> {
        if self.id != Some(service.shop_id()) {
            return Err(AppError::Validation(
                "service does not belong to this shop".to_string(),
            ));
        }
        self.services.push(service);
        self.touch();
        Ok(())
    }

    pub fn remove_service(&mut self, service_id: i32) {
        self.services.retain(|s| s.id() != Some(service_id));
        self.touch();
    }

    /// Active service with the given id
    pub fn active_service(&self, service_id: i32) -> Option<&Service> {
        self.services
            .iter()
            .find(|s| s.id() == Some(service_id) && s.is_active())
    }

    /// Adds a rule, replacing whatever rule already exists for that day.
    /// Overlap checks belong to the owner-facing guard, not to the aggregate.
    pub fn add_schedule_rule(&mut self, rule: WeeklyRule) {
        match self
            .schedule_rules
            .iter_mut()
            .find(|r| r.day_of_week() == rule.day_of_week())
        {
            Some(existing) => *existing = rule,
            None => self.schedule_rules.push(rule),
        }
        self.touch();
    }

    pub fn remove_schedule_rule(&mut self, day_of_week: u8) {
        self.schedule_rules.retain(|r| r.day_of_week() != day_of_week);
        self.touch();
    }

    /// Active rules for a day, ordered by opening time
    pub fn active_rules_for(&self, day_of_week: u8) -> Vec<&WeeklyRule> {
        let mut rules: Vec<&WeeklyRule> = self
            .schedule_rules
            .iter()
            .filter(|r| r.day_of_week() == day_of_week && r.is_active())
            .collect();
        rules.sort_by_key(|r| r.start_minutes());
        rules
    }

    /// Whether an active rule covers the instant's UTC weekday and minute
    pub fn is_open(&self, instant: DateTime<Utc>) -> bool {
        let day = day_index(instant.weekday());
        // hour * 60 + minute is at most 1439
        let minute_of_day = (instant.hour() * 60 + instant.minute()) as u16;
        self.active_rules_for(day)
            .iter()
            .any(|r| r.covers_minute(minute_of_day))
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn validate_name(name: &str) -> AppResult<()> {
    if name.trim().chars().count() < 3 {
        return Err(AppError::Validation(
            "shop name must be at least 3 characters".to_string(),
        ));
    }
    Ok(())
}

fn validate_slug(slug: &str) -> AppResult<()> {
    if slug.trim().len() < 3 {
        return Err(AppError::Validation(
            "shop slug must be at least 3 characters".to_string(),
        ));
    }
    if !SLUG_RE.is_match(slug) {
        return Err(AppError::Validation(
            "shop slug may only contain lowercase letters, digits and hyphens".to_string(),
        ));
    }
    Ok(())
}

fn parse_timezone(timezone: &str) -> AppResult<Tz> {
    timezone
        .parse::<Tz>()
        .map_err(|_| AppError::Validation(format!("invalid timezone '{}'", timezone)))
}
