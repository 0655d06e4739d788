//! Availability engine: candidate slot generation and conflict filtering.
//!
//! `generate_slots` and `filter_conflicting` are pure; the service wraps them
//! with the shop and appointment lookups. The result is advisory, the booking
//! guard in `appointments` is what decides at commit time.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use tracing::instrument;

use crate::{
    error::{AppError, AppResult},
    models::{
        time_range::add_minutes, weekly_rule::day_index, Appointment, Shop, TimeRange, WeeklyRule,
    },
    repository::Repository,
};

/// Distance between consecutive candidate starts, whatever the service duration
pub const SLOT_STRIDE_MINUTES: i64 = 15;

/// UTC midnight starting `date`
pub fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// `[midnight, next midnight)` covering the UTC days `first..=last`
pub fn days_window(first: NaiveDate, last: NaiveDate) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
    Ok((day_start(first), add_minutes(day_start(last), 24 * 60)?))
}

/// Candidate windows of `duration_minutes` inside `rule` on `date`, one every
/// [`SLOT_STRIDE_MINUTES`]. Empty when the rule is inactive, belongs to another
/// weekday, or the duration does not fit.
pub fn generate_slots(
    date: NaiveDate,
    rule: &WeeklyRule,
    duration_minutes: u32,
) -> AppResult<Vec<TimeRange>> {
    if !rule.is_active() || rule.day_of_week() != day_index(date.weekday()) || duration_minutes == 0 {
        return Ok(Vec::new());
    }

    let midnight = day_start(date);
    let closing = add_minutes(midnight, i64::from(rule.end_minutes()))?;
    let duration = Duration::minutes(i64::from(duration_minutes));
    let stride = Duration::minutes(SLOT_STRIDE_MINUTES);

    let mut slots = Vec::new();
    let mut cursor = add_minutes(midnight, i64::from(rule.start_minutes()))?;
    loop {
        // A window past the calendar end is also past closing
        let Some(candidate_end) = cursor.checked_add_signed(duration) else {
            break;
        };
        if candidate_end > closing {
            break;
        }
        slots.push(TimeRange::new(cursor, candidate_end)?);
        let Some(next) = cursor.checked_add_signed(stride) else {
            break;
        };
        cursor = next;
    }
    Ok(slots)
}

/// Keep the candidates that overlap no slot-blocking booking, preserving order.
/// Canceled bookings free their window; completed and no-show ones do not.
pub fn filter_conflicting(candidates: Vec<TimeRange>, bookings: &[Appointment]) -> Vec<TimeRange> {
    candidates
        .into_iter()
        .filter(|candidate| {
            !bookings
                .iter()
                .filter(|b| b.status().blocks_slot())
                .any(|b| b.time_slot().overlaps(candidate))
        })
        .collect()
}

/// Free slots of a day across all of its active rules, rules taken in opening order
pub fn available_slots(
    date: NaiveDate,
    rules: &[&WeeklyRule],
    duration_minutes: u32,
    bookings: &[Appointment],
) -> AppResult<Vec<TimeRange>> {
    let mut candidates = Vec::new();
    for rule in rules {
        candidates.extend(generate_slots(date, rule, duration_minutes)?);
    }
    Ok(filter_conflicting(candidates, bookings))
}

#[derive(Clone)]
pub struct AvailabilityService {
    repository: Repository,
}

impl AvailabilityService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Free slots for one active service of `shop` on `date` (UTC day)
    #[instrument(name = "availability.for_shop", skip(self, shop), fields(shop_id = ?shop.id()))]
    pub async fn for_shop(
        &self,
        shop: &Shop,
        date: NaiveDate,
        service_id: i32,
    ) -> AppResult<Vec<TimeRange>> {
        let shop_id = shop.persisted_id()?;
        let service = shop
            .active_service(service_id)
            .ok_or_else(|| AppError::NotFound(format!("Service {} not found", service_id)))?;

        let rules = shop.active_rules_for(day_index(date.weekday()));
        if rules.is_empty() {
            tracing::debug!(%date, "Shop closed on this day");
            return Ok(Vec::new());
        }

        let (from, to) = days_window(date, date)?;
        let bookings = self
            .repository
            .appointments
            .find_by_date_range(shop_id, from, to)
            .await?;

        let slots = available_slots(date, &rules, service.duration_minutes(), &bookings)?;
        tracing::debug!(%date, bookings = bookings.len(), slots = slots.len(), "Availability computed");
        Ok(slots)
    }

    /// Public lookup by shop slug
    pub async fn for_slug(
        &self,
        slug: &str,
        date: NaiveDate,
        service_id: i32,
    ) -> AppResult<(Shop, Vec<TimeRange>)> {
        let shop = self
            .repository
            .shops
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Shop '{}' not found", slug)))?;
        let slots = self.for_shop(&shop, date, service_id).await?;
        Ok((shop, slots))
    }
}
