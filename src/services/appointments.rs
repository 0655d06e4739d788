//! Booking guard and appointment lifecycle.
//!
//! Every write that places an appointment on the calendar runs
//! [`AppointmentsService::ensure_slot_free`] right before the repository call,
//! whatever availability the caller looked at before.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::instrument;

use super::{
    availability::{days_window, AvailabilityService},
    customers::CustomersService,
    events::EventBus,
    shops::ShopsService,
};
use crate::{
    error::{AppError, AppResult},
    models::{
        Appointment, AppointmentCanceled, AppointmentCreated, AppointmentStatus, BookAppointment,
        DomainEvent, NewAppointment, Shop, TimeRange, UpdateAppointment,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct AppointmentsService {
    repository: Repository,
    shops: ShopsService,
    customers: CustomersService,
    availability: AvailabilityService,
    events: EventBus,
}

impl AppointmentsService {
    pub fn new(
        repository: Repository,
        shops: ShopsService,
        customers: CustomersService,
        availability: AvailabilityService,
        events: EventBus,
    ) -> Self {
        Self {
            repository,
            shops,
            customers,
            availability,
            events,
        }
    }

    /// Booking guard: fails with `SlotUnavailable` when a non-canceled
    /// appointment of the shop overlaps `range` (other than `exclude_id`)
    pub async fn ensure_slot_free(
        &self,
        shop_id: i32,
        range: TimeRange,
        exclude_id: Option<i32>,
    ) -> AppResult<()> {
        if self
            .repository
            .appointments
            .check_for_conflicts(shop_id, range, exclude_id)
            .await?
        {
            tracing::warn!(shop_id, start = %range.start(), end = %range.end(), "Booking rejected, slot taken");
            return Err(AppError::SlotUnavailable(
                "The requested time slot is already booked".to_string(),
            ));
        }
        Ok(())
    }

    /// Book one of the shop's active services starting at `start_time`
    #[instrument(name = "appointments.book", skip(self, shop, notes), fields(shop_id = ?shop.id()))]
    pub async fn book(
        &self,
        shop: &Shop,
        service_id: i32,
        customer_id: i32,
        start_time: DateTime<Utc>,
        notes: Option<String>,
    ) -> AppResult<Appointment> {
        let shop_id = shop.persisted_id()?;
        let range = service_window(shop, service_id, start_time)?;
        self.customers.get(customer_id).await?;

        self.ensure_slot_free(shop_id, range, None).await?;

        let appointment = Appointment::new(NewAppointment {
            time_slot: range,
            shop_id,
            service_id,
            customer_id,
            notes,
        })?;
        let appointment = self.repository.appointments.create(appointment).await?;
        let appointment_id = appointment.persisted_id()?;
        tracing::info!(appointment_id, start = %range.start(), "Appointment booked");

        self.events.publish(DomainEvent::AppointmentCreated(AppointmentCreated {
            appointment_id,
            shop_id,
            customer_id,
            service_id,
            start_time: appointment.start_time(),
            cancel_token: appointment.cancel_token().to_string(),
        }));
        Ok(appointment)
    }

    /// Customer booking by shop slug. The window must be one of the slots
    /// currently offered for that day; the customer is found or created from
    /// the contact details.
    #[instrument(name = "appointments.book_public", skip(self, data), fields(service_id = data.service_id))]
    pub async fn book_public(&self, slug: &str, data: &BookAppointment) -> AppResult<Appointment> {
        let shop = self.shops.get_by_slug(slug).await?;
        let range = service_window(&shop, data.service_id, data.start_time)?;

        let offered = self
            .availability
            .for_shop(&shop, data.start_time.date_naive(), data.service_id)
            .await?;
        if !offered.contains(&range) {
            tracing::warn!(start = %range.start(), "Requested time is not an offered slot");
            return Err(AppError::SlotUnavailable(
                "The requested time is not an available slot".to_string(),
            ));
        }

        let customer = self.customers.find_or_create(data.customer.clone()).await?;
        self.book(
            &shop,
            data.service_id,
            customer.persisted_id()?,
            data.start_time,
            data.notes.clone(),
        )
        .await
    }

    /// Customer cancellation with the token handed out at booking time
    #[instrument(name = "appointments.cancel_by_token", skip_all)]
    pub async fn cancel_by_token(
        &self,
        cancel_token: &str,
        reason: Option<String>,
    ) -> AppResult<Appointment> {
        let mut appointment = self
            .repository
            .appointments
            .find_by_cancel_token(cancel_token)
            .await?
            .ok_or_else(|| AppError::NotFound("Appointment not found".to_string()))?;

        appointment.cancel(reason)?;
        let appointment = self.repository.appointments.update(appointment).await?;
        tracing::info!(appointment_id = ?appointment.id(), "Appointment canceled by customer");
        self.publish_canceled(&appointment)?;
        Ok(appointment)
    }

    /// Appointments of an owned shop starting between two UTC days, both included
    pub async fn list_for_shop(
        &self,
        owner_id: i32,
        shop_id: i32,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> AppResult<Vec<Appointment>> {
        if end_date < start_date {
            return Err(AppError::InvalidRange(
                "end_date must not be before start_date".to_string(),
            ));
        }
        self.shops.owned_shop(owner_id, shop_id).await?;
        let (from, to) = days_window(start_date, end_date)?;
        self.repository
            .appointments
            .find_by_date_range(shop_id, from, to)
            .await
    }

    /// A customer's appointments at an owned shop, most recent first
    pub async fn list_for_customer(
        &self,
        owner_id: i32,
        shop_id: i32,
        customer_id: i32,
    ) -> AppResult<Vec<Appointment>> {
        self.shops.owned_shop(owner_id, shop_id).await?;
        let mut history = self
            .repository
            .appointments
            .find_by_customer_id(customer_id)
            .await?;
        history.retain(|a| a.shop_id() == shop_id);
        Ok(history)
    }

    pub async fn get(&self, owner_id: i32, shop_id: i32, id: i32) -> AppResult<Appointment> {
        self.shops.owned_shop(owner_id, shop_id).await?;
        self.appointment_of_shop(shop_id, id).await
    }

    /// Owner edit: reschedule (guarded, own id excluded), notes, status transition
    #[instrument(name = "appointments.update", skip(self, data))]
    pub async fn update(
        &self,
        owner_id: i32,
        shop_id: i32,
        id: i32,
        data: &UpdateAppointment,
    ) -> AppResult<Appointment> {
        self.shops.owned_shop(owner_id, shop_id).await?;
        let mut appointment = self.appointment_of_shop(shop_id, id).await?;

        if let Some(start) = data.start_time {
            let range = TimeRange::starting_at(start, appointment.duration_minutes())?;
            if appointment.is_active() {
                self.ensure_slot_free(shop_id, range, Some(id)).await?;
            }
            appointment.reschedule(range)?;
        }
        if let Some(notes) = &data.notes {
            appointment.set_notes(Some(notes.clone()));
        }
        if let Some(status) = data.status {
            appointment.transition_to(status, data.cancellation_reason.clone())?;
        }

        let appointment = self.repository.appointments.update(appointment).await?;
        tracing::info!(status = %appointment.status(), "Appointment updated");
        if data.status == Some(AppointmentStatus::Canceled) {
            self.publish_canceled(&appointment)?;
        }
        Ok(appointment)
    }

    async fn appointment_of_shop(&self, shop_id: i32, id: i32) -> AppResult<Appointment> {
        self.repository
            .appointments
            .find_by_id(id)
            .await?
            .filter(|a| a.shop_id() == shop_id)
            .ok_or_else(|| AppError::NotFound(format!("Appointment {} not found", id)))
    }

    fn publish_canceled(&self, appointment: &Appointment) -> AppResult<()> {
        self.events.publish(DomainEvent::AppointmentCanceled(AppointmentCanceled {
            appointment_id: appointment.persisted_id()?,
            shop_id: appointment.shop_id(),
            customer_id: appointment.customer_id(),
            service_id: appointment.service_id(),
            start_time: appointment.start_time(),
            cancellation_reason: appointment.cancellation_reason().map(str::to_string),
        }));
        Ok(())
    }
}

/// Window of one active service of `shop` starting at `start_time`
fn service_window(shop: &Shop, service_id: i32, start_time: DateTime<Utc>) -> AppResult<TimeRange> {
    let service = shop
        .active_service(service_id)
        .ok_or_else(|| AppError::NotFound(format!("Service {} not found", service_id)))?;
    TimeRange::starting_at(start_time, i64::from(service.duration_minutes()))
}
