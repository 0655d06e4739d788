//! Booking scenarios against the in-memory store

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use barberflow_server::{
    error::{AppError, AppResult},
    models::{
        schedule::CreateScheduleRule, AppointmentStatus, CustomerContact, DomainEvent, EventKind,
        Money, NewService, NewShop,
    },
    repository::Repository,
    services::{
        events::{EventBus, EventHandler},
        Services,
    },
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use tokio::sync::mpsc;

const OWNER: i32 = 100;

struct Seeded {
    services: Services,
    repository: Repository,
    shop_id: i32,
    service_id: i32,
    customers: Vec<i32>,
}

/// Shop open Mondays 09:00-18:00 with a 30 minute haircut, and eight customers
async fn seed(events: EventBus) -> Seeded {
    let repository = Repository::in_memory();
    let services = Services::new(repository.clone(), events);

    let shop = services
        .shops
        .create(NewShop {
            name: "Barbearia Vila Madalena".to_string(),
            slug: "vila-madalena".to_string(),
            description: Some("Cortes clássicos".to_string()),
            address: None,
            logo_url: None,
            owner_id: OWNER,
            timezone: Some("America/Sao_Paulo".to_string()),
        })
        .await
        .unwrap();
    let shop_id = shop.persisted_id().unwrap();

    let haircut = services
        .shops
        .add_service(
            OWNER,
            shop_id,
            NewService {
                shop_id,
                name: "Haircut".to_string(),
                description: None,
                price: Money::brl(Decimal::new(4500, 2)).unwrap(),
                duration_minutes: 30,
            },
        )
        .await
        .unwrap();

    services
        .schedules
        .create(
            OWNER,
            shop_id,
            &CreateScheduleRule {
                day_of_week: 1,
                start_time: "09:00".to_string(),
                end_time: "18:00".to_string(),
            },
        )
        .await
        .unwrap();

    let mut customers = Vec::new();
    for n in 1..=8 {
        let customer = services
            .customers
            .find_or_create(CustomerContact {
                name: format!("Cliente {}", n),
                email: format!("cliente{}@mail.com", n),
                phone: format!("1199999000{}", n),
            })
            .await
            .unwrap();
        customers.push(customer.persisted_id().unwrap());
    }

    Seeded {
        services,
        repository,
        shop_id,
        service_id: haircut.persisted_id().unwrap(),
        customers,
    }
}

// 2025-03-10 is a Monday
fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
}

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap()
}

#[tokio::test]
async fn test_monday_availability_after_one_booking() {
    let s = seed(EventBus::default()).await;
    let shop = s.services.shops.get_by_id(s.shop_id).await.unwrap();
    s.services
        .appointments
        .book(&shop, s.service_id, s.customers[0], at(9, 0), None)
        .await
        .unwrap();

    let (_, slots) = s
        .services
        .availability
        .for_slug("vila-madalena", monday(), s.service_id)
        .await
        .unwrap();

    assert_eq!(slots.len(), 33);
    assert_eq!((slots[0].start(), slots[0].end()), (at(9, 30), at(10, 0)));
    assert!(slots.iter().all(|slot| slot.start() >= at(9, 30)));

    // Sao Paulo is UTC-3
    assert_eq!(
        slots[0].format(shop.tz()),
        ("06:30".to_string(), "07:00".to_string())
    );

    // Tuesday has no rule
    let (_, tuesday) = s
        .services
        .availability
        .for_slug("vila-madalena", monday().succ_opt().unwrap(), s.service_id)
        .await
        .unwrap();
    assert!(tuesday.is_empty());
}

#[tokio::test]
async fn test_cancel_reopens_the_slot() {
    let s = seed(EventBus::default()).await;
    let shop = s.services.shops.get_by_id(s.shop_id).await.unwrap();
    let booked = s
        .services
        .appointments
        .book(&shop, s.service_id, s.customers[0], at(9, 0), None)
        .await
        .unwrap();

    s.services
        .appointments
        .cancel_by_token(booked.cancel_token(), None)
        .await
        .unwrap();

    let (_, slots) = s
        .services
        .availability
        .for_slug("vila-madalena", monday(), s.service_id)
        .await
        .unwrap();
    assert_eq!(slots.len(), 35);
    assert_eq!(slots[0].start(), at(9, 0));

    let history = s.repository.appointments.find_by_customer_id(s.customers[0]).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status(), AppointmentStatus::Canceled);
}

#[tokio::test]
async fn test_concurrent_bookings_of_one_slot() {
    let s = seed(EventBus::default()).await;
    let shop = s.services.shops.get_by_id(s.shop_id).await.unwrap();

    let mut tasks = Vec::new();
    for &customer_id in &s.customers {
        let appointments = s.services.appointments.clone();
        let shop = shop.clone();
        let service_id = s.service_id;
        tasks.push(tokio::spawn(async move {
            appointments
                .book(&shop, service_id, customer_id, at(11, 0), None)
                .await
        }));
    }

    let mut booked = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => booked += 1,
            Err(AppError::SlotUnavailable(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(booked, 1);
    let stored = s
        .repository
        .appointments
        .find_by_shop_id(s.shop_id)
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn test_rule_guard_per_day() {
    let s = seed(EventBus::default()).await;
    let rule = |day, start: &str, end: &str| CreateScheduleRule {
        day_of_week: day,
        start_time: start.to_string(),
        end_time: end.to_string(),
    };

    let err = s
        .services
        .schedules
        .create(OWNER, s.shop_id, &rule(1, "17:00", "20:00"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::RuleConflict(_)));

    s.services
        .schedules
        .create(OWNER, s.shop_id, &rule(1, "18:00", "20:00"))
        .await
        .unwrap();
    s.services
        .schedules
        .create(OWNER, s.shop_id, &rule(3, "17:00", "20:00"))
        .await
        .unwrap();

    // The evening rule extends Monday availability
    let (_, slots) = s
        .services
        .availability
        .for_slug("vila-madalena", monday(), s.service_id)
        .await
        .unwrap();
    assert_eq!(slots.last().unwrap().end(), at(20, 0));
}

struct Forward(mpsc::UnboundedSender<DomainEvent>);

#[async_trait]
impl EventHandler for Forward {
    async fn handle(&self, event: &DomainEvent) -> AppResult<()> {
        let _ = self.0.send(event.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "forward"
    }
}

struct Broken;

#[async_trait]
impl EventHandler for Broken {
    async fn handle(&self, _event: &DomainEvent) -> AppResult<()> {
        Err(AppError::Internal("mail relay down".to_string()))
    }

    fn name(&self) -> &'static str {
        "broken"
    }
}

#[tokio::test]
async fn test_events_follow_the_lifecycle() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let forward = Arc::new(Forward(tx));
    let events = EventBus::builder()
        .subscribe(EventKind::AppointmentCreated, Arc::new(Broken))
        .subscribe(EventKind::AppointmentCreated, forward.clone())
        .subscribe(EventKind::AppointmentCanceled, forward)
        .build();
    let s = seed(events).await;
    let shop = s.services.shops.get_by_id(s.shop_id).await.unwrap();

    // A failing listener does not undo the booking
    let booked = s
        .services
        .appointments
        .book(&shop, s.service_id, s.customers[0], at(14, 0), None)
        .await
        .unwrap();
    let received = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    match received {
        DomainEvent::AppointmentCreated(created) => {
            assert_eq!(created.appointment_id, booked.persisted_id().unwrap());
            assert_eq!(created.cancel_token, booked.cancel_token());
            assert_eq!(created.start_time, at(14, 0));
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert!(s
        .repository
        .appointments
        .find_by_id(booked.persisted_id().unwrap())
        .await
        .unwrap()
        .is_some());

    s.services
        .appointments
        .cancel_by_token(booked.cancel_token(), Some("sick".to_string()))
        .await
        .unwrap();
    let received = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(
        received,
        DomainEvent::AppointmentCanceled(ref canceled)
            if canceled.cancellation_reason.as_deref() == Some("sick")
    ));
}

#[tokio::test]
async fn test_deleted_appointment_releases_window() {
    let s = seed(EventBus::default()).await;
    let shop = s.services.shops.get_by_id(s.shop_id).await.unwrap();
    let booked = s
        .services
        .appointments
        .book(&shop, s.service_id, s.customers[0], at(15, 0), None)
        .await
        .unwrap();
    let id = booked.persisted_id().unwrap();

    assert!(s.repository.appointments.delete(id).await.unwrap());
    assert!(!s.repository.appointments.delete(id).await.unwrap());
    s.services
        .appointments
        .book(&shop, s.service_id, s.customers[1], at(15, 0), None)
        .await
        .unwrap();
}
