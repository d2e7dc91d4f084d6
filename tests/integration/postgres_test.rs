//! Integration tests against a real PostgreSQL database.
//!
//! Skipped unless `STALLHUB_TEST_DATABASE_URL` points at a disposable
//! database; migrations are applied to it.

mod helpers;

use std::sync::Arc;

use rust_decimal_macros::dec;
use sqlx::types::Json;
use uuid::Uuid;

use stallhub_booking::{AllocationError, BookingOrchestrator};
use stallhub_core::config::AppConfig;
use stallhub_database::{BookingStore, DatabasePool, PgBookingStore};
use stallhub_entity::invoice::InvoiceNumbering;
use stallhub_entity::stall::{StallShape, StallStatus};

struct PgTestApp {
    pool: DatabasePool,
    store: PgBookingStore,
    exhibition_id: Uuid,
}

impl PgTestApp {
    async fn connect(transactions_enabled: bool) -> Option<Self> {
        Self::connect_with_pool(transactions_enabled, 10).await
    }

    async fn connect_with_pool(transactions_enabled: bool, max_connections: u32) -> Option<Self> {
        let url = std::env::var("STALLHUB_TEST_DATABASE_URL").ok()?;
        let config = AppConfig::from_toml(&format!(
            "[database]\nurl = \"{url}\"\nmax_connections = {max_connections}\n\
             min_connections = 1\ntransactions_enabled = {transactions_enabled}\n"
        ))
        .expect("valid test config");

        let pool = DatabasePool::connect(&config.database)
            .await
            .expect("Failed to connect to test database");
        stallhub_database::migration::run_migrations(pool.pool())
            .await
            .expect("Failed to run migrations");

        let mut exhibition = helpers::exhibition();
        // A fresh prefix keeps each run's invoice counter independent.
        exhibition.invoice_prefix = format!("T{}", &Uuid::new_v4().simple().to_string()[..6]);
        sqlx::query(
            "INSERT INTO exhibitions (id, name, status, is_active, invoice_prefix, discounts, \
             public_discounts, taxes) VALUES ($1, $2, 'published', TRUE, $3, $4, $5, $6)",
        )
        .bind(exhibition.id)
        .bind(&exhibition.name)
        .bind(&exhibition.invoice_prefix)
        .bind(Json(&exhibition.discounts))
        .bind(Json(&exhibition.public_discounts))
        .bind(Json(&exhibition.taxes))
        .execute(pool.pool())
        .await
        .expect("Failed to insert exhibition");

        let store = pool.booking_store(&config.database);
        Some(Self {
            pool,
            store,
            exhibition_id: exhibition.id,
        })
    }

    async fn seed_stalls(&self, count: usize) -> Vec<Uuid> {
        let mut ids = Vec::with_capacity(count);
        for i in 0..count {
            let id = Uuid::new_v4();
            let shape = StallShape::Rectangle {
                width: dec!(10),
                height: dec!(10),
            };
            sqlx::query(
                "INSERT INTO stalls (id, exhibition_id, number, rate_per_unit, shape) \
                 VALUES ($1, $2, $3, 10.0, $4)",
            )
            .bind(id)
            .bind(self.exhibition_id)
            .bind(format!("PG-{}", i + 1))
            .bind(Json(&shape))
            .execute(self.pool.pool())
            .await
            .expect("Failed to insert stall");
            ids.push(id);
        }
        ids
    }

    fn orchestrator(&self) -> Arc<BookingOrchestrator> {
        Arc::new(BookingOrchestrator::new(
            Arc::new(self.store.clone()),
            &Default::default(),
        ))
    }

    fn request(&self, stall_ids: Vec<Uuid>) -> stallhub_booking::AllocationRequest {
        stallhub_booking::AllocationRequest {
            exhibition_id: self.exhibition_id,
            stall_ids,
            requester: stallhub_entity::requester::Requester::operator(Uuid::new_v4()),
            discount_id: Some("sponsor".to_string()),
            billing: helpers::billing(),
        }
    }
}

async fn allocate_and_read_back(transactions_enabled: bool) {
    let Some(app) = PgTestApp::connect(transactions_enabled).await else {
        eprintln!("STALLHUB_TEST_DATABASE_URL not set, skipping");
        return;
    };
    assert_eq!(
        app.store.supports_transactions().await.unwrap(),
        transactions_enabled
    );

    let stalls = app.seed_stalls(2).await;
    let outcome = app
        .orchestrator()
        .allocate(&app.request(stalls.clone()))
        .await
        .unwrap();

    assert_eq!(outcome.booking.total_amount(), dec!(1890));
    assert!(outcome.invoice.invoice_number.ends_with("-00001"));

    for id in &stalls {
        let stall = app.store.find_stall(*id).await.unwrap().unwrap();
        assert_eq!(stall.status(), StallStatus::Booked);
        assert_eq!(stall.booking_id(), Some(outcome.booking.id));
    }

    let booking = app
        .store
        .find_booking(outcome.booking.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(booking.stall_ids, stalls);
    assert_eq!(booking.pricing, outcome.booking.pricing);

    let invoice = app
        .store
        .find_invoice_for_booking(booking.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(invoice.invoice_number, outcome.invoice.invoice_number);

    let err = app
        .orchestrator()
        .allocate(&app.request(vec![stalls[0]]))
        .await
        .unwrap_err();
    assert!(matches!(err, AllocationError::Conflict { .. }));
}

#[tokio::test]
async fn test_allocate_with_transactions() {
    allocate_and_read_back(true).await;
}

#[tokio::test]
async fn test_allocate_in_compensation_mode() {
    allocate_and_read_back(false).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_for_one_stall() {
    let Some(app) = PgTestApp::connect(true).await else {
        eprintln!("STALLHUB_TEST_DATABASE_URL not set, skipping");
        return;
    };
    let stall = app.seed_stalls(1).await[0];
    let orchestrator = app.orchestrator();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let orchestrator = Arc::clone(&orchestrator);
            let request = app.request(vec![stall]);
            tokio::spawn(async move { orchestrator.allocate(&request).await })
        })
        .collect();

    let mut winners = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => winners += 1,
            Err(e) => assert!(e.is_retryable(), "unexpected error: {e}"),
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_opposite_lock_orders_conflict_instead_of_failing() {
    let Some(app) = PgTestApp::connect(true).await else {
        eprintln!("STALLHUB_TEST_DATABASE_URL not set, skipping");
        return;
    };
    let orchestrator = app.orchestrator();

    for _ in 0..10 {
        let stalls = app.seed_stalls(3).await;
        let forward = app.request(stalls.clone());
        let backward = app.request(stalls.iter().rev().copied().collect());

        let a = {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move { orchestrator.allocate(&forward).await })
        };
        let b = {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move { orchestrator.allocate(&backward).await })
        };

        let mut winners = 0;
        for result in [a.await.unwrap(), b.await.unwrap()] {
            match result {
                Ok(_) => winners += 1,
                Err(e) => {
                    assert!(e.is_retryable(), "unexpected error: {e}");
                    assert_eq!(e.conflicting_stalls().len(), 1);
                }
            }
        }
        assert!(winners <= 1);

        for id in &stalls {
            let stall = app.store.find_stall(*id).await.unwrap().unwrap();
            let expected = if winners == 1 {
                StallStatus::Booked
            } else {
                StallStatus::Available
            };
            assert_eq!(stall.status(), expected);
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_saturated_pool_still_numbers_invoices() {
    let Some(app) = PgTestApp::connect_with_pool(true, 2).await else {
        eprintln!("STALLHUB_TEST_DATABASE_URL not set, skipping");
        return;
    };
    let stalls = app.seed_stalls(6).await;
    let orchestrator = app.orchestrator();

    let handles: Vec<_> = stalls
        .iter()
        .map(|id| {
            let orchestrator = Arc::clone(&orchestrator);
            let request = app.request(vec![*id]);
            tokio::spawn(async move { orchestrator.allocate(&request).await })
        })
        .collect();

    let mut numbers = std::collections::HashSet::new();
    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome.invoice.numbering, InvoiceNumbering::Sequential);
        assert!(numbers.insert(outcome.invoice.invoice_number));
    }
    assert_eq!(numbers.len(), 6);
}
