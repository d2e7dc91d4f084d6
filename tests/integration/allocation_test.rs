//! Integration tests for concurrent stall allocation.

mod helpers;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal_macros::dec;
use uuid::Uuid;

use stallhub_booking::{AllocationError, LockManager};
use stallhub_database::{BookingStore, SessionMode};
use stallhub_entity::invoice::InvoiceNumbering;
use stallhub_entity::requester::Requester;
use stallhub_entity::stall::StallStatus;
use stallhub_worker::LockReaper;

use helpers::TestApp;

async fn run_overlapping(app: &TestApp) {
    let stalls = app.seed_stalls(10);

    // Each request wants three neighbouring stalls, in rotating order, so
    // every stall is contended by three requests.
    let mut handles = Vec::new();
    for i in 0..30 {
        let mut wanted: Vec<Uuid> = (0..3).map(|k| stalls[(i + k) % 10]).collect();
        wanted.rotate_left(i % 3);
        let request = app.request(wanted);
        let orchestrator = Arc::clone(&app.orchestrator);
        handles.push(tokio::spawn(async move {
            orchestrator.allocate(&request).await
        }));
    }

    let mut owners: HashMap<Uuid, Uuid> = HashMap::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(outcome) => {
                for stall_id in &outcome.booking.stall_ids {
                    let previous = owners.insert(*stall_id, outcome.booking.id);
                    assert!(previous.is_none(), "stall {stall_id} allocated twice");
                }
            }
            Err(AllocationError::Conflict { conflicts }) => assert!(!conflicts.is_empty()),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    for stall_id in &stalls {
        let stall = app.store.stall(*stall_id).unwrap();
        match owners.get(stall_id) {
            Some(booking_id) => {
                assert_eq!(stall.status(), StallStatus::Booked);
                assert_eq!(stall.booking_id(), Some(*booking_id));
            }
            None => assert_eq!(stall.status(), StallStatus::Available),
        }
    }
    assert_eq!(app.store.bookings().len(), app.store.invoices().len());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_overlapping_requests_never_double_allocate() {
    run_overlapping(&TestApp::new()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_overlapping_requests_without_transactions() {
    run_overlapping(&TestApp::without_transactions()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_requests_for_one_stall_have_one_winner() {
    let app = TestApp::new();
    let stall = app.seed_stalls(1)[0];

    let first = app.request(vec![stall]);
    let second = app.request(vec![stall]);
    let (a, b) = tokio::join!(
        app.orchestrator.allocate(&first),
        app.orchestrator.allocate(&second)
    );

    let (winner, loser) = match (a, b) {
        (Ok(w), Err(l)) | (Err(l), Ok(w)) => (w, l),
        (a, b) => panic!("expected exactly one winner, got {a:?} and {b:?}"),
    };
    assert_eq!(winner.booking.stall_ids, vec![stall]);
    assert!(loser.is_retryable());
    assert_eq!(loser.conflicting_stalls(), vec![stall]);
    assert_eq!(app.status(stall), StallStatus::Booked);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_invoices_are_numbered_uniquely() {
    let app = TestApp::new();
    let stalls = app.seed_stalls(25);

    let outcomes = futures::future::join_all(stalls.iter().map(|id| {
        let request = app.request(vec![*id]);
        let orchestrator = Arc::clone(&app.orchestrator);
        tokio::spawn(async move { orchestrator.allocate(&request).await })
    }))
    .await;

    let mut sequences = HashSet::new();
    for outcome in outcomes {
        let invoice = outcome.unwrap().unwrap().invoice;
        assert_eq!(invoice.numbering, InvoiceNumbering::Sequential);
        assert!(sequences.insert(invoice.sequence));
    }
    assert_eq!(sequences, (1..=25).collect::<HashSet<i64>>());
}

#[tokio::test]
async fn test_abandoned_lock_is_taken_over_after_expiry() {
    let app = TestApp::new();
    let stall = app.seed_stalls(1)[0];

    // A requester that locked and then vanished, with a lock already expired.
    let mut session = app.store.session(SessionMode::Autocommit).await.unwrap();
    LockManager::with_ttl(Duration::zero())
        .acquire(session.as_mut(), &[stall], &Requester::exhibitor(Uuid::new_v4()))
        .await
        .unwrap();
    assert_eq!(app.status(stall), StallStatus::Reserved);

    let outcome = app.orchestrator.allocate(&app.request(vec![stall])).await.unwrap();
    assert_eq!(app.store.stall(stall).unwrap().booking_id(), Some(outcome.booking.id));
}

#[tokio::test]
async fn test_reaper_frees_abandoned_lock_but_not_live_one() {
    let app = TestApp::new();
    let stalls = app.seed_stalls(2);
    let mut session = app.store.session(SessionMode::Autocommit).await.unwrap();

    LockManager::with_ttl(Duration::seconds(30))
        .acquire(session.as_mut(), &stalls[..1], &Requester::operator(Uuid::new_v4()))
        .await
        .unwrap();
    LockManager::with_ttl(Duration::seconds(30))
        .acquire(session.as_mut(), &stalls[1..], &Requester::operator(Uuid::new_v4()))
        .await
        .unwrap();

    let store: Arc<dyn BookingStore> = Arc::new(app.store.clone());
    let reaper = LockReaper::new(store);

    assert_eq!(reaper.sweep().await.unwrap(), 0);
    assert_eq!(app.status(stalls[0]), StallStatus::Reserved);

    // Forced sweep as of a minute from now: both TTLs have passed.
    assert_eq!(reaper.sweep_at(Utc::now() + Duration::seconds(60)).await.unwrap(), 2);
    assert_eq!(app.status(stalls[0]), StallStatus::Available);
    assert_eq!(app.status(stalls[1]), StallStatus::Available);
}

#[tokio::test]
async fn test_booking_and_invoice_are_readable_after_allocation() {
    let app = TestApp::new();
    let stalls = app.seed_stalls(2);
    let mut request = app.request(stalls.clone());
    request.discount_id = Some("early".to_string());

    let outcome = app.orchestrator.allocate(&request).await.unwrap();

    let booking = app
        .store
        .find_booking(outcome.booking.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(booking, outcome.booking);
    assert_eq!(booking.pricing.discount_amount, dec!(100));
    assert_eq!(booking.pricing.stalls[0].discount_amount, dec!(50));
    assert_eq!(booking.total_amount(), dec!(1995));

    let invoice = app
        .store
        .find_invoice_for_booking(booking.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(invoice, outcome.invoice);
    assert!(invoice.invoice_number.starts_with("HBX-"));
    assert!(invoice.invoice_number.ends_with("-00001"));
}
