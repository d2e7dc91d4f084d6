//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use rust_decimal_macros::dec;
use uuid::Uuid;

use stallhub_booking::{AllocationRequest, BookingOrchestrator};
use stallhub_core::config::{BookingConfig, SequenceConfig};
use stallhub_database::MemoryStore;
use stallhub_entity::booking::BillingDetails;
use stallhub_entity::exhibition::{
    Discount, DiscountKind, Exhibition, ExhibitionStatus, TaxRate,
};
use stallhub_entity::requester::Requester;
use stallhub_entity::stall::{Stall, StallShape, StallStatus};

/// Test application context over an in-memory store
pub struct TestApp {
    /// Shared store, also used for direct assertions
    pub store: MemoryStore,
    /// Orchestrator under test
    pub orchestrator: Arc<BookingOrchestrator>,
    /// The published exhibition every helper books into
    pub exhibition: Exhibition,
}

impl TestApp {
    /// Create a test application whose store supports transactions
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }

    /// Create a test application that runs allocations in compensation mode
    pub fn without_transactions() -> Self {
        Self::with_store(MemoryStore::without_transactions())
    }

    fn with_store(store: MemoryStore) -> Self {
        let exhibition = exhibition();
        store.insert_exhibition(exhibition.clone());

        let config = BookingConfig {
            sequence: SequenceConfig {
                max_retries: 3,
                backoff_ms: 1,
            },
            ..BookingConfig::default()
        };
        let orchestrator = Arc::new(BookingOrchestrator::new(Arc::new(store.clone()), &config));

        Self {
            store,
            orchestrator,
            exhibition,
        }
    }

    /// Insert `count` available 10 x 10 stalls at rate 10
    pub fn seed_stalls(&self, count: usize) -> Vec<Uuid> {
        (0..count)
            .map(|i| {
                let stall = Stall::new(
                    Uuid::new_v4(),
                    self.exhibition.id,
                    format!("H-{}", i + 1),
                    dec!(10),
                    StallShape::Rectangle {
                        width: dec!(10),
                        height: dec!(10),
                    },
                );
                let id = stall.id;
                self.store.insert_stall(stall);
                id
            })
            .collect()
    }

    /// Build a request from a fresh exhibitor
    pub fn request(&self, stall_ids: Vec<Uuid>) -> AllocationRequest {
        AllocationRequest {
            exhibition_id: self.exhibition.id,
            stall_ids,
            requester: Requester::exhibitor(Uuid::new_v4()),
            discount_id: None,
            billing: billing(),
        }
    }

    /// Current status of a stall
    pub fn status(&self, stall_id: Uuid) -> StallStatus {
        self.store
            .stall(stall_id)
            .map(|s| s.status())
            .expect("stall exists")
    }
}

/// A published exhibition with one tax line and one discount per list
pub fn exhibition() -> Exhibition {
    Exhibition {
        id: Uuid::new_v4(),
        name: "Harbour Expo".to_string(),
        status: ExhibitionStatus::Published,
        is_active: true,
        invoice_prefix: "HBX".to_string(),
        discounts: vec![Discount {
            id: "sponsor".to_string(),
            name: "Sponsor".to_string(),
            kind: DiscountKind::Percentage,
            value: dec!(10),
            is_active: true,
        }],
        public_discounts: vec![Discount {
            id: "early".to_string(),
            name: "Early".to_string(),
            kind: DiscountKind::Fixed,
            value: dec!(100),
            is_active: true,
        }],
        taxes: vec![TaxRate {
            name: "VAT".to_string(),
            rate: dec!(5),
            is_active: true,
        }],
    }
}

/// Valid billing details
pub fn billing() -> BillingDetails {
    BillingDetails {
        company_name: "Northwind Traders".to_string(),
        contact_name: "Alex Morgan".to_string(),
        email: "accounts@northwind.example".to_string(),
        phone: Some("+1 555 0100".to_string()),
        address: None,
        tax_id: None,
    }
}
