//! Fixtures shared by the unit tests in this crate.

use rust_decimal_macros::dec;
use uuid::Uuid;

use stallhub_database::MemoryStore;
use stallhub_entity::booking::BillingDetails;
use stallhub_entity::exhibition::{
    Discount, DiscountKind, Exhibition, ExhibitionStatus, TaxRate,
};
use stallhub_entity::stall::{Stall, StallShape};

pub(crate) fn exhibition() -> Exhibition {
    Exhibition {
        id: Uuid::new_v4(),
        name: "Spring Trade Fair".to_string(),
        status: ExhibitionStatus::Published,
        is_active: true,
        invoice_prefix: "INV".to_string(),
        discounts: vec![
            Discount {
                id: "early-bird".to_string(),
                name: "Early bird".to_string(),
                kind: DiscountKind::Percentage,
                value: dec!(10),
                is_active: true,
            },
            Discount {
                id: "retired".to_string(),
                name: "Retired".to_string(),
                kind: DiscountKind::Percentage,
                value: dec!(50),
                is_active: false,
            },
        ],
        public_discounts: vec![Discount {
            id: "portal-flat".to_string(),
            name: "Portal flat".to_string(),
            kind: DiscountKind::Fixed,
            value: dec!(150),
            is_active: true,
        }],
        taxes: vec![TaxRate {
            name: "GST".to_string(),
            rate: dec!(5),
            is_active: true,
        }],
    }
}

/// Inserts a published exhibition into `store`.
pub(crate) fn store_with_exhibition(store: MemoryStore) -> (MemoryStore, Exhibition) {
    let exhibition = exhibition();
    store.insert_exhibition(exhibition.clone());
    (store, exhibition)
}

/// A 10 x 10 stall at rate 10 (base amount 1000).
pub(crate) fn stall(exhibition_id: Uuid, number: &str) -> Stall {
    Stall::new(
        Uuid::new_v4(),
        exhibition_id,
        number,
        dec!(10),
        StallShape::Rectangle {
            width: dec!(10),
            height: dec!(10),
        },
    )
}

/// Inserts `count` available stalls and returns their ids in insertion order.
pub(crate) fn seed_stalls(store: &MemoryStore, exhibition_id: Uuid, count: usize) -> Vec<Uuid> {
    (0..count)
        .map(|i| {
            let stall = stall(exhibition_id, &format!("A-{}", i + 1));
            let id = stall.id;
            store.insert_stall(stall);
            id
        })
        .collect()
}

pub(crate) fn billing() -> BillingDetails {
    BillingDetails {
        company_name: "Acme Fixtures Ltd".to_string(),
        contact_name: "Sam Rivera".to_string(),
        email: "billing@acme.example".to_string(),
        phone: None,
        address: None,
        tax_id: None,
    }
}
