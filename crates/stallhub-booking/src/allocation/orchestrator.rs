//! Booking orchestrator.

use std::sync::Arc;

use chrono::{Datelike, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use stallhub_core::config::BookingConfig;
use stallhub_core::error::AppError;
use stallhub_database::{BookingStore, SessionMode, StoreSession};
use stallhub_entity::booking::{Booking, BookingSource, BookingStatus, PaymentStatus};
use stallhub_entity::exhibition::{Discount, Exhibition};
use stallhub_entity::invoice::{Invoice, InvoiceNumbering, InvoiceStatus};

use super::AllocationOutcome;
use super::error::AllocationError;
use super::request::AllocationRequest;
use crate::lock::{LockHandle, LockManager};
use crate::pricing::PriceCalculator;
use crate::sequence::SequenceCounter;

/// Turns an [`AllocationRequest`] into a booking, an invoice and booked
/// stalls, or into nothing at all.
///
/// Runs inside one store transaction when the store offers one. Otherwise
/// every write stands alone and a failure is undone step by step.
#[derive(Debug, Clone)]
pub struct BookingOrchestrator {
    /// Storage backend.
    store: Arc<dyn BookingStore>,
    /// Stall lock primitives.
    locks: LockManager,
    /// Invoice sequence minting.
    counter: SequenceCounter,
    /// Price computation.
    pricing: PriceCalculator,
}

impl BookingOrchestrator {
    /// Creates an orchestrator over `store`.
    pub fn new(store: Arc<dyn BookingStore>, config: &BookingConfig) -> Self {
        Self {
            locks: LockManager::new(config),
            counter: SequenceCounter::new(Arc::clone(&store), &config.sequence),
            pricing: PriceCalculator,
            store,
        }
    }

    /// The storage backend.
    pub fn store(&self) -> &Arc<dyn BookingStore> {
        &self.store
    }

    /// Allocates the requested stalls.
    ///
    /// 1. Check the request and load a bookable exhibition
    /// 2. Resolve the discount from the requester role's list
    /// 3. Lock every stall
    /// 4. Reload the locked stalls
    /// 5. Price them
    /// 6. Persist the booking, mint the invoice number, persist the invoice
    /// 7. Confirm the locks and commit
    ///
    /// Any failure after step 3 releases exactly the locks taken in step 3.
    pub async fn allocate(
        &self,
        request: &AllocationRequest,
    ) -> Result<AllocationOutcome, AllocationError> {
        // Step 1: Validate and load the exhibition
        request.check()?;
        let exhibition = self.load_bookable_exhibition(request.exhibition_id).await?;

        // Step 2: Resolve the discount
        let discount = resolve_discount(&exhibition, request)?;

        // Step 3: Lock the stalls
        let mode = self.select_mode().await;
        let mut session = self.store.session(mode).await?;

        let handle = match self
            .locks
            .acquire(session.as_mut(), &request.stall_ids, &request.requester)
            .await
        {
            Ok(handle) => handle,
            Err(e) => {
                // The lock manager already released its partial acquisition.
                if let Err(rb) = session.rollback().await {
                    error!(error = %rb, "Failed to roll back after lock failure");
                }
                return Err(e.into());
            }
        };

        // Steps 4-7: If anything fails from here, the locks must be released
        let booking_id = Uuid::new_v4();
        let result = self
            .complete(
                session.as_mut(),
                request,
                &exhibition,
                discount.as_ref(),
                &handle,
                booking_id,
            )
            .await;

        match result {
            Ok(outcome) => {
                info!(
                    booking_id = %outcome.booking.id,
                    exhibition_id = %exhibition.id,
                    requester_id = %request.requester.id,
                    invoice_number = %outcome.invoice.invoice_number,
                    stalls = outcome.booking.stall_ids.len(),
                    total = %outcome.booking.total_amount(),
                    mode = ?mode,
                    "Stalls allocated"
                );
                Ok(outcome)
            }
            Err(e) => {
                error!(
                    booking_id = %booking_id,
                    lock_id = %handle.lock_id,
                    mode = ?mode,
                    error = %e,
                    "Allocation failed after locking, compensating"
                );
                self.compensate(session, &handle, booking_id).await;
                Err(e)
            }
        }
    }

    async fn load_bookable_exhibition(
        &self,
        exhibition_id: Uuid,
    ) -> Result<Exhibition, AllocationError> {
        let exhibition = self
            .store
            .find_exhibition(exhibition_id)
            .await?
            .ok_or_else(|| {
                AllocationError::Validation(format!("Exhibition {exhibition_id} not found"))
            })?;

        if !exhibition.is_bookable() {
            return Err(AllocationError::Validation(format!(
                "Exhibition {} is not open for booking (status {}, active {})",
                exhibition.id, exhibition.status, exhibition.is_active
            )));
        }
        Ok(exhibition)
    }

    /// Probes the store once per allocation. A failed probe degrades to
    /// compensation mode rather than failing the request.
    async fn select_mode(&self) -> SessionMode {
        match self.store.supports_transactions().await {
            Ok(true) => SessionMode::Transactional,
            Ok(false) => SessionMode::Autocommit,
            Err(e) => {
                warn!(error = %e, "Transaction probe failed, using compensation mode");
                SessionMode::Autocommit
            }
        }
    }

    async fn complete(
        &self,
        session: &mut dyn StoreSession,
        request: &AllocationRequest,
        exhibition: &Exhibition,
        discount: Option<&Discount>,
        handle: &LockHandle,
        booking_id: Uuid,
    ) -> Result<AllocationOutcome, AllocationError> {
        // Step 4: Reload the locked stalls
        let stalls = session.find_stalls(&request.stall_ids).await?;
        if stalls.len() != handle.stall_ids.len() {
            return Err(AllocationError::Fatal(AppError::internal(format!(
                "Locked {} stalls but reloaded {}",
                handle.stall_ids.len(),
                stalls.len()
            ))));
        }
        if let Some(foreign) = stalls.iter().find(|s| s.exhibition_id != exhibition.id) {
            return Err(AllocationError::Validation(format!(
                "Stall {} does not belong to exhibition {}",
                foreign.id, exhibition.id
            )));
        }

        // Step 5: Price
        let pricing = self
            .pricing
            .price(&stalls, discount, exhibition.active_taxes());

        // Step 6: Persist booking and invoice
        let now = Utc::now();
        let booking = Booking {
            id: booking_id,
            exhibition_id: exhibition.id,
            stall_ids: request.stall_ids.clone(),
            requester_id: request.requester.id,
            requester_role: request.requester.role,
            source: BookingSource::from(request.requester.role),
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            discount_id: discount.map(|d| d.id.clone()),
            billing: request.billing.clone(),
            pricing,
            created_at: now,
        };
        session.insert_booking(&booking).await?;

        let year = now.year();
        let sequence = self.counter.next(&exhibition.invoice_prefix, year).await;
        let invoice = Invoice {
            id: Uuid::new_v4(),
            booking_id,
            exhibition_id: exhibition.id,
            invoice_number: Invoice::format_number(
                &exhibition.invoice_prefix,
                year,
                sequence.value(),
            ),
            sequence: sequence.value(),
            sequence_year: year,
            numbering: if sequence.is_uncertain() {
                InvoiceNumbering::Provisional
            } else {
                InvoiceNumbering::Sequential
            },
            amount: booking.total_amount(),
            status: InvoiceStatus::Pending,
            issued_at: now,
        };
        if sequence.is_uncertain() {
            error!(
                booking_id = %booking_id,
                invoice_number = %invoice.invoice_number,
                "Invoice issued with a provisional number"
            );
        }
        session.insert_invoice(&invoice).await?;

        // Step 7: Confirm and commit
        self.locks
            .confirm(session, &handle.stall_ids, handle.lock_id, booking_id)
            .await?;
        session.commit().await?;

        Ok(AllocationOutcome { booking, invoice })
    }

    /// Undoes a failed allocation. Never fails; problems are logged.
    async fn compensate(
        &self,
        mut session: Box<dyn StoreSession>,
        handle: &LockHandle,
        booking_id: Uuid,
    ) {
        match session.mode() {
            SessionMode::Transactional => {
                if let Err(e) = session.rollback().await {
                    error!(booking_id = %booking_id, error = %e, "Transaction rollback failed");
                }
                drop(session);

                // The rollback drops the locks with everything else; releasing
                // by lock id again also covers a rollback that never reached
                // the store.
                match self.store.session(SessionMode::Autocommit).await {
                    Ok(mut fresh) => {
                        if let Err(e) = self
                            .locks
                            .release(fresh.as_mut(), &handle.stall_ids, handle.lock_id)
                            .await
                        {
                            error!(
                                lock_id = %handle.lock_id,
                                error = %e,
                                "Failed to release stall locks"
                            );
                        }
                    }
                    Err(e) => {
                        error!(
                            lock_id = %handle.lock_id,
                            error = %e,
                            "No session to release stall locks"
                        );
                    }
                }
            }
            SessionMode::Autocommit => {
                if let Err(e) = session.revert_stalls(&handle.stall_ids, booking_id).await {
                    error!(
                        booking_id = %booking_id,
                        error = %e,
                        "Failed to revert confirmed stalls"
                    );
                }
                if let Err(e) = self
                    .locks
                    .release(session.as_mut(), &handle.stall_ids, handle.lock_id)
                    .await
                {
                    error!(lock_id = %handle.lock_id, error = %e, "Failed to release stall locks");
                }
                if let Err(e) = session.delete_booking(booking_id).await {
                    error!(
                        booking_id = %booking_id,
                        error = %e,
                        "Failed to delete orphaned booking"
                    );
                }
            }
        }
    }
}

/// Looks the requested discount up in the list that belongs to the
/// requester's role. The operator and self-service lists never substitute
/// for each other.
fn resolve_discount(
    exhibition: &Exhibition,
    request: &AllocationRequest,
) -> Result<Option<Discount>, AllocationError> {
    let Some(id) = request.discount_id() else {
        return Ok(None);
    };
    let role = request.requester.role;

    let discount = exhibition
        .discounts_for(role)
        .iter()
        .find(|d| d.id == id)
        .ok_or_else(|| {
            AllocationError::Validation(format!("Discount '{id}' is not available to {role}s"))
        })?;

    if !discount.is_active {
        return Err(AllocationError::Validation(format!(
            "Discount '{id}' is not active"
        )));
    }
    Ok(Some(discount.clone()))
}
