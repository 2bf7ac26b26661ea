// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Stock reservation engine.
//!
//! The [`StockEngine`] wires the ledger, reservation manager, availability
//! calculator and batch tracker together and exposes the full query surface.
//!
//! # Order Flow
//!
//! - **Order placed**: `reserve` once per line item.
//! - **Payment confirmed**: `commit` each hold; the ledger is reduced.
//! - **Cancelled / payment failed**: `release` each hold, or `release_order`.
//! - **Abandoned**: the TTL elapses and the capacity returns on its own.
//!
//! There is no cross-product transaction. If one line fails to reserve, the
//! caller releases the lines it already holds.
//!
//! # Thread Safety
//!
//! All methods take `&self`. Mutations of one product are serialized by its
//! reservation book lock; different products proceed in parallel.

use crate::StockError;
use crate::alert::{AlertDispatcher, LoggingAlertDispatcher};
use crate::availability::{Availability, AvailabilityCalculator, StockSummary};
use crate::base::{OrderId, ProductId, ReservationId};
use crate::batch::{BatchInfo, BatchTracker, QualityCheck};
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::journal::StockMovement;
use crate::ledger::{RestockSuggestion, StockLedger};
use crate::operation::StockOperation;
use crate::reservation::{Reservation, ReservationManager, SweepOutcome};
use crate::stock::{NewStock, StockRecord};
use crate::sweeper::Sweeper;
use chrono::{Duration, NaiveDate};
use std::io;
use std::sync::Arc;

pub struct StockEngine {
    config: EngineConfig,
    ledger: Arc<StockLedger>,
    reservations: Arc<ReservationManager>,
    availability: AvailabilityCalculator,
    batches: BatchTracker,
}

impl StockEngine {
    /// Creates an engine with default configuration, the system clock, and
    /// threshold events written to the log.
    pub fn new() -> Self {
        Self::assemble(
            EngineConfig::default(),
            Arc::new(SystemClock),
            Arc::new(LoggingAlertDispatcher),
        )
    }

    /// Creates an engine from explicit parts.
    ///
    /// # Errors
    ///
    /// [`StockError::Validation`] if `config` is invalid.
    pub fn with_parts(
        config: EngineConfig,
        clock: Arc<dyn Clock>,
        dispatcher: Arc<dyn AlertDispatcher>,
    ) -> Result<Self, StockError> {
        config.validate()?;
        Ok(Self::assemble(config, clock, dispatcher))
    }

    fn assemble(
        config: EngineConfig,
        clock: Arc<dyn Clock>,
        dispatcher: Arc<dyn AlertDispatcher>,
    ) -> Self {
        let ledger = Arc::new(StockLedger::new(Arc::clone(&clock), dispatcher));
        let reservations = Arc::new(
            ReservationManager::new(
                Arc::clone(&ledger),
                Arc::clone(&clock),
                config.reservation_ttl(),
            )
            .with_retention(config.reservation_retention()),
        );
        StockEngine {
            config,
            availability: AvailabilityCalculator::new(
                Arc::clone(&ledger),
                Arc::clone(&reservations),
            ),
            batches: BatchTracker::new(Arc::clone(&ledger), clock),
            ledger,
            reservations,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Applies one operation.
    ///
    /// | Operation | Behavior |
    /// |------|----------|
    /// | Create | Opens a stock record |
    /// | Adjust | Changes on-hand, never below the reserved total |
    /// | Reserve | Holds stock for an order with the default TTL |
    /// | Commit | Deducts the order's hold from on-hand |
    /// | Release | Returns the order's hold |
    /// | Discontinue | Marks the product discontinued |
    /// | Sweep | Expires elapsed holds |
    pub fn process(&self, operation: StockOperation) -> Result<(), StockError> {
        match operation {
            StockOperation::Create {
                product_id,
                quantity,
                threshold_min,
                threshold_max,
            } => {
                self.create(NewStock::new(
                    product_id,
                    quantity,
                    threshold_min,
                    threshold_max,
                ))?;
            }
            StockOperation::Adjust {
                product_id,
                delta,
                reason,
            } => {
                self.adjust_quantity(product_id, delta, &reason)?;
            }
            StockOperation::Reserve {
                product_id,
                order_id,
                quantity,
            } => {
                self.reserve(product_id, quantity, order_id)?;
            }
            StockOperation::Commit {
                product_id,
                order_id,
            } => {
                let reservation = self.held_by(product_id, order_id)?;
                self.commit(reservation)?;
            }
            StockOperation::Release {
                product_id,
                order_id,
            } => {
                let reservation = self.held_by(product_id, order_id)?;
                self.release(reservation)?;
            }
            StockOperation::Discontinue { product_id } => {
                self.mark_discontinued(product_id)?;
            }
            StockOperation::Sweep { product_id } => {
                self.sweep(product_id);
            }
        }
        Ok(())
    }

    fn held_by(&self, product_id: ProductId, order_id: OrderId) -> Result<ReservationId, StockError> {
        self.reservations
            .find(product_id, order_id)
            .map(|reservation| reservation.id)
            .ok_or(StockError::ReservationNotFound)
    }

    // === Ledger ===

    pub fn create(&self, new: NewStock) -> Result<StockRecord, StockError> {
        self.ledger.create(new)
    }

    /// Applies `delta` to on-hand, serialized with this product's reservations.
    ///
    /// # Errors
    ///
    /// - [`StockError::InsufficientStock`] - Result would be negative or below the reserved total.
    /// - [`StockError::ProductNotFound`] - Unknown product.
    pub fn adjust_quantity(
        &self,
        product_id: ProductId,
        delta: i64,
        reason: &str,
    ) -> Result<StockRecord, StockError> {
        self.reservations.adjust_quantity(product_id, delta, reason)
    }

    pub fn mark_discontinued(&self, product_id: ProductId) -> Result<StockRecord, StockError> {
        self.reservations.mark_discontinued(product_id)
    }

    pub fn get(&self, product_id: ProductId) -> Result<StockRecord, StockError> {
        self.ledger.get(product_id)
    }

    pub fn records(&self) -> Vec<StockRecord> {
        self.ledger.records()
    }

    pub fn schedule_restock(
        &self,
        product_id: ProductId,
        date: NaiveDate,
    ) -> Result<StockRecord, StockError> {
        self.ledger.schedule_restock(product_id, date)
    }

    pub fn restock_plan(&self) -> Vec<RestockSuggestion> {
        self.ledger.restock_plan()
    }

    /// Removes and returns journaled quantity changes, oldest first.
    pub fn drain_journal(&self) -> Vec<StockMovement> {
        self.ledger.journal().drain()
    }

    // === Reservations ===

    pub fn reserve(
        &self,
        product_id: ProductId,
        quantity: i64,
        order_id: OrderId,
    ) -> Result<Reservation, StockError> {
        self.reservations.reserve(product_id, quantity, order_id)
    }

    pub fn reserve_with_ttl(
        &self,
        product_id: ProductId,
        quantity: i64,
        order_id: OrderId,
        ttl: Duration,
    ) -> Result<Reservation, StockError> {
        self.reservations
            .reserve_with_ttl(product_id, quantity, order_id, ttl)
    }

    pub fn commit(&self, reservation_id: ReservationId) -> Result<Reservation, StockError> {
        self.reservations.commit(reservation_id)
    }

    pub fn release(&self, reservation_id: ReservationId) -> Result<Reservation, StockError> {
        self.reservations.release(reservation_id)
    }

    pub fn release_order(&self, order_id: OrderId) -> Vec<ReservationId> {
        self.reservations.release_order(order_id)
    }

    pub fn sweep(&self, product_id: Option<ProductId>) -> SweepOutcome {
        self.reservations.sweep(product_id)
    }

    /// Looks up a reservation. Settled ones are kept for the configured
    /// retention window, then report [`StockError::ReservationNotFound`].
    pub fn reservation(&self, reservation_id: ReservationId) -> Result<Reservation, StockError> {
        self.reservations.get(reservation_id)
    }

    pub fn reservation_for(&self, product_id: ProductId, order_id: OrderId) -> Option<Reservation> {
        self.reservations.find(product_id, order_id)
    }

    /// Outstanding ACTIVE holds on a product.
    pub fn reservations_for(&self, product_id: ProductId) -> Vec<Reservation> {
        self.reservations.reservations_for(product_id)
    }

    pub fn active_reserved_sum(&self, product_id: ProductId) -> i64 {
        self.reservations.active_reserved_sum(product_id)
    }

    /// Starts a background thread sweeping at the configured interval.
    pub fn spawn_sweeper(&self) -> io::Result<Sweeper> {
        Sweeper::spawn(Arc::clone(&self.reservations), self.config.sweep_interval())
    }

    // === Availability ===

    pub fn available(&self, product_id: ProductId) -> Result<i64, StockError> {
        self.availability.available(product_id)
    }

    pub fn check_availability(
        &self,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<Availability, StockError> {
        self.availability.check_availability(product_id, quantity)
    }

    pub fn summary(&self, product_id: ProductId) -> Result<StockSummary, StockError> {
        self.availability.summary(product_id)
    }

    pub fn summaries(&self) -> Vec<StockSummary> {
        self.availability.summaries()
    }

    // === Batches ===

    pub fn attach_batch(
        &self,
        product_id: ProductId,
        batch: BatchInfo,
    ) -> Result<StockRecord, StockError> {
        self.batches.attach_batch(product_id, batch)
    }

    pub fn record_quality_check(
        &self,
        product_id: ProductId,
        check: QualityCheck,
    ) -> Result<StockRecord, StockError> {
        self.batches.record_quality_check(product_id, check)
    }

    pub fn expired_batches(&self) -> Vec<StockRecord> {
        self.batches.expired_batches()
    }

    pub fn expired_batches_as_of(&self, as_of: NaiveDate) -> Vec<StockRecord> {
        self.batches.expired_batches_as_of(as_of)
    }
}

impl Default for StockEngine {
    fn default() -> Self {
        Self::new()
    }
}
