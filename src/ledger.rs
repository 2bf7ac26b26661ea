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

//! Authoritative on-hand quantity store.
//!
//! The [`StockLedger`] owns one [`Stock`] per product and is the only
//! component that mutates quantity or status. It knows nothing about
//! individual reservations; callers that hold stock aside pass the reserved
//! total in as a floor.
//!
//! # Thread Safety
//!
//! Records live in a [`DashMap`], each behind its own mutex, so adjustments
//! to different products proceed in parallel. Threshold events are
//! dispatched with no engine lock held: [`StockLedger::adjust_quantity`]
//! releases the record first, and the reservation manager also drops the
//! product's reservation book before dispatching. A dispatcher may
//! therefore call back into the engine for the same product.

use crate::StockError;
use crate::alert::{AlertDispatcher, ThresholdCrossed};
use crate::base::ProductId;
use crate::clock::Clock;
use crate::journal::{INITIAL_STOCK, StockJournal};
use crate::stock::{NewStock, Stock, StockRecord};
use chrono::NaiveDate;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// A product at or below its minimum threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestockSuggestion {
    pub product_id: ProductId,
    pub quantity_on_hand: i64,
    pub threshold_min: i64,
    pub threshold_max: i64,
    /// Quantity that brings the product back up to `threshold_max`.
    pub suggested_quantity: i64,
    pub supplier_ref: Option<String>,
    pub next_restock_date: Option<NaiveDate>,
}

pub struct StockLedger {
    stocks: DashMap<ProductId, Stock>,
    journal: StockJournal,
    dispatcher: Arc<dyn AlertDispatcher>,
    clock: Arc<dyn Clock>,
}

impl StockLedger {
    pub fn new(clock: Arc<dyn Clock>, dispatcher: Arc<dyn AlertDispatcher>) -> Self {
        Self {
            stocks: DashMap::new(),
            journal: StockJournal::new(),
            dispatcher,
            clock,
        }
    }

    /// Opens a stock record for a product.
    ///
    /// # Errors
    ///
    /// - [`StockError::Validation`] - Negative quantity or `threshold_min > threshold_max`.
    /// - [`StockError::DuplicateProduct`] - A record already exists.
    pub fn create(&self, new: NewStock) -> Result<StockRecord, StockError> {
        let product_id = new.product_id;
        let initial_quantity = new.initial_quantity;
        let stock = Stock::open(new)?;

        let record = match self.stocks.entry(product_id) {
            Entry::Occupied(_) => return Err(StockError::DuplicateProduct),
            Entry::Vacant(entry) => entry.insert(stock).snapshot(),
        };

        if initial_quantity > 0 {
            self.journal.record(
                product_id,
                initial_quantity,
                INITIAL_STOCK,
                initial_quantity,
                self.clock.now(),
            );
        }
        info!(
            product_id = %product_id,
            quantity_on_hand = record.quantity_on_hand,
            status = %record.status,
            "stock record created"
        );
        Ok(record)
    }

    /// Applies `delta` to the on-hand quantity.
    ///
    /// # Errors
    ///
    /// - [`StockError::ProductNotFound`] - No record for `product_id`.
    /// - [`StockError::InsufficientStock`] - The result would be negative.
    /// - [`StockError::Validation`] - `delta` is zero.
    pub fn adjust_quantity(
        &self,
        product_id: ProductId,
        delta: i64,
        reason: &str,
    ) -> Result<StockRecord, StockError> {
        let (record, event) = self.adjust_above(product_id, delta, reason, 0)?;
        if let Some(event) = event {
            self.dispatch(event);
        }
        Ok(record)
    }

    /// Like [`adjust_quantity`](Self::adjust_quantity), but the result must
    /// stay at or above `floor`, and any threshold event is returned to the
    /// caller instead of dispatched. Callers holding other locks dispatch it
    /// once those are released.
    pub(crate) fn adjust_above(
        &self,
        product_id: ProductId,
        delta: i64,
        reason: &str,
        floor: i64,
    ) -> Result<(StockRecord, Option<ThresholdCrossed>), StockError> {
        let now = self.clock.now();
        let (record, event) = {
            let stock = self
                .stocks
                .get(&product_id)
                .ok_or(StockError::ProductNotFound)?;
            stock.adjust(delta, floor, now, |record| {
                self.journal
                    .record(product_id, delta, reason, record.quantity_on_hand, now);
            })?
        };

        debug!(
            product_id = %product_id,
            delta,
            reason,
            quantity_on_hand = record.quantity_on_hand,
            "stock adjusted"
        );
        Ok((record, event))
    }

    pub(crate) fn dispatch(&self, event: ThresholdCrossed) {
        self.dispatcher.dispatch(event);
    }

    /// Sets the terminal `DISCONTINUED` status. Repeated calls are no-ops.
    pub fn mark_discontinued(&self, product_id: ProductId) -> Result<StockRecord, StockError> {
        let record = self
            .stocks
            .get(&product_id)
            .ok_or(StockError::ProductNotFound)?
            .discontinue();
        info!(product_id = %product_id, "product discontinued");
        Ok(record)
    }

    pub fn get(&self, product_id: ProductId) -> Result<StockRecord, StockError> {
        self.stocks
            .get(&product_id)
            .map(|stock| stock.snapshot())
            .ok_or(StockError::ProductNotFound)
    }

    pub fn contains(&self, product_id: ProductId) -> bool {
        self.stocks.contains_key(&product_id)
    }

    /// Ids of every product, ascending.
    pub fn product_ids(&self) -> Vec<ProductId> {
        let mut ids: Vec<ProductId> = self.stocks.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        ids
    }

    /// Snapshots of every record, ordered by product.
    pub fn records(&self) -> Vec<StockRecord> {
        let mut records: Vec<StockRecord> =
            self.stocks.iter().map(|entry| entry.snapshot()).collect();
        records.sort_unstable_by_key(|record| record.product_id);
        records
    }

    pub fn schedule_restock(
        &self,
        product_id: ProductId,
        date: NaiveDate,
    ) -> Result<StockRecord, StockError> {
        self.with_metadata(product_id, |record| {
            record.next_restock_date = Some(date);
            record.clone()
        })
    }

    /// Products at or below their minimum threshold, excluding discontinued ones.
    pub fn restock_plan(&self) -> Vec<RestockSuggestion> {
        self.records()
            .into_iter()
            .filter(|r| !r.status.is_discontinued() && r.quantity_on_hand <= r.threshold_min)
            .map(|r| RestockSuggestion {
                product_id: r.product_id,
                quantity_on_hand: r.quantity_on_hand,
                threshold_min: r.threshold_min,
                threshold_max: r.threshold_max,
                suggested_quantity: (r.threshold_max - r.quantity_on_hand).max(0),
                supplier_ref: r.supplier_ref,
                next_restock_date: r.next_restock_date,
            })
            .collect()
    }

    pub fn journal(&self) -> &StockJournal {
        &self.journal
    }

    pub(crate) fn with_metadata<R>(
        &self,
        product_id: ProductId,
        f: impl FnOnce(&mut StockRecord) -> R,
    ) -> Result<R, StockError> {
        let stock = self
            .stocks
            .get(&product_id)
            .ok_or(StockError::ProductNotFound)?;
        Ok(stock.with_metadata(f))
    }
}
