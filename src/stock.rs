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

//! Per-product stock records.
//!
//! # Example
//!
//! ```
//! use stock_reservation_rs::{NewStock, ProductId, StockStatus};
//! use stock_reservation_rs::stock::Stock;
//!
//! let stock = Stock::open(NewStock::new(ProductId(1), 10, 3, 50)).unwrap();
//! assert_eq!(stock.quantity_on_hand(), 10);
//! assert_eq!(stock.status(), StockStatus::InStock);
//! ```

use crate::StockError;
use crate::alert::ThresholdCrossed;
use crate::base::ProductId;
use crate::batch::{BatchInfo, QualityCheck};
use crate::status::{StockStatus, status_for};
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use serde::Serialize;

/// Parameters for a new stock record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStock {
    pub product_id: ProductId,
    pub initial_quantity: i64,
    pub threshold_min: i64,
    pub threshold_max: i64,
    pub unit: String,
    pub location: Option<String>,
    pub supplier_ref: Option<String>,
}

impl NewStock {
    pub fn new(
        product_id: ProductId,
        initial_quantity: i64,
        threshold_min: i64,
        threshold_max: i64,
    ) -> Self {
        Self {
            product_id,
            initial_quantity,
            threshold_min,
            threshold_max,
            unit: "unit".to_owned(),
            location: None,
            supplier_ref: None,
        }
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn supplier_ref(mut self, supplier_ref: impl Into<String>) -> Self {
        self.supplier_ref = Some(supplier_ref.into());
        self
    }

    fn validate(&self) -> Result<(), StockError> {
        if self.initial_quantity < 0 {
            return Err(StockError::validation("initial quantity must not be negative"));
        }
        if self.threshold_min < 0 || self.threshold_max < 0 {
            return Err(StockError::validation("thresholds must not be negative"));
        }
        if self.threshold_min > self.threshold_max {
            return Err(StockError::validation(
                "threshold_min must not exceed threshold_max",
            ));
        }
        Ok(())
    }
}

/// Point-in-time copy of a product's stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockRecord {
    pub product_id: ProductId,
    pub quantity_on_hand: i64,
    pub unit: String,
    pub threshold_min: i64,
    pub threshold_max: i64,
    pub status: StockStatus,
    pub location: Option<String>,
    pub supplier_ref: Option<String>,
    pub batch_info: Option<BatchInfo>,
    pub quality_checks: Vec<QualityCheck>,
    pub last_restock_date: Option<DateTime<Utc>>,
    pub next_restock_date: Option<NaiveDate>,
}

impl StockRecord {
    fn from_new(new: NewStock) -> Self {
        let status = status_for(
            new.initial_quantity,
            new.threshold_min,
            new.threshold_max,
            false,
        );
        Self {
            product_id: new.product_id,
            quantity_on_hand: new.initial_quantity,
            unit: new.unit,
            threshold_min: new.threshold_min,
            threshold_max: new.threshold_max,
            status,
            location: new.location,
            supplier_ref: new.supplier_ref,
            batch_info: None,
            quality_checks: Vec::new(),
            last_restock_date: None,
            next_restock_date: None,
        }
    }

    fn assert_invariants(&self) {
        debug_assert!(
            self.quantity_on_hand >= 0,
            "Invariant violated: quantity on hand went negative: {}",
            self.quantity_on_hand
        );
        debug_assert!(
            self.status.is_discontinued()
                || self.status
                    == status_for(
                        self.quantity_on_hand,
                        self.threshold_min,
                        self.threshold_max,
                        false
                    ),
            "Invariant violated: status {} does not match quantity {}",
            self.status,
            self.quantity_on_hand
        );
    }

    /// Applies `delta` to on-hand, keeping the result at or above `floor`.
    ///
    /// Recomputes status and returns the threshold event, if any.
    fn apply_delta(
        &mut self,
        delta: i64,
        floor: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<ThresholdCrossed>, StockError> {
        if delta == 0 {
            return Err(StockError::validation("adjustment delta must be non-zero"));
        }
        let quantity = self
            .quantity_on_hand
            .checked_add(delta)
            .ok_or_else(|| StockError::validation("quantity overflow"))?;
        if quantity < floor.max(0) {
            return Err(StockError::InsufficientStock {
                requested: delta.saturating_neg(),
                available: (self.quantity_on_hand - floor.max(0)).max(0),
            });
        }

        let old_status = self.status;
        self.quantity_on_hand = quantity;
        if delta > 0 {
            self.last_restock_date = Some(now);
        }
        self.status = status_for(
            quantity,
            self.threshold_min,
            self.threshold_max,
            old_status.is_discontinued(),
        );
        self.assert_invariants();

        Ok(ThresholdCrossed::between(
            self.product_id,
            old_status,
            self.status,
            quantity,
        ))
    }

    fn discontinue(&mut self) {
        self.status = StockStatus::Discontinued;
    }
}

/// A product's stock, guarded for concurrent access.
#[derive(Debug)]
pub struct Stock {
    inner: Mutex<StockRecord>,
}

impl Stock {
    /// Validates `new` and opens a record for it.
    pub fn open(new: NewStock) -> Result<Self, StockError> {
        new.validate()?;
        let record = StockRecord::from_new(new);
        record.assert_invariants();
        Ok(Self {
            inner: Mutex::new(record),
        })
    }

    pub fn product_id(&self) -> ProductId {
        self.inner.lock().product_id
    }

    pub fn quantity_on_hand(&self) -> i64 {
        self.inner.lock().quantity_on_hand
    }

    pub fn status(&self) -> StockStatus {
        self.inner.lock().status
    }

    pub fn snapshot(&self) -> StockRecord {
        self.inner.lock().clone()
    }

    /// Applies a quantity change and hands the updated record to `journal`
    /// before the lock is released.
    pub(crate) fn adjust<F>(
        &self,
        delta: i64,
        floor: i64,
        now: DateTime<Utc>,
        journal: F,
    ) -> Result<(StockRecord, Option<ThresholdCrossed>), StockError>
    where
        F: FnOnce(&StockRecord),
    {
        let mut record = self.inner.lock();
        let event = record.apply_delta(delta, floor, now)?;
        journal(&record);
        Ok((record.clone(), event))
    }

    /// Sets the terminal `DISCONTINUED` status.
    pub(crate) fn discontinue(&self) -> StockRecord {
        let mut record = self.inner.lock();
        record.discontinue();
        record.clone()
    }

    /// Runs `f` against the record's metadata fields.
    pub(crate) fn with_metadata<R>(&self, f: impl FnOnce(&mut StockRecord) -> R) -> R {
        let mut record = self.inner.lock();
        let quantity = record.quantity_on_hand;
        let status = record.status;
        let result = f(&mut record);
        debug_assert_eq!(record.quantity_on_hand, quantity);
        debug_assert_eq!(record.status, status);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(quantity: i64, min: i64, max: i64) -> StockRecord {
        StockRecord::from_new(NewStock::new(ProductId(1), quantity, min, max))
    }

    #[test]
    fn open_rejects_min_above_max() {
        let result = Stock::open(NewStock::new(ProductId(1), 10, 60, 50));
        assert!(matches!(result, Err(StockError::Validation(_))));
    }

    #[test]
    fn open_rejects_negative_initial_quantity() {
        let result = Stock::open(NewStock::new(ProductId(1), -1, 3, 50));
        assert!(matches!(result, Err(StockError::Validation(_))));
    }

    #[test]
    fn open_derives_initial_status() {
        let stock = Stock::open(NewStock::new(ProductId(1), 0, 3, 50)).unwrap();
        assert_eq!(stock.status(), StockStatus::OutOfStock);
        let stock = Stock::open(NewStock::new(ProductId(2), 2, 3, 50)).unwrap();
        assert_eq!(stock.status(), StockStatus::LowStock);
    }

    #[test]
    fn builder_sets_metadata() {
        let stock = Stock::open(
            NewStock::new(ProductId(9), 5, 1, 10)
                .unit("kg")
                .location("A-01")
                .supplier_ref("SUP-42"),
        )
        .unwrap();
        let snapshot = stock.snapshot();
        assert_eq!(snapshot.unit, "kg");
        assert_eq!(snapshot.location.as_deref(), Some("A-01"));
        assert_eq!(snapshot.supplier_ref.as_deref(), Some("SUP-42"));
    }

    #[test]
    fn apply_delta_rejects_negative_result() {
        let mut data = record(5, 1, 10);
        let result = data.apply_delta(-6, 0, Utc::now());
        assert_eq!(
            result,
            Err(StockError::InsufficientStock {
                requested: 6,
                available: 5
            })
        );
        assert_eq!(data.quantity_on_hand, 5);
    }

    #[test]
    fn apply_delta_respects_floor() {
        let mut data = record(10, 1, 10);
        let result = data.apply_delta(-8, 4, Utc::now());
        assert_eq!(
            result,
            Err(StockError::InsufficientStock {
                requested: 8,
                available: 6
            })
        );
        assert!(data.apply_delta(-6, 4, Utc::now()).is_ok());
        assert_eq!(data.quantity_on_hand, 4);
    }

    #[test]
    fn apply_delta_rejects_zero() {
        let mut data = record(5, 1, 10);
        assert!(matches!(
            data.apply_delta(0, 0, Utc::now()),
            Err(StockError::Validation(_))
        ));
    }

    #[test]
    fn apply_delta_emits_on_crossing_into_low_stock() {
        let mut data = record(10, 7, 50);
        let event = data.apply_delta(-4, 0, Utc::now()).unwrap().unwrap();
        assert_eq!(event.old_status, StockStatus::InStock);
        assert_eq!(event.new_status, StockStatus::LowStock);
        assert_eq!(event.quantity_on_hand, 6);
    }

    #[test]
    fn apply_delta_is_silent_within_band() {
        let mut data = record(40, 3, 50);
        assert_eq!(data.apply_delta(-10, 0, Utc::now()).unwrap(), None);
    }

    #[test]
    fn restock_stamps_last_restock_date() {
        let mut data = record(1, 3, 50);
        let now = Utc::now();
        let event = data.apply_delta(20, 0, now).unwrap().unwrap();
        assert_eq!(event.new_status, StockStatus::InStock);
        assert_eq!(data.last_restock_date, Some(now));
    }

    #[test]
    fn discontinued_survives_adjustments() {
        let mut data = record(10, 3, 50);
        data.discontinue();
        assert_eq!(data.apply_delta(-10, 0, Utc::now()).unwrap(), None);
        assert_eq!(data.status, StockStatus::Discontinued);
        assert_eq!(data.apply_delta(5, 0, Utc::now()).unwrap(), None);
        assert_eq!(data.status, StockStatus::Discontinued);
    }

    #[test]
    fn adjust_journals_under_lock() {
        let stock = Stock::open(NewStock::new(ProductId(3), 10, 3, 50)).unwrap();
        let mut seen = None;
        let (record, _) = stock
            .adjust(-2, 0, Utc::now(), |r| seen = Some(r.quantity_on_hand))
            .unwrap();
        assert_eq!(seen, Some(8));
        assert_eq!(record.quantity_on_hand, 8);
    }

    #[test]
    fn record_serializes_status_name() {
        let stock = Stock::open(NewStock::new(ProductId(4), 0, 3, 50)).unwrap();
        let json = serde_json::to_value(stock.snapshot()).unwrap();
        assert_eq!(json["product_id"], 4);
        assert_eq!(json["status"], "OUT_OF_STOCK");
        assert_eq!(json["quality_checks"], serde_json::json!([]));
    }
}
