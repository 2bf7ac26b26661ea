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

//! Batch, expiry and quality metadata.
//!
//! Metadata never touches on-hand quantity or status.

use crate::StockError;
use crate::base::ProductId;
use crate::clock::Clock;
use crate::ledger::StockLedger;
use crate::stock::StockRecord;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Production batch of the stock currently on hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchInfo {
    pub number: String,
    pub production_date: NaiveDate,
    pub expiry_date: NaiveDate,
}

/// Outcome of one quality inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityCheck {
    pub checked_at: DateTime<Utc>,
    pub inspector: String,
    pub passed: bool,
    pub notes: Option<String>,
}

pub struct BatchTracker {
    ledger: Arc<StockLedger>,
    clock: Arc<dyn Clock>,
}

impl BatchTracker {
    pub fn new(ledger: Arc<StockLedger>, clock: Arc<dyn Clock>) -> Self {
        Self { ledger, clock }
    }

    /// Replaces the product's batch information.
    pub fn attach_batch(
        &self,
        product_id: ProductId,
        batch: BatchInfo,
    ) -> Result<StockRecord, StockError> {
        if batch.number.trim().is_empty() {
            return Err(StockError::validation("batch number must not be empty"));
        }
        if batch.expiry_date < batch.production_date {
            return Err(StockError::validation(
                "batch expiry date precedes production date",
            ));
        }
        self.ledger.with_metadata(product_id, |record| {
            record.batch_info = Some(batch);
            record.clone()
        })
    }

    /// Appends a quality check. Earlier checks are never modified.
    pub fn record_quality_check(
        &self,
        product_id: ProductId,
        check: QualityCheck,
    ) -> Result<StockRecord, StockError> {
        self.ledger.with_metadata(product_id, |record| {
            record.quality_checks.push(check);
            record.clone()
        })
    }

    /// Records whose batch expires on or before today.
    pub fn expired_batches(&self) -> Vec<StockRecord> {
        self.expired_batches_as_of(self.clock.now().date_naive())
    }

    /// Records whose batch expires on or before `as_of`, ordered by product.
    pub fn expired_batches_as_of(&self, as_of: NaiveDate) -> Vec<StockRecord> {
        self.ledger
            .records()
            .into_iter()
            .filter(|record| {
                record
                    .batch_info
                    .as_ref()
                    .is_some_and(|batch| batch.expiry_date <= as_of)
            })
            .collect()
    }
}
