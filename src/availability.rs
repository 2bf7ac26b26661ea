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

//! Available-to-sell queries.
//!
//! `available = quantity_on_hand - live reserved`. Queries are read-only:
//! they neither sweep nor touch the ledger, yet always exclude holds whose
//! TTL has elapsed.

use crate::StockError;
use crate::base::ProductId;
use crate::ledger::StockLedger;
use crate::reservation::ReservationManager;
use crate::status::StockStatus;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Answer to "can `quantity` units be sold right now?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Availability {
    pub available: bool,
    /// Units currently available to sell.
    pub quantity: i64,
    pub status: StockStatus,
}

/// One reporting row per product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StockSummary {
    #[serde(rename = "product")]
    pub product_id: ProductId,
    pub on_hand: i64,
    pub reserved: i64,
    pub available: i64,
    pub status: StockStatus,
}

pub struct AvailabilityCalculator {
    ledger: Arc<StockLedger>,
    reservations: Arc<ReservationManager>,
}

impl AvailabilityCalculator {
    pub fn new(ledger: Arc<StockLedger>, reservations: Arc<ReservationManager>) -> Self {
        Self {
            ledger,
            reservations,
        }
    }

    pub fn available(&self, product_id: ProductId) -> Result<i64, StockError> {
        Ok(self.summary(product_id)?.available)
    }

    /// # Errors
    ///
    /// - [`StockError::Validation`] - `quantity` is not positive.
    /// - [`StockError::ProductNotFound`] - No stock record.
    pub fn check_availability(
        &self,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<Availability, StockError> {
        if quantity <= 0 {
            return Err(StockError::validation("requested quantity must be positive"));
        }
        let summary = self.summary(product_id)?;
        let availability = Availability {
            available: !summary.status.is_discontinued() && quantity <= summary.available,
            quantity: summary.available,
            status: summary.status,
        };
        debug!(
            product_id = %product_id,
            requested = quantity,
            available = availability.quantity,
            "availability checked"
        );
        Ok(availability)
    }

    pub fn summary(&self, product_id: ProductId) -> Result<StockSummary, StockError> {
        let (record, reserved) = self.reservations.snapshot(product_id)?;
        debug_assert!(reserved >= 0);
        Ok(StockSummary {
            product_id,
            on_hand: record.quantity_on_hand,
            reserved,
            // Only negative if the ledger was adjusted around the reservation manager.
            available: (record.quantity_on_hand - reserved).max(0),
            status: record.status,
        })
    }

    /// Summaries for every product, ordered by id.
    pub fn summaries(&self) -> Vec<StockSummary> {
        self.ledger
            .product_ids()
            .into_iter()
            .filter_map(|product_id| self.summary(product_id).ok())
            .collect()
    }
}
