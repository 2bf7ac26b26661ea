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

//! Append-only journal of on-hand quantity changes.
//!
//! Every successful ledger adjustment is recorded with its reason so that
//! reporting can reconstruct why a quantity moved. Entries are drained in
//! insertion order.

use crate::base::ProductId;
use chrono::{DateTime, Utc};
use crossbeam::queue::SegQueue;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Reason recorded when a reservation commit consumes stock.
pub const RESERVATION_COMMIT: &str = "RESERVATION_COMMIT";

/// Reason recorded for the initial quantity of a new record.
pub const INITIAL_STOCK: &str = "INITIAL_STOCK";

/// One quantity change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockMovement {
    pub sequence: u64,
    pub product_id: ProductId,
    pub delta: i64,
    pub reason: String,
    pub quantity_after: i64,
    pub at: DateTime<Utc>,
}

/// A thread-safe movement journal.
///
/// Sequence numbers are unique. Entries of one product are appended under
/// that product's lock, so their sequences follow the order of its changes.
#[derive(Debug, Default)]
pub struct StockJournal {
    next_sequence: AtomicU64,
    movements: SegQueue<StockMovement>,
}

impl StockJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a movement and returns its sequence number.
    pub fn record(
        &self,
        product_id: ProductId,
        delta: i64,
        reason: &str,
        quantity_after: i64,
        at: DateTime<Utc>,
    ) -> u64 {
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed) + 1;
        self.movements.push(StockMovement {
            sequence,
            product_id,
            delta,
            reason: reason.to_owned(),
            quantity_after,
            at,
        });
        sequence
    }

    pub fn len(&self) -> usize {
        self.movements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movements.is_empty()
    }

    /// Removes and returns every pending movement, oldest first.
    pub fn drain(&self) -> Vec<StockMovement> {
        let mut drained = Vec::with_capacity(self.movements.len());
        while let Some(movement) = self.movements.pop() {
            drained.push(movement);
        }
        drained
    }
}
