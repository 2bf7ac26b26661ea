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

//! Threshold-crossed notifications.
//!
//! The ledger hands a [`ThresholdCrossed`] event to its [`AlertDispatcher`]
//! whenever a quantity change moves a product into `LOW_STOCK`,
//! `OUT_OF_STOCK`, or back to `IN_STOCK`. Delivery to the notification
//! service happens outside the engine; dispatchers must not block.

use crate::base::ProductId;
use crate::status::StockStatus;
use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::warn;

/// Status change emitted by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThresholdCrossed {
    pub product_id: ProductId,
    pub old_status: StockStatus,
    pub new_status: StockStatus,
    pub quantity_on_hand: i64,
}

impl ThresholdCrossed {
    /// Returns the event for a status change, if that change is reportable.
    pub(crate) fn between(
        product_id: ProductId,
        old_status: StockStatus,
        new_status: StockStatus,
        quantity_on_hand: i64,
    ) -> Option<Self> {
        let reportable = matches!(
            new_status,
            StockStatus::InStock | StockStatus::LowStock | StockStatus::OutOfStock
        );
        (old_status != new_status && reportable).then_some(Self {
            product_id,
            old_status,
            new_status,
            quantity_on_hand,
        })
    }
}

/// Receiver of threshold events.
pub trait AlertDispatcher: Send + Sync {
    fn dispatch(&self, event: ThresholdCrossed);
}

/// Writes every event to the log at `warn` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingAlertDispatcher;

impl AlertDispatcher for LoggingAlertDispatcher {
    fn dispatch(&self, event: ThresholdCrossed) {
        warn!(
            product_id = %event.product_id,
            old_status = %event.old_status,
            new_status = %event.new_status,
            quantity_on_hand = event.quantity_on_hand,
            "stock threshold crossed"
        );
    }
}

/// Fans events out to any number of channel subscribers.
///
/// Subscribers whose receiver was dropped are pruned on the next dispatch.
#[derive(Debug, Default)]
pub struct ChannelAlertDispatcher {
    subscribers: Mutex<Vec<Sender<ThresholdCrossed>>>,
}

impl ChannelAlertDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<ThresholdCrossed> {
        let (tx, rx) = channel::unbounded();
        self.subscribers.lock().push(tx);
        rx
    }
}

impl AlertDispatcher for ChannelAlertDispatcher {
    fn dispatch(&self, event: ThresholdCrossed) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event).is_ok());
    }
}
