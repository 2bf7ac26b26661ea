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

//! # Stock Reservation
//!
//! This library tracks on-hand stock per product, grants time-bound holds
//! ("reservations") against it for in-flight orders, derives a stock status
//! from configurable thresholds, and answers availability queries before
//! checkout.
//!
//! ## Core Components
//!
//! - [`StockEngine`]: Facade wiring every component together
//! - [`StockLedger`]: Authoritative on-hand quantity and status per product
//! - [`ReservationManager`]: Reserve, commit, release and expire holds
//! - [`AvailabilityCalculator`]: On-hand minus live reservations
//! - [`BatchTracker`]: Batch, expiry and quality metadata
//! - [`status_for`]: Threshold status derivation
//!
//! ## Example
//!
//! ```
//! use stock_reservation_rs::{NewStock, OrderId, ProductId, StockEngine, StockStatus};
//!
//! let engine = StockEngine::new();
//! engine.create(NewStock::new(ProductId(1), 10, 3, 50)).unwrap();
//!
//! // Hold 4 units for an order
//! let hold = engine.reserve(ProductId(1), 4, OrderId(100)).unwrap();
//! assert_eq!(engine.available(ProductId(1)).unwrap(), 6);
//!
//! // Payment confirmed
//! engine.commit(hold.id).unwrap();
//! let record = engine.get(ProductId(1)).unwrap();
//! assert_eq!(record.quantity_on_hand, 6);
//! assert_eq!(record.status, StockStatus::InStock);
//! ```
//!
//! ## Thread Safety
//!
//! All mutations of one product are serialized; different products are
//! processed in parallel.

pub mod alert;
mod availability;
mod base;
pub mod batch;
pub mod clock;
mod config;
mod engine;
pub mod error;
pub mod journal;
mod ledger;
mod operation;
mod reservation;
mod status;
pub mod stock;
mod sweeper;

pub use alert::{AlertDispatcher, ChannelAlertDispatcher, LoggingAlertDispatcher, ThresholdCrossed};
pub use availability::{Availability, AvailabilityCalculator, StockSummary};
pub use base::{OrderId, ProductId, ReservationId};
pub use batch::{BatchInfo, BatchTracker, QualityCheck};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use engine::StockEngine;
pub use error::StockError;
pub use journal::{StockJournal, StockMovement};
pub use ledger::{RestockSuggestion, StockLedger};
pub use operation::StockOperation;
pub use reservation::{Reservation, ReservationManager, ReservationState, SweepOutcome};
pub use status::{StockStatus, status_for};
pub use stock::{NewStock, StockRecord};
pub use sweeper::Sweeper;
