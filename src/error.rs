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

//! Error types for stock and reservation operations.

use crate::reservation::ReservationState;
use thiserror::Error;

/// Stock engine errors.
///
/// Every variant is returned synchronously to the caller, which owns
/// user-facing messaging and compensating releases for sibling reservations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StockError {
    /// Bad thresholds, non-positive quantity, zero delta or non-positive TTL
    #[error("validation failed: {0}")]
    Validation(String),

    /// Operation would drive on-hand below zero or below the reserved quantity
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i64, available: i64 },

    /// Referenced product has no stock record
    #[error("product not found")]
    ProductNotFound,

    /// Referenced reservation does not exist
    #[error("reservation not found")]
    ReservationNotFound,

    /// A stock record already exists for this product
    #[error("duplicate product")]
    DuplicateProduct,

    /// The order already holds a live reservation for this product
    #[error("order already holds a reservation for this product")]
    AlreadyReserved,

    /// Commit or release on a reservation that is no longer active
    #[error("invalid reservation transition from {from}")]
    InvalidStateTransition { from: ReservationState },

    /// Reservation TTL has elapsed
    #[error("reservation expired")]
    Expired,

    /// Product is discontinued and accepts no new reservations
    #[error("product is discontinued")]
    Discontinued,
}

impl StockError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        StockError::Validation(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::StockError;
    use crate::reservation::ReservationState;

    #[test]
    fn error_display_messages() {
        assert_eq!(
            StockError::validation("threshold_min exceeds threshold_max").to_string(),
            "validation failed: threshold_min exceeds threshold_max"
        );
        assert_eq!(
            StockError::InsufficientStock {
                requested: 7,
                available: 6
            }
            .to_string(),
            "insufficient stock: requested 7, available 6"
        );
        assert_eq!(StockError::ProductNotFound.to_string(), "product not found");
        assert_eq!(StockError::ReservationNotFound.to_string(), "reservation not found");
        assert_eq!(StockError::DuplicateProduct.to_string(), "duplicate product");
        assert_eq!(
            StockError::AlreadyReserved.to_string(),
            "order already holds a reservation for this product"
        );
        assert_eq!(
            StockError::InvalidStateTransition {
                from: ReservationState::Committed
            }
            .to_string(),
            "invalid reservation transition from COMMITTED"
        );
        assert_eq!(StockError::Expired.to_string(), "reservation expired");
        assert_eq!(StockError::Discontinued.to_string(), "product is discontinued");
    }

    #[test]
    fn errors_are_cloneable() {
        let error = StockError::InsufficientStock {
            requested: 1,
            available: 0,
        };
        let cloned = error.clone();
        assert_eq!(error, cloned);
    }
}
