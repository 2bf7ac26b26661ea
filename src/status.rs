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

//! Stock status derivation.
//!
//! Status is never stored independently of quantity: the ledger calls
//! [`status_for`] after every mutation and persists the result.
//!
//! ```text
//!  quantity == 0 ──► OUT_OF_STOCK
//!  quantity <= min ─► LOW_STOCK
//!  otherwise ──────► IN_STOCK
//!
//!  DISCONTINUED is terminal and overrides all of the above.
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Derived stock status of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
    Discontinued,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InStock => "IN_STOCK",
            Self::LowStock => "LOW_STOCK",
            Self::OutOfStock => "OUT_OF_STOCK",
            Self::Discontinued => "DISCONTINUED",
        }
    }

    pub fn is_discontinued(&self) -> bool {
        matches!(self, Self::Discontinued)
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a quantity and its thresholds to a status.
///
/// `threshold_max` only feeds restock planning and never affects the result.
pub fn status_for(
    quantity: i64,
    threshold_min: i64,
    _threshold_max: i64,
    discontinued: bool,
) -> StockStatus {
    if discontinued {
        StockStatus::Discontinued
    } else if quantity == 0 {
        StockStatus::OutOfStock
    } else if quantity <= threshold_min {
        StockStatus::LowStock
    } else {
        StockStatus::InStock
    }
}
