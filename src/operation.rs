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

//! Stock operations as data.
//!
//! Batch and wire front-ends decode their input into a [`StockOperation`]
//! and hand it to [`StockEngine::process`](crate::StockEngine::process).
//! Commit and release address a hold by `(product, order)`, which is unique
//! while the hold is live.

use crate::base::{OrderId, ProductId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StockOperation {
    Create {
        product_id: ProductId,
        quantity: i64,
        threshold_min: i64,
        threshold_max: i64,
    },
    Adjust {
        product_id: ProductId,
        delta: i64,
        reason: String,
    },
    Reserve {
        product_id: ProductId,
        order_id: OrderId,
        quantity: i64,
    },
    Commit {
        product_id: ProductId,
        order_id: OrderId,
    },
    Release {
        product_id: ProductId,
        order_id: OrderId,
    },
    Discontinue {
        product_id: ProductId,
    },
    Sweep {
        product_id: Option<ProductId>,
    },
}

impl StockOperation {
    pub fn product_id(&self) -> Option<ProductId> {
        match self {
            Self::Create { product_id, .. } => Some(*product_id),
            Self::Adjust { product_id, .. } => Some(*product_id),
            Self::Reserve { product_id, .. } => Some(*product_id),
            Self::Commit { product_id, .. } => Some(*product_id),
            Self::Release { product_id, .. } => Some(*product_id),
            Self::Discontinue { product_id } => Some(*product_id),
            Self::Sweep { product_id } => *product_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Adjust { .. } => "adjust",
            Self::Reserve { .. } => "reserve",
            Self::Commit { .. } => "commit",
            Self::Release { .. } => "release",
            Self::Discontinue { .. } => "discontinue",
            Self::Sweep { .. } => "sweep",
        }
    }
}
