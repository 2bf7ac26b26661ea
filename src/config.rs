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

//! Engine configuration.

use crate::StockError;
use chrono::Duration;
use serde::Deserialize;

/// Tunables for the stock engine.
///
/// Deserializes from seconds-valued fields:
///
/// ```
/// use stock_reservation_rs::EngineConfig;
///
/// let config: EngineConfig = serde_json::from_str(
///     r#"{"reservation_ttl_secs": 900, "sweep_interval_secs": 30}"#,
/// ).unwrap();
/// assert_eq!(config.reservation_ttl().num_minutes(), 15);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Default lifetime of a reservation.
    pub reservation_ttl_secs: u64,
    /// Cadence of the background sweeper.
    pub sweep_interval_secs: u64,
    /// How long settled reservations stay available to lookups.
    pub reservation_retention_secs: u64,
}

impl EngineConfig {
    pub const DEFAULT_RESERVATION_TTL_SECS: u64 = 24 * 60 * 60;
    pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
    pub const DEFAULT_RESERVATION_RETENTION_SECS: u64 = 60 * 60;

    /// Falls back to the default when the value is out of range, which
    /// [`validate`](Self::validate) rejects.
    pub fn reservation_ttl(&self) -> Duration {
        seconds_or(self.reservation_ttl_secs, Self::DEFAULT_RESERVATION_TTL_SECS)
    }

    pub fn reservation_retention(&self) -> Duration {
        seconds_or(
            self.reservation_retention_secs,
            Self::DEFAULT_RESERVATION_RETENTION_SECS,
        )
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn validate(&self) -> Result<(), StockError> {
        if self.reservation_ttl_secs == 0 {
            return Err(StockError::validation("reservation TTL must be positive"));
        }
        if self.reservation_ttl_secs > MAX_SECS {
            return Err(StockError::validation("reservation TTL is out of range"));
        }
        if self.sweep_interval_secs == 0 {
            return Err(StockError::validation("sweep interval must be positive"));
        }
        if self.reservation_retention_secs > MAX_SECS {
            return Err(StockError::validation("reservation retention is out of range"));
        }
        Ok(())
    }
}

/// Largest whole-second value a chrono `Duration` holds.
const MAX_SECS: u64 = i64::MAX as u64 / 1_000;

fn seconds_or(secs: u64, default: u64) -> Duration {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or_else(|| Duration::seconds(default as i64))
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reservation_ttl_secs: Self::DEFAULT_RESERVATION_TTL_SECS,
            sweep_interval_secs: Self::DEFAULT_SWEEP_INTERVAL_SECS,
            reservation_retention_secs: Self::DEFAULT_RESERVATION_RETENTION_SECS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ttl_is_one_day() {
        let config = EngineConfig::default();
        assert_eq!(config.reservation_ttl(), Duration::hours(24));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"sweep_interval_secs": 5}"#).unwrap();
        assert_eq!(config.reservation_ttl_secs, EngineConfig::DEFAULT_RESERVATION_TTL_SECS);
        assert_eq!(config.sweep_interval(), std::time::Duration::from_secs(5));
    }

    #[test]
    fn zero_values_are_rejected() {
        let ttl = EngineConfig {
            reservation_ttl_secs: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(ttl.validate(), Err(StockError::Validation(_))));

        let interval = EngineConfig {
            sweep_interval_secs: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(interval.validate(), Err(StockError::Validation(_))));
    }

    #[test]
    fn out_of_range_ttl_falls_back_without_panicking() {
        let config = EngineConfig {
            reservation_ttl_secs: u64::MAX,
            reservation_retention_secs: i64::MAX as u64,
            ..EngineConfig::default()
        };
        assert_eq!(config.reservation_ttl(), Duration::hours(24));
        assert_eq!(config.reservation_retention(), Duration::hours(1));
        assert!(matches!(config.validate(), Err(StockError::Validation(_))));
    }

    #[test]
    fn zero_retention_is_allowed() {
        let config = EngineConfig {
            reservation_retention_secs: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.reservation_retention(), Duration::zero());
    }
}
