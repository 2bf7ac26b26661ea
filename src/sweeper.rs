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

//! Background expiry sweeps.
//!
//! Availability never depends on the sweeper running; it only keeps
//! reservation states current for reporting.

use crate::reservation::ReservationManager;
use crossbeam::channel::{self, Sender};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info};

/// Handle to a running sweeper thread. Dropping it stops the thread.
#[derive(Debug)]
pub struct Sweeper {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Sweeper {
    /// Starts a thread that sweeps every product once per `interval`.
    pub fn spawn(reservations: Arc<ReservationManager>, interval: Duration) -> io::Result<Self> {
        let (stop_tx, stop_rx) = channel::bounded::<()>(0);
        let ticker = channel::tick(interval);

        let handle = thread::Builder::new()
            .name("reservation-sweeper".to_owned())
            .spawn(move || {
                info!(interval_ms = interval.as_millis() as u64, "sweeper started");
                loop {
                    crossbeam::select! {
                        recv(stop_rx) -> _ => break,
                        recv(ticker) -> _ => {
                            let outcome = reservations.sweep(None);
                            debug!(expired = outcome.expired, "periodic sweep");
                        }
                    }
                }
                info!("sweeper stopped");
            })?;

        Ok(Self {
            stop: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Stops the thread and waits for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Dropping the sender disconnects the stop channel.
        self.stop.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.shutdown();
    }
}
