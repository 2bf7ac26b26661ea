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

//! Time-bound stock reservations.
//!
//! ```text
//!            ┌──commit──► COMMITTED   (ledger on-hand reduced)
//!  ACTIVE ───┼──release─► RELEASED    (capacity returned)
//!            └──TTL─────► EXPIRED     (capacity returned)
//! ```
//!
//! Every transition happens at most once; all three targets are terminal.
//!
//! # Retention
//!
//! Availability only ever scans ACTIVE holds. A hold that settles moves to a
//! per-product history, where it can still be looked up by id or order for
//! the retention window (one hour by default). After that it is evicted:
//! lookups report [`StockError::ReservationNotFound`] and the order may
//! reserve the product again. Eviction runs on every mutation of the product
//! and on every sweep.
//!
//! # Locking
//!
//! Each product has one reservation book behind a mutex. Reserve, commit,
//! release, and engine-level adjustments for a product all run with that
//! mutex held, and take the ledger's record lock only while holding it.
//! Two reserves racing for the last units therefore cannot both succeed.
//! Threshold events raised by a commit or adjustment are dispatched after
//! the book is released.

use crate::StockError;
use crate::base::{OrderId, ProductId, ReservationId};
use crate::clock::Clock;
use crate::journal::RESERVATION_COMMIT;
use crate::ledger::StockLedger;
use crate::stock::StockRecord;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use dashmap::mapref::one::Ref;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationState {
    Active,
    Committed,
    Released,
    Expired,
}

impl ReservationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Committed => "COMMITTED",
            Self::Released => "RELEASED",
            Self::Expired => "EXPIRED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }
}

impl fmt::Display for ReservationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A hold on part of a product's on-hand quantity for one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub product_id: ProductId,
    pub order_id: OrderId,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub state: ReservationState,
}

impl Reservation {
    /// Whether the hold still counts against availability at `now`.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.state == ReservationState::Active && self.expires_at > now
    }

    fn ensure_active(&self) -> Result<(), StockError> {
        match self.state {
            ReservationState::Active => Ok(()),
            ReservationState::Expired => Err(StockError::Expired),
            from => Err(StockError::InvalidStateTransition { from }),
        }
    }
}

/// Result of an expiry sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SweepOutcome {
    pub expired: usize,
    pub swept_at: DateTime<Utc>,
}

/// Reservations of a single product.
///
/// `active` holds only ACTIVE reservations. Settled ones sit in `settled`,
/// queued by the time they settled, until eviction.
#[derive(Debug, Default)]
struct BookData {
    active: HashMap<ReservationId, Reservation>,
    settled: HashMap<ReservationId, Reservation>,
    settled_queue: VecDeque<(DateTime<Utc>, ReservationId)>,
    by_order: HashMap<OrderId, ReservationId>,
}

impl BookData {
    fn reserved_at(&self, now: DateTime<Utc>) -> i64 {
        self.active
            .values()
            .filter(|r| r.is_live_at(now))
            .map(|r| r.quantity)
            .sum()
    }

    fn reserved_excluding(&self, now: DateTime<Utc>, id: ReservationId) -> i64 {
        self.active
            .values()
            .filter(|r| r.id != id && r.is_live_at(now))
            .map(|r| r.quantity)
            .sum()
    }

    fn lookup(&self, id: ReservationId) -> Option<&Reservation> {
        self.active.get(&id).or_else(|| self.settled.get(&id))
    }

    fn holder(&self, order_id: OrderId) -> Option<&Reservation> {
        self.by_order
            .get(&order_id)
            .and_then(|id| self.lookup(*id))
    }

    fn insert(&mut self, reservation: Reservation) {
        self.by_order.insert(reservation.order_id, reservation.id);
        self.active.insert(reservation.id, reservation);
    }

    /// Moves an active hold into the settled history with its final state.
    fn settle(
        &mut self,
        id: ReservationId,
        state: ReservationState,
        now: DateTime<Utc>,
    ) -> Option<Reservation> {
        let mut reservation = self.active.remove(&id)?;
        reservation.state = state;
        self.settled.insert(id, reservation.clone());
        self.settled_queue.push_back((now, id));
        Some(reservation)
    }

    /// Settles every active hold whose TTL has elapsed as `EXPIRED`.
    fn expire_stale(&mut self, now: DateTime<Utc>) -> Vec<ReservationId> {
        let mut stale: Vec<ReservationId> = self
            .active
            .values()
            .filter(|r| r.expires_at <= now)
            .map(|r| r.id)
            .collect();
        stale.sort_unstable();
        for id in &stale {
            self.settle(*id, ReservationState::Expired, now);
        }
        stale
    }

    /// Drops settled holds that settled at or before `cutoff`.
    fn evict_settled(&mut self, cutoff: DateTime<Utc>) -> Vec<ReservationId> {
        let mut evicted = Vec::new();
        while let Some(&(settled_at, id)) = self.settled_queue.front() {
            if settled_at > cutoff {
                break;
            }
            self.settled_queue.pop_front();
            let Some(reservation) = self.settled.remove(&id) else {
                continue;
            };
            // A newer hold of the same order keeps the key
            if self.by_order.get(&reservation.order_id) == Some(&id) {
                self.by_order.remove(&reservation.order_id);
            }
            evicted.push(id);
        }
        evicted
    }
}

pub struct ReservationManager {
    ledger: Arc<StockLedger>,
    clock: Arc<dyn Clock>,
    default_ttl: Duration,
    retention: Duration,
    books: DashMap<ProductId, Mutex<BookData>>,
    /// Owning product of every reservation not yet evicted.
    index: DashMap<ReservationId, ProductId>,
    next_id: AtomicU64,
}

impl ReservationManager {
    pub fn new(ledger: Arc<StockLedger>, clock: Arc<dyn Clock>, default_ttl: Duration) -> Self {
        Self {
            ledger,
            clock,
            default_ttl,
            retention: Duration::hours(1),
            books: DashMap::new(),
            index: DashMap::new(),
            next_id: AtomicU64::new(0),
        }
    }

    /// Sets how long settled holds stay available to lookups.
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention.max(Duration::zero());
        self
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Holds `quantity` units of a product for an order, using the default TTL.
    pub fn reserve(
        &self,
        product_id: ProductId,
        quantity: i64,
        order_id: OrderId,
    ) -> Result<Reservation, StockError> {
        self.reserve_with_ttl(product_id, quantity, order_id, self.default_ttl)
    }

    /// Holds `quantity` units of a product for an order until `now + ttl`.
    ///
    /// # Errors
    ///
    /// - [`StockError::Validation`] - Non-positive quantity or TTL.
    /// - [`StockError::ProductNotFound`] - No stock record for the product.
    /// - [`StockError::Discontinued`] - Product no longer accepts holds.
    /// - [`StockError::AlreadyReserved`] - The order has an active or committed hold on it.
    /// - [`StockError::InsufficientStock`] - `quantity` exceeds what is available.
    pub fn reserve_with_ttl(
        &self,
        product_id: ProductId,
        quantity: i64,
        order_id: OrderId,
        ttl: Duration,
    ) -> Result<Reservation, StockError> {
        if quantity <= 0 {
            return Err(StockError::validation("reservation quantity must be positive"));
        }
        if ttl <= Duration::zero() {
            return Err(StockError::validation("reservation TTL must be positive"));
        }

        let book = self.book(product_id)?;
        let mut data = book.lock();
        let now = self.clock.now();
        self.maintain_locked(&mut data, product_id, now);

        if let Some(existing) = data.holder(order_id) {
            if matches!(
                existing.state,
                ReservationState::Active | ReservationState::Committed
            ) {
                return Err(StockError::AlreadyReserved);
            }
        }

        let record = self.ledger.get(product_id)?;
        if record.status.is_discontinued() {
            return Err(StockError::Discontinued);
        }
        let available = record.quantity_on_hand - data.reserved_at(now);
        if quantity > available {
            return Err(StockError::InsufficientStock {
                requested: quantity,
                available: available.max(0),
            });
        }
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| StockError::validation("reservation TTL is out of range"))?;

        let id = ReservationId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let reservation = Reservation {
            id,
            product_id,
            order_id,
            quantity,
            created_at: now,
            expires_at,
            state: ReservationState::Active,
        };
        data.insert(reservation.clone());
        self.index.insert(id, product_id);

        info!(
            reservation_id = %id,
            product_id = %product_id,
            order_id = %order_id,
            quantity,
            expires_at = %expires_at,
            "reservation created"
        );
        Ok(reservation)
    }

    /// Turns an active hold into a permanent deduction from the ledger.
    ///
    /// # Errors
    ///
    /// - [`StockError::ReservationNotFound`] - Unknown or evicted id.
    /// - [`StockError::Expired`] - TTL elapsed before the commit.
    /// - [`StockError::InvalidStateTransition`] - Already committed or released.
    pub fn commit(&self, reservation_id: ReservationId) -> Result<Reservation, StockError> {
        let product_id = self.product_of(reservation_id)?;
        let (committed, event) = {
            let book = self.book(product_id)?;
            let mut data = book.lock();
            let now = self.clock.now();
            self.maintain_locked(&mut data, product_id, now);

            let reservation = data
                .lookup(reservation_id)
                .ok_or(StockError::ReservationNotFound)?;
            reservation.ensure_active()?;
            let quantity = reservation.quantity;
            let floor = data.reserved_excluding(now, reservation_id);

            let (_, event) =
                self.ledger
                    .adjust_above(product_id, -quantity, RESERVATION_COMMIT, floor)?;
            let committed = data
                .settle(reservation_id, ReservationState::Committed, now)
                .ok_or(StockError::ReservationNotFound)?;
            (committed, event)
        };

        info!(
            reservation_id = %reservation_id,
            product_id = %product_id,
            order_id = %committed.order_id,
            quantity = committed.quantity,
            "reservation committed"
        );
        if let Some(event) = event {
            self.ledger.dispatch(event);
        }
        Ok(committed)
    }

    /// Returns an active hold's capacity without touching the ledger.
    ///
    /// # Errors
    ///
    /// - [`StockError::ReservationNotFound`] - Unknown or evicted id.
    /// - [`StockError::Expired`] - TTL already returned the capacity.
    /// - [`StockError::InvalidStateTransition`] - Already committed or released.
    pub fn release(&self, reservation_id: ReservationId) -> Result<Reservation, StockError> {
        let product_id = self.product_of(reservation_id)?;
        let book = self.book(product_id)?;
        let mut data = book.lock();
        let now = self.clock.now();
        self.maintain_locked(&mut data, product_id, now);

        data.lookup(reservation_id)
            .ok_or(StockError::ReservationNotFound)?
            .ensure_active()?;
        let released = data
            .settle(reservation_id, ReservationState::Released, now)
            .ok_or(StockError::ReservationNotFound)?;

        info!(
            reservation_id = %reservation_id,
            product_id = %product_id,
            order_id = %released.order_id,
            quantity = released.quantity,
            "reservation released"
        );
        Ok(released)
    }

    /// Releases every live hold owned by `order_id`, across all products.
    ///
    /// Used to compensate when one line of a multi-line order fails.
    pub fn release_order(&self, order_id: OrderId) -> Vec<ReservationId> {
        let mut released = Vec::new();
        for product_id in self.book_ids() {
            let Some(book) = self.books.get(&product_id) else {
                continue;
            };
            let mut data = book.lock();
            let now = self.clock.now();
            self.maintain_locked(&mut data, product_id, now);

            let Some(id) = data.by_order.get(&order_id).copied() else {
                continue;
            };
            if data
                .settle(id, ReservationState::Released, now)
                .is_some()
            {
                released.push(id);
            }
        }
        if !released.is_empty() {
            info!(order_id = %order_id, count = released.len(), "order reservations released");
        }
        released
    }

    /// Expires every active hold past its TTL, for one product or all, and
    /// evicts settled holds older than the retention window.
    ///
    /// Safe to call repeatedly and concurrently; an unknown product is a no-op.
    pub fn sweep(&self, product_id: Option<ProductId>) -> SweepOutcome {
        let products = match product_id {
            Some(product_id) => vec![product_id],
            None => self.book_ids(),
        };

        let mut expired = 0;
        for product_id in products {
            let Some(book) = self.books.get(&product_id) else {
                debug!(product_id = %product_id, "sweep skipped, no reservations");
                continue;
            };
            let mut data = book.lock();
            expired += self.maintain_locked(&mut data, product_id, self.clock.now());
        }

        let swept_at = self.clock.now();
        if expired > 0 {
            info!(expired, "reservation sweep completed");
        }
        SweepOutcome { expired, swept_at }
    }

    /// Sum of live holds: active and not yet past `expires_at`.
    pub fn active_reserved_sum(&self, product_id: ProductId) -> i64 {
        let now = self.clock.now();
        self.books
            .get(&product_id)
            .map(|book| book.lock().reserved_at(now))
            .unwrap_or(0)
    }

    /// Record and live reserved total, read under the product's book lock.
    pub fn snapshot(&self, product_id: ProductId) -> Result<(StockRecord, i64), StockError> {
        let book = self.book(product_id)?;
        let data = book.lock();
        let record = self.ledger.get(product_id)?;
        Ok((record, data.reserved_at(self.clock.now())))
    }

    /// Adjusts on-hand without dipping below what is currently reserved.
    pub fn adjust_quantity(
        &self,
        product_id: ProductId,
        delta: i64,
        reason: &str,
    ) -> Result<StockRecord, StockError> {
        let (record, event) = {
            let book = self.book(product_id)?;
            let mut data = book.lock();
            let now = self.clock.now();
            self.maintain_locked(&mut data, product_id, now);
            self.ledger
                .adjust_above(product_id, delta, reason, data.reserved_at(now))?
        };
        if let Some(event) = event {
            self.ledger.dispatch(event);
        }
        Ok(record)
    }

    /// Discontinues a product while holding its book, so no reserve interleaves.
    pub fn mark_discontinued(&self, product_id: ProductId) -> Result<StockRecord, StockError> {
        let book = self.book(product_id)?;
        let _data = book.lock();
        self.ledger.mark_discontinued(product_id)
    }

    /// A reservation by id, while it is active or within retention.
    pub fn get(&self, reservation_id: ReservationId) -> Result<Reservation, StockError> {
        let product_id = self.product_of(reservation_id)?;
        let book = self
            .books
            .get(&product_id)
            .ok_or(StockError::ReservationNotFound)?;
        let data = book.lock();
        data.lookup(reservation_id)
            .cloned()
            .ok_or(StockError::ReservationNotFound)
    }

    /// The most recent reservation an order holds on a product, in any state,
    /// unless it has been evicted.
    pub fn find(&self, product_id: ProductId, order_id: OrderId) -> Option<Reservation> {
        let book = self.books.get(&product_id)?;
        let data = book.lock();
        data.holder(order_id).cloned()
    }

    /// Outstanding ACTIVE holds for a product, ordered by id.
    ///
    /// Holds past their TTL appear until the next mutation or sweep of the
    /// product settles them.
    pub fn reservations_for(&self, product_id: ProductId) -> Vec<Reservation> {
        let Some(book) = self.books.get(&product_id) else {
            return Vec::new();
        };
        let mut reservations: Vec<Reservation> =
            book.lock().active.values().cloned().collect();
        reservations.sort_unstable_by_key(|r| r.id);
        reservations
    }

    fn product_of(&self, reservation_id: ReservationId) -> Result<ProductId, StockError> {
        self.index
            .get(&reservation_id)
            .map(|entry| *entry.value())
            .ok_or(StockError::ReservationNotFound)
    }

    fn book_ids(&self) -> Vec<ProductId> {
        self.books.iter().map(|entry| *entry.key()).collect()
    }

    /// Returns the product's book, creating it on first use.
    fn book(&self, product_id: ProductId) -> Result<Ref<'_, ProductId, Mutex<BookData>>, StockError> {
        if let Some(book) = self.books.get(&product_id) {
            return Ok(book);
        }
        if !self.ledger.contains(product_id) {
            return Err(StockError::ProductNotFound);
        }
        Ok(self.books.entry(product_id).or_default().downgrade())
    }

    /// Expires elapsed holds and evicts stale history. Returns the number
    /// of holds expired.
    fn maintain_locked(
        &self,
        data: &mut BookData,
        product_id: ProductId,
        now: DateTime<Utc>,
    ) -> usize {
        let expired = data.expire_stale(now);
        for id in &expired {
            info!(reservation_id = %id, product_id = %product_id, "reservation expired");
        }

        if let Some(cutoff) = now.checked_sub_signed(self.retention) {
            let evicted = data.evict_settled(cutoff);
            for id in &evicted {
                self.index.remove(id);
            }
            if !evicted.is_empty() {
                debug!(product_id = %product_id, evicted = evicted.len(), "settled reservations evicted");
            }
        }
        expired.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::LoggingAlertDispatcher;
    use crate::clock::ManualClock;
    use crate::stock::NewStock;

    fn manager(quantity: i64) -> (ReservationManager, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let ledger = Arc::new(StockLedger::new(
            clock.clone(),
            Arc::new(LoggingAlertDispatcher),
        ));
        ledger
            .create(NewStock::new(ProductId(1), quantity, 3, 50))
            .unwrap();
        let manager = ReservationManager::new(ledger, clock.clone(), Duration::hours(24));
        (manager, clock)
    }

    fn reservation(id: u64, quantity: i64, expires_at: DateTime<Utc>) -> Reservation {
        Reservation {
            id: ReservationId(id),
            product_id: ProductId(1),
            order_id: OrderId(id as u32),
            quantity,
            created_at: expires_at - Duration::hours(1),
            expires_at,
            state: ReservationState::Active,
        }
    }

    // === BookData Internal Tests ===

    #[test]
    fn book_reserved_at_ignores_elapsed_holds() {
        let now = Utc::now();
        let mut data = BookData::default();
        data.insert(reservation(1, 4, now + Duration::minutes(1)));
        data.insert(reservation(2, 5, now));
        assert_eq!(data.reserved_at(now), 4);
        assert_eq!(data.reserved_excluding(now, ReservationId(1)), 0);
    }

    #[test]
    fn book_expire_stale_is_idempotent() {
        let now = Utc::now();
        let mut data = BookData::default();
        data.insert(reservation(1, 4, now));
        assert_eq!(data.expire_stale(now), vec![ReservationId(1)]);
        assert!(data.expire_stale(now).is_empty());
        assert!(data.active.is_empty());
        assert_eq!(
            data.lookup(ReservationId(1)).unwrap().state,
            ReservationState::Expired
        );
    }

    #[test]
    fn book_eviction_keeps_newer_order_key() {
        let now = Utc::now();
        let mut data = BookData::default();
        let mut first = reservation(1, 4, now + Duration::hours(1));
        first.order_id = OrderId(9);
        let mut second = reservation(2, 1, now + Duration::hours(1));
        second.order_id = OrderId(9);

        data.insert(first);
        data.settle(ReservationId(1), ReservationState::Released, now);
        data.insert(second);

        assert_eq!(data.evict_settled(now), vec![ReservationId(1)]);
        assert!(data.lookup(ReservationId(1)).is_none());
        assert_eq!(data.holder(OrderId(9)).unwrap().id, ReservationId(2));
        assert!(data.evict_settled(now).is_empty());
    }

    #[test]
    fn book_eviction_respects_cutoff() {
        let now = Utc::now();
        let mut data = BookData::default();
        data.insert(reservation(1, 4, now + Duration::hours(1)));
        data.settle(ReservationId(1), ReservationState::Committed, now);

        assert!(data.evict_settled(now - Duration::seconds(1)).is_empty());
        assert_eq!(data.holder(OrderId(1)).unwrap().state, ReservationState::Committed);
        assert_eq!(data.evict_settled(now), vec![ReservationId(1)]);
        assert!(data.holder(OrderId(1)).is_none());
    }

    // === Manager Tests ===

    #[test]
    fn reserve_validates_input() {
        let (manager, _) = manager(10);
        assert!(matches!(
            manager.reserve(ProductId(1), 0, OrderId(1)),
            Err(StockError::Validation(_))
        ));
        assert!(matches!(
            manager.reserve_with_ttl(ProductId(1), 1, OrderId(1), Duration::zero()),
            Err(StockError::Validation(_))
        ));
        assert_eq!(
            manager.reserve(ProductId(2), 1, OrderId(1)),
            Err(StockError::ProductNotFound)
        );
    }

    #[test]
    fn reserve_after_release_frees_order_key() {
        let (manager, _) = manager(10);
        let first = manager.reserve(ProductId(1), 4, OrderId(1)).unwrap();
        assert_eq!(
            manager.reserve(ProductId(1), 1, OrderId(1)),
            Err(StockError::AlreadyReserved)
        );
        manager.release(first.id).unwrap();

        let second = manager.reserve(ProductId(1), 2, OrderId(1)).unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(manager.find(ProductId(1), OrderId(1)).unwrap().id, second.id);
        assert_eq!(manager.active_reserved_sum(ProductId(1)), 2);
    }

    #[test]
    fn committed_order_cannot_reserve_again() {
        let (manager, _) = manager(10);
        let held = manager.reserve(ProductId(1), 4, OrderId(1)).unwrap();
        manager.commit(held.id).unwrap();
        assert_eq!(
            manager.reserve(ProductId(1), 1, OrderId(1)),
            Err(StockError::AlreadyReserved)
        );
    }

    #[test]
    fn commit_after_ttl_reports_expired() {
        let (manager, clock) = manager(10);
        let held = manager
            .reserve_with_ttl(ProductId(1), 4, OrderId(1), Duration::minutes(5))
            .unwrap();
        clock.advance(Duration::minutes(5));

        assert_eq!(manager.commit(held.id), Err(StockError::Expired));
        assert_eq!(manager.get(held.id).unwrap().state, ReservationState::Expired);
        assert_eq!(manager.release(held.id), Err(StockError::Expired));
    }

    #[test]
    fn sweep_counts_each_expiry_once() {
        let (manager, clock) = manager(10);
        manager
            .reserve_with_ttl(ProductId(1), 2, OrderId(1), Duration::seconds(1))
            .unwrap();
        manager
            .reserve_with_ttl(ProductId(1), 2, OrderId(2), Duration::hours(1))
            .unwrap();
        clock.advance(Duration::seconds(2));

        assert_eq!(manager.sweep(None).expired, 1);
        assert_eq!(manager.sweep(Some(ProductId(1))).expired, 0);
        assert_eq!(manager.sweep(Some(ProductId(42))).expired, 0);
        assert_eq!(manager.active_reserved_sum(ProductId(1)), 2);
    }

    #[test]
    fn adjust_respects_live_reservations() {
        let (manager, _) = manager(10);
        manager.reserve(ProductId(1), 7, OrderId(1)).unwrap();
        assert_eq!(
            manager.adjust_quantity(ProductId(1), -4, "DAMAGE"),
            Err(StockError::InsufficientStock {
                requested: 4,
                available: 3
            })
        );
        let record = manager.adjust_quantity(ProductId(1), -3, "DAMAGE").unwrap();
        assert_eq!(record.quantity_on_hand, 7);
    }

    #[test]
    fn settled_holds_leave_the_scan_set() {
        let (manager, clock) = manager(10);
        for order in 0..1_000 {
            let held = manager.reserve(ProductId(1), 1, OrderId(order)).unwrap();
            manager.release(held.id).unwrap();
        }
        assert!(manager.reservations_for(ProductId(1)).is_empty());
        assert_eq!(manager.index.len(), 1_000);

        clock.advance(Duration::hours(1));
        assert_eq!(manager.sweep(None).expired, 0);

        let book = manager.books.get(&ProductId(1)).unwrap();
        let data = book.lock();
        assert!(data.active.is_empty());
        assert!(data.settled.is_empty());
        assert!(data.settled_queue.is_empty());
        assert!(data.by_order.is_empty());
        drop(data);
        drop(book);
        assert!(manager.index.is_empty());
    }

    #[test]
    fn retention_is_configurable() {
        let (manager, clock) = manager(10);
        let manager = manager.with_retention(Duration::minutes(5));
        let held = manager.reserve(ProductId(1), 4, OrderId(1)).unwrap();
        manager.commit(held.id).unwrap();

        clock.advance(Duration::minutes(4));
        manager.sweep(Some(ProductId(1)));
        assert_eq!(manager.get(held.id).unwrap().state, ReservationState::Committed);

        clock.advance(Duration::minutes(1));
        manager.sweep(Some(ProductId(1)));
        assert_eq!(manager.get(held.id), Err(StockError::ReservationNotFound));
        assert_eq!(manager.commit(held.id), Err(StockError::ReservationNotFound));
    }

    #[test]
    fn unknown_reservation_is_not_found() {
        let (manager, _) = manager(10);
        assert_eq!(
            manager.commit(ReservationId(77)),
            Err(StockError::ReservationNotFound)
        );
        assert_eq!(
            manager.release(ReservationId(77)),
            Err(StockError::ReservationNotFound)
        );
        assert_eq!(
            manager.get(ReservationId(77)),
            Err(StockError::ReservationNotFound)
        );
    }
}
