//! In-memory document store.
//!
//! `MemoryStore` stands in for the external document database collaborator.
//! It provides the three capabilities the purchase protocol depends on:
//!
//! - Per-document conditional updates (compare-and-swap on ticket status)
//! - Atomic multi-document batches (all writes validate, then all apply,
//!   under one lock)
//! - Live query subscriptions delivering a fresh snapshot per change
//!
//! # Concurrency
//!
//! All state lives behind a single `RwLock`; batch validation and
//! application happen under one write guard, so a batch is never partially
//! visible and two racing `MarkSold` ops on the same ticket serialize, with
//! the loser failing its expected-status check. Committed changes bump a
//! revision counter published through a `tokio::sync::watch` channel that
//! subscriptions listen on.

use async_stream::stream;
use cineswap_core::store::{
    BatchCommit, LiveTickets, StoreError, TicketQuery, TicketStore, TicketSubscription,
    TransactionLedger, WriteBatch, WriteOp,
};
use cineswap_core::types::{
    PurchaseRecord, Ticket, TicketId, TicketStatus, Transaction, TransactionId, UserId,
};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, Weak};
use tokio::sync::watch;

/// Document state guarded by the store lock.
#[derive(Debug, Default)]
struct State {
    tickets: HashMap<TicketId, Ticket>,
    transactions: HashMap<TransactionId, Transaction>,
    /// One transaction per ticket, ever (append-only ledger invariant).
    transaction_by_ticket: HashMap<TicketId, TransactionId>,
    /// Purchase records scoped per buyer, in append order.
    purchases: HashMap<UserId, Vec<PurchaseRecord>>,
    revision: u64,
}

impl State {
    /// Evaluate a query against current state.
    ///
    /// Results are sorted by show time (then id) so snapshots are
    /// deterministic regardless of map iteration order.
    fn snapshot(&self, query: TicketQuery) -> Vec<Ticket> {
        let mut tickets: Vec<Ticket> = match query {
            TicketQuery::Available => self
                .tickets
                .values()
                .filter(|t| t.is_available())
                .cloned()
                .collect(),
            TicketQuery::OwnedBy(owner) => self
                .tickets
                .values()
                .filter(|t| t.posted_by == owner)
                .cloned()
                .collect(),
            TicketQuery::PurchasedBy(buyer) => self
                .purchases
                .get(&buyer)
                .map(|records| {
                    records
                        .iter()
                        .filter_map(|r| self.tickets.get(&r.ticket_id).cloned())
                        .collect()
                })
                .unwrap_or_default(),
            TicketQuery::ById(id) => self.tickets.get(&id).cloned().into_iter().collect(),
        };
        if !matches!(query, TicketQuery::PurchasedBy(_)) {
            tickets.sort_by(|a, b| a.show_time.cmp(&b.show_time).then(a.id.cmp(&b.id)));
        }
        tickets
    }

    /// Validate a single op against current state without applying it.
    fn validate(&self, op: &WriteOp) -> Result<(), StoreError> {
        match op {
            WriteOp::MarkSold {
                ticket_id,
                expected,
            } => {
                let ticket = self
                    .tickets
                    .get(ticket_id)
                    .ok_or(StoreError::TicketNotFound(*ticket_id))?;
                if ticket.status == *expected {
                    Ok(())
                } else {
                    Err(StoreError::Conflict {
                        ticket_id: *ticket_id,
                        expected: *expected,
                        actual: ticket.status,
                    })
                }
            },
            WriteOp::AppendTransaction(transaction) => {
                if self
                    .transaction_by_ticket
                    .contains_key(&transaction.ticket_id)
                {
                    return Err(StoreError::DuplicateTransaction {
                        ticket_id: transaction.ticket_id,
                    });
                }
                if self.transactions.contains_key(&transaction.id) {
                    return Err(StoreError::Backend(format!(
                        "transaction id collision: {}",
                        transaction.id
                    )));
                }
                Ok(())
            },
            WriteOp::AppendPurchaseRecord { .. } => Ok(()),
        }
    }

    /// Apply a previously validated op.
    fn apply(&mut self, op: WriteOp) {
        match op {
            WriteOp::MarkSold { ticket_id, .. } => {
                if let Some(ticket) = self.tickets.get_mut(&ticket_id) {
                    ticket.status = TicketStatus::Sold;
                }
            },
            WriteOp::AppendTransaction(transaction) => {
                self.transaction_by_ticket
                    .insert(transaction.ticket_id, transaction.id);
                self.transactions.insert(transaction.id, transaction);
            },
            WriteOp::AppendPurchaseRecord { buyer_id, record } => {
                self.purchases.entry(buyer_id).or_default().push(record);
            },
        }
    }
}

struct Shared {
    state: RwLock<State>,
    revision_tx: watch::Sender<u64>,
    fail_next_commit: AtomicBool,
}

impl Shared {
    /// Take a read guard, mapping lock poisoning to a backend error.
    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, State>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::Backend("store lock poisoned".into()))
    }

    /// Validate-then-apply a batch under one write guard.
    fn commit_batch(&self, batch: WriteBatch) -> Result<u64, StoreError> {
        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Backend("injected commit fault".into()));
        }

        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::Backend("store lock poisoned".into()))?;

        for op in batch.ops() {
            state.validate(op)?;
        }
        let op_count = batch.len();
        for op in batch {
            state.apply(op);
        }
        state.revision += 1;
        let revision = state.revision;
        drop(state);

        // Wake subscriptions after the guard is released.
        self.revision_tx.send_replace(revision);
        tracing::debug!(revision, op_count, "batch committed");
        Ok(revision)
    }
}

/// In-memory marketplace store.
///
/// Cheap to clone; clones share the same underlying state, which is how
/// independent browsing sessions in tests and the demo observe each other's
/// writes.
#[derive(Clone)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        let (revision_tx, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                state: RwLock::new(State::default()),
                revision_tx,
                fail_next_commit: AtomicBool::new(false),
            }),
        }
    }

    /// Creates an Arc-wrapped store usable as `Arc<dyn MarketStore>`
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Insert a new listing, as the (out-of-scope) posting flow would.
    ///
    /// Only the lifecycle preconditions are checked: the listing must
    /// arrive available, with a positive ticket count. Business fields are
    /// opaque to the store.
    ///
    /// # Errors
    ///
    /// - `InvalidListing`: status is not available or ticket count is zero
    /// - `Backend`: a listing with this id already exists
    pub fn insert_ticket(&self, ticket: Ticket) -> Result<(), StoreError> {
        if !ticket.is_available() {
            return Err(StoreError::InvalidListing {
                reason: format!("new listings must be available, got {}", ticket.status),
            });
        }
        if ticket.ticket_count == 0 {
            return Err(StoreError::InvalidListing {
                reason: "ticket count must be positive".into(),
            });
        }

        let mut state = self
            .shared
            .state
            .write()
            .map_err(|_| StoreError::Backend("store lock poisoned".into()))?;
        if state.tickets.contains_key(&ticket.id) {
            return Err(StoreError::Backend(format!(
                "ticket id collision: {}",
                ticket.id
            )));
        }
        let id = ticket.id;
        state.tickets.insert(id, ticket);
        state.revision += 1;
        let revision = state.revision;
        drop(state);

        self.shared.revision_tx.send_replace(revision);
        tracing::debug!(ticket_id = %id, revision, "listing inserted");
        Ok(())
    }

    /// Make the next commit fail with a backend error, leaving state
    /// untouched.
    ///
    /// Used by tests (and the demo) to exercise the all-or-nothing
    /// guarantee and the `CommitFailure` path.
    pub fn fail_next_commit(&self) {
        self.shared.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// The current store revision (bumped on every committed change)
    ///
    /// # Errors
    ///
    /// - `Backend`: the store lock is poisoned
    pub fn revision(&self) -> Result<u64, StoreError> {
        Ok(self.shared.read()?.revision)
    }

    /// Number of transactions recorded for a ticket (0 or 1 by invariant)
    ///
    /// # Errors
    ///
    /// - `Backend`: the store lock is poisoned
    pub fn transaction_count_for(&self, ticket_id: TicketId) -> Result<usize, StoreError> {
        let state = self.shared.read()?;
        Ok(usize::from(
            state.transaction_by_ticket.contains_key(&ticket_id),
        ))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

impl TicketStore for MemoryStore {
    fn list_available(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Ticket>, StoreError>> + Send + '_>> {
        Box::pin(async move { Ok(self.shared.read()?.snapshot(TicketQuery::Available)) })
    }

    fn get(
        &self,
        ticket_id: TicketId,
    ) -> Pin<Box<dyn Future<Output = Result<Ticket, StoreError>> + Send + '_>> {
        Box::pin(async move {
            self.shared
                .read()?
                .tickets
                .get(&ticket_id)
                .cloned()
                .ok_or(StoreError::TicketNotFound(ticket_id))
        })
    }

    fn list_by_owner(
        &self,
        owner_id: UserId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Ticket>, StoreError>> + Send + '_>> {
        Box::pin(async move { Ok(self.shared.read()?.snapshot(TicketQuery::OwnedBy(owner_id))) })
    }

    fn mark_sold(
        &self,
        ticket_id: TicketId,
    ) -> Pin<Box<dyn Future<Output = Result<Ticket, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let mut batch = WriteBatch::new();
            batch.mark_sold(ticket_id, TicketStatus::Available);
            self.shared.commit_batch(batch)?;
            self.shared
                .read()?
                .tickets
                .get(&ticket_id)
                .cloned()
                .ok_or(StoreError::TicketNotFound(ticket_id))
        })
    }
}

impl TransactionLedger for MemoryStore {
    fn record_sale(
        &self,
        transaction: Transaction,
        record: PurchaseRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>> {
        Box::pin(async move {
            let buyer_id = transaction.buyer_id;
            let mut batch = WriteBatch::new();
            batch.append_transaction(transaction);
            batch.append_purchase_record(buyer_id, record);
            self.shared.commit_batch(batch)?;
            Ok(())
        })
    }

    fn list_by_buyer(
        &self,
        buyer_id: UserId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PurchaseRecord>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            Ok(self
                .shared
                .read()?
                .purchases
                .get(&buyer_id)
                .cloned()
                .unwrap_or_default())
        })
    }

    fn get_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> Pin<Box<dyn Future<Output = Result<Transaction, StoreError>> + Send + '_>> {
        Box::pin(async move {
            self.shared
                .read()?
                .transactions
                .get(&transaction_id)
                .cloned()
                .ok_or(StoreError::TransactionNotFound(transaction_id))
        })
    }
}

impl BatchCommit for MemoryStore {
    fn commit(
        &self,
        batch: WriteBatch,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>> {
        Box::pin(async move {
            self.shared.commit_batch(batch)?;
            Ok(())
        })
    }
}

impl LiveTickets for MemoryStore {
    fn subscribe(
        &self,
        query: TicketQuery,
    ) -> Pin<Box<dyn Future<Output = Result<TicketSubscription, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let mut revision_rx = self.shared.revision_tx.subscribe();
            // Mark the current revision seen before snapshotting: a commit
            // landing in between is covered by the snapshot and at worst
            // redelivered once.
            let _ = revision_rx.borrow_and_update();
            let initial = self.shared.read()?.snapshot(query);

            let weak: Weak<Shared> = Arc::downgrade(&self.shared);
            let changes = stream! {
                loop {
                    if revision_rx.changed().await.is_err() {
                        break;
                    }
                    let Some(shared) = weak.upgrade() else { break };
                    let snap = {
                        let Ok(state) = shared.read() else { break };
                        state.snapshot(query)
                    };
                    yield snap;
                }
            };

            Ok(TicketSubscription::new(initial, Box::pin(changes)))
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use cineswap_testing::fixtures::{available_ticket, seller};

    fn store_with_ticket() -> (MemoryStore, Ticket) {
        let store = MemoryStore::new();
        let ticket = available_ticket(seller());
        store.insert_ticket(ticket.clone()).unwrap();
        (store, ticket)
    }

    #[tokio::test]
    async fn mark_sold_flips_status_once() {
        let (store, ticket) = store_with_ticket();

        let sold = store.mark_sold(ticket.id).await.unwrap();
        assert_eq!(sold.status, TicketStatus::Sold);

        // Second attempt hits the compare-and-swap guard.
        let err = store.mark_sold(ticket.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { actual, .. } if actual == TicketStatus::Sold));
    }

    #[tokio::test]
    async fn mark_sold_unknown_ticket_is_not_found() {
        let store = MemoryStore::new();
        let missing = TicketId::new();
        let err = store.mark_sold(missing).await.unwrap_err();
        assert_eq!(err, StoreError::TicketNotFound(missing));
    }

    #[tokio::test]
    async fn insert_rejects_non_available_listing() {
        let store = MemoryStore::new();
        let mut ticket = available_ticket(seller());
        ticket.status = TicketStatus::Sold;
        let err = store.insert_ticket(ticket).unwrap_err();
        assert!(matches!(err, StoreError::InvalidListing { .. }));
    }

    #[tokio::test]
    async fn insert_rejects_zero_count_listing() {
        let store = MemoryStore::new();
        let mut ticket = available_ticket(seller());
        ticket.ticket_count = 0;
        let err = store.insert_ticket(ticket).unwrap_err();
        assert!(matches!(err, StoreError::InvalidListing { .. }));
    }

    #[tokio::test]
    async fn failed_batch_applies_nothing() {
        let (store, ticket) = store_with_ticket();
        let before = store.revision().unwrap();

        // A batch whose last op fails must not apply its first op.
        let buyer = UserId::new();
        let transaction = Transaction {
            id: TransactionId::new(),
            ticket_id: ticket.id,
            buyer_id: buyer,
            seller_id: ticket.posted_by,
            payment_method: cineswap_core::types::PaymentMethod::Card,
            amount: ticket.total_price().unwrap(),
            transaction_date: chrono::Utc::now(),
        };
        let mut poisoned = WriteBatch::new();
        poisoned.mark_sold(ticket.id, TicketStatus::Available);
        poisoned.append_transaction(transaction.clone());
        // Duplicate append for the same ticket fails validation.
        let mut second = transaction;
        second.id = TransactionId::new();
        poisoned.append_transaction(second);

        let err = store.commit(poisoned).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateTransaction { .. }));

        let after = store.get(ticket.id).await.unwrap();
        assert_eq!(after.status, TicketStatus::Available);
        assert_eq!(store.revision().unwrap(), before);
        assert_eq!(store.transaction_count_for(ticket.id).unwrap(), 0);
    }

    #[tokio::test]
    async fn injected_fault_fails_exactly_one_commit() {
        let (store, ticket) = store_with_ticket();
        store.fail_next_commit();

        let err = store.mark_sold(ticket.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
        assert!(store.get(ticket.id).await.unwrap().is_available());

        // Retry succeeds; the fault is single-shot.
        let sold = store.mark_sold(ticket.id).await.unwrap();
        assert!(sold.status.is_sold());
    }

    #[tokio::test]
    async fn record_sale_is_append_only_per_ticket() {
        let (store, ticket) = store_with_ticket();
        let buyer = UserId::new();
        let now = chrono::Utc::now();
        let transaction = Transaction {
            id: TransactionId::new(),
            ticket_id: ticket.id,
            buyer_id: buyer,
            seller_id: ticket.posted_by,
            payment_method: cineswap_core::types::PaymentMethod::Upi,
            amount: ticket.total_price().unwrap(),
            transaction_date: now,
        };
        let record = PurchaseRecord {
            transaction_id: transaction.id,
            ticket_id: ticket.id,
            purchased_at: now,
        };

        store
            .record_sale(transaction.clone(), record)
            .await
            .unwrap();
        assert_eq!(store.list_by_buyer(buyer).await.unwrap(), vec![record]);
        assert_eq!(
            store.get_transaction(transaction.id).await.unwrap(),
            transaction
        );

        let mut again = transaction;
        again.id = TransactionId::new();
        let err = store.record_sale(again, record).await.unwrap_err();
        assert_eq!(
            err,
            StoreError::DuplicateTransaction {
                ticket_id: ticket.id
            }
        );
    }

    #[tokio::test]
    async fn subscription_sees_initial_then_change() {
        let (store, ticket) = store_with_ticket();

        let mut sub = store.subscribe(TicketQuery::Available).await.unwrap();
        assert_eq!(sub.initial().len(), 1);

        store.mark_sold(ticket.id).await.unwrap();
        let snap = sub.next_snapshot().await.unwrap();
        assert!(snap.is_empty());
    }

    #[tokio::test]
    async fn purchased_by_query_resolves_tickets() {
        let (store, ticket) = store_with_ticket();
        let buyer = UserId::new();
        let now = chrono::Utc::now();
        let transaction = Transaction {
            id: TransactionId::new(),
            ticket_id: ticket.id,
            buyer_id: buyer,
            seller_id: ticket.posted_by,
            payment_method: cineswap_core::types::PaymentMethod::GooglePay,
            amount: ticket.total_price().unwrap(),
            transaction_date: now,
        };
        let record = PurchaseRecord {
            transaction_id: transaction.id,
            ticket_id: ticket.id,
            purchased_at: now,
        };

        let mut batch = WriteBatch::new();
        batch.mark_sold(ticket.id, TicketStatus::Available);
        batch.append_transaction(transaction);
        batch.append_purchase_record(buyer, record);
        store.commit(batch).await.unwrap();

        let purchased = store.shared.read().unwrap().snapshot(TicketQuery::PurchasedBy(buyer));
        assert_eq!(purchased.len(), 1);
        assert_eq!(purchased[0].id, ticket.id);
        assert!(purchased[0].status.is_sold());
    }
}
