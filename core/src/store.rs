//! Store traits and related types for the marketplace.
//!
//! This module defines the core abstraction over the document database
//! collaborator: typed access to ticket listings (the ticket store), the
//! append-only sale ledger, atomic multi-document write batches, and live
//! query subscriptions.
//!
//! # Design
//!
//! The traits are deliberately minimal and focused. Together they provide
//! exactly what the purchase protocol needs:
//!
//! - Conditional (compare-and-swap) updates on ticket status
//! - All-or-nothing batches spanning ticket, transaction, and purchase record
//! - Standing queries that push a fresh snapshot on every committed change
//!
//! There is intentionally **no** unconditional write path to
//! `Ticket::status`: the only way to flip a ticket to sold is a
//! [`WriteOp::MarkSold`] op, which carries its expected-status guard. Any
//! other path would break the no-double-sale invariant.
//!
//! # Dyn Compatibility
//!
//! These traits use explicit `Pin<Box<dyn Future>>` returns instead of
//! `async fn` to enable trait object usage (`Arc<dyn MarketStore>`), which
//! the purchase coordinator relies on.

use crate::types::{
    PurchaseRecord, Ticket, TicketId, TicketStatus, Transaction, TransactionId, UserId,
};
use futures::stream::BoxStream;
use smallvec::SmallVec;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Optimistic concurrency conflict: the ticket's status did not match
    /// the expected status at commit time.
    ///
    /// This is the double-sale guard firing: another buyer's commit won the
    /// race, or the ticket was already sold when the batch was validated.
    #[error("conflict on ticket {ticket_id}: expected status {expected}, found {actual}")]
    Conflict {
        /// The ticket where the conflict occurred.
        ticket_id: TicketId,
        /// The status the write expected the ticket to be in.
        expected: TicketStatus,
        /// The actual current status of the ticket.
        actual: TicketStatus,
    },

    /// A referenced ticket does not exist in the store.
    #[error("ticket not found: {0}")]
    TicketNotFound(TicketId),

    /// A referenced transaction does not exist in the ledger.
    #[error("transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    /// A transaction already exists for this ticket.
    ///
    /// The ledger is append-only and holds at most one transaction per
    /// ticket; a second append for the same ticket is rejected outright.
    #[error("transaction already recorded for ticket {ticket_id}")]
    DuplicateTransaction {
        /// The ticket that already has a transaction.
        ticket_id: TicketId,
    },

    /// A listing creation request was rejected.
    ///
    /// The core does not validate business fields, but it does require new
    /// listings to arrive with status available, a positive ticket count,
    /// and an owner id.
    #[error("invalid listing: {reason}")]
    InvalidListing {
        /// Why the listing was rejected.
        reason: String,
    },

    /// The backing store failed for storage or connectivity reasons.
    ///
    /// Nothing from the failed batch is durably visible, so the operation
    /// is safe to retry.
    #[error("storage backend error: {0}")]
    Backend(String),
}

// ============================================================================
// Write Batches
// ============================================================================

/// A single write in an atomic batch.
#[derive(Clone, Debug, PartialEq)]
pub enum WriteOp {
    /// Conditionally flip a ticket's status to [`TicketStatus::Sold`].
    ///
    /// Fails the whole batch with [`StoreError::Conflict`] unless the
    /// ticket's current status equals `expected` at commit time.
    MarkSold {
        /// The ticket to update.
        ticket_id: TicketId,
        /// The status the ticket must currently be in.
        expected: TicketStatus,
    },
    /// Append a transaction receipt to the ledger.
    AppendTransaction(Transaction),
    /// Append a purchase record under a buyer's scope.
    AppendPurchaseRecord {
        /// The buyer whose history the record belongs to.
        buyer_id: UserId,
        /// The record to append.
        record: PurchaseRecord,
    },
}

/// An atomic multi-document write batch.
///
/// All ops in a batch apply together or not at all. A completed sale is
/// exactly three ops (status flip, transaction, purchase record), which is
/// why the inline capacity is three.
///
/// # Example
///
/// ```
/// use cineswap_core::store::WriteBatch;
/// use cineswap_core::types::{TicketId, TicketStatus};
///
/// let mut batch = WriteBatch::new();
/// batch.mark_sold(TicketId::new(), TicketStatus::Available);
/// assert_eq!(batch.len(), 1);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WriteBatch {
    ops: SmallVec<[WriteOp; 3]>,
}

impl WriteBatch {
    /// Creates an empty batch
    #[must_use]
    pub fn new() -> Self {
        Self {
            ops: SmallVec::new(),
        }
    }

    /// Stage a conditional status flip for a ticket
    pub fn mark_sold(&mut self, ticket_id: TicketId, expected: TicketStatus) {
        self.ops.push(WriteOp::MarkSold {
            ticket_id,
            expected,
        });
    }

    /// Stage a transaction append
    pub fn append_transaction(&mut self, transaction: Transaction) {
        self.ops.push(WriteOp::AppendTransaction(transaction));
    }

    /// Stage a purchase-record append under `buyer_id`
    pub fn append_purchase_record(&mut self, buyer_id: UserId, record: PurchaseRecord) {
        self.ops.push(WriteOp::AppendPurchaseRecord { buyer_id, record });
    }

    /// Number of staged ops
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether the batch has no staged ops
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// The staged ops, in staging order
    #[must_use]
    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }
}

impl IntoIterator for WriteBatch {
    type Item = WriteOp;
    type IntoIter = smallvec::IntoIter<[WriteOp; 3]>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

// ============================================================================
// Live Queries
// ============================================================================

/// Query dimensions supported by the live view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TicketQuery {
    /// All tickets with status [`TicketStatus::Available`].
    Available,
    /// Tickets posted by a given user, any status.
    OwnedBy(UserId),
    /// Tickets referenced by a given buyer's purchase records.
    PurchasedBy(UserId),
    /// A single ticket by id (zero-or-one element snapshots).
    ById(TicketId),
}

/// A standing query over the ticket store.
///
/// Produced by [`LiveTickets::subscribe`]. Carries the snapshot taken at
/// subscription time plus a stream of fresh snapshots, one per observed
/// store change (intermediate changes may be coalesced). For any given
/// ticket, snapshots are monotone in sold-ness: a ticket is never observed
/// to un-sell.
///
/// Dropping the subscription releases all resources and stops delivery.
pub struct TicketSubscription {
    initial: Vec<Ticket>,
    changes: BoxStream<'static, Vec<Ticket>>,
}

impl TicketSubscription {
    /// Creates a subscription from an initial snapshot and a change stream
    #[must_use]
    pub fn new(initial: Vec<Ticket>, changes: BoxStream<'static, Vec<Ticket>>) -> Self {
        Self { initial, changes }
    }

    /// The snapshot taken at subscription time
    #[must_use]
    pub fn initial(&self) -> &[Ticket] {
        &self.initial
    }

    /// Consumes the subscription, returning the initial snapshot and the
    /// change stream separately
    #[must_use]
    pub fn into_parts(self) -> (Vec<Ticket>, BoxStream<'static, Vec<Ticket>>) {
        (self.initial, self.changes)
    }

    /// Waits for the next snapshot.
    ///
    /// Returns `None` once the underlying store has been dropped and no
    /// further changes can arrive.
    pub async fn next_snapshot(&mut self) -> Option<Vec<Ticket>> {
        use futures::StreamExt;
        self.changes.next().await
    }
}

impl std::fmt::Debug for TicketSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketSubscription")
            .field("initial", &self.initial)
            .field("changes", &"<stream>")
            .finish()
    }
}

// ============================================================================
// Store Traits
// ============================================================================

/// Durable storage and retrieval of ticket listings.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to be safely shared across
/// browsing and purchasing tasks.
pub trait TicketStore: Send + Sync {
    /// The current set of tickets with status [`TicketStatus::Available`].
    ///
    /// # Errors
    ///
    /// - `Backend`: the backing store failed
    fn list_available(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Ticket>, StoreError>> + Send + '_>>;

    /// Look up a single ticket by id.
    ///
    /// # Errors
    ///
    /// - `TicketNotFound`: no ticket with this id exists
    /// - `Backend`: the backing store failed
    fn get(
        &self,
        ticket_id: TicketId,
    ) -> Pin<Box<dyn Future<Output = Result<Ticket, StoreError>> + Send + '_>>;

    /// Tickets posted by a given user, any status.
    ///
    /// # Errors
    ///
    /// - `Backend`: the backing store failed
    fn list_by_owner(
        &self,
        owner_id: UserId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Ticket>, StoreError>> + Send + '_>>;

    /// Conditionally flip a ticket from available to sold.
    ///
    /// Convenience for a one-op batch; the purchase coordinator stages the
    /// same op inside its three-op commit instead.
    ///
    /// # Errors
    ///
    /// - `Conflict`: the ticket is no longer available
    /// - `TicketNotFound`: no ticket with this id exists
    /// - `Backend`: the backing store failed
    fn mark_sold(
        &self,
        ticket_id: TicketId,
    ) -> Pin<Box<dyn Future<Output = Result<Ticket, StoreError>> + Send + '_>>;
}

/// Append-only storage of transactions and per-buyer purchase records.
///
/// No update or delete operations are exposed; the ledger is append-only
/// by contract.
pub trait TransactionLedger: Send + Sync {
    /// Append a transaction and its purchase record as one atomic unit.
    ///
    /// The ledger does not re-verify ticket state; callers that need the
    /// status flip in the same unit stage everything in one batch via
    /// [`BatchCommit::commit`] instead.
    ///
    /// # Errors
    ///
    /// - `DuplicateTransaction`: the ticket already has a transaction
    /// - `Backend`: the backing store failed
    fn record_sale(
        &self,
        transaction: Transaction,
        record: PurchaseRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>>;

    /// Purchase records for a buyer, in append order.
    ///
    /// # Errors
    ///
    /// - `Backend`: the backing store failed
    fn list_by_buyer(
        &self,
        buyer_id: UserId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PurchaseRecord>, StoreError>> + Send + '_>>;

    /// Resolve a transaction receipt by id.
    ///
    /// # Errors
    ///
    /// - `TransactionNotFound`: no transaction with this id exists
    /// - `Backend`: the backing store failed
    fn get_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> Pin<Box<dyn Future<Output = Result<Transaction, StoreError>> + Send + '_>>;
}

/// Atomic multi-document commit.
pub trait BatchCommit: Send + Sync {
    /// Apply a write batch all-or-nothing.
    ///
    /// Every op is validated against current state before any op is
    /// applied; on any failure (including an injected backend fault) no op
    /// from the batch is durably visible.
    ///
    /// # Errors
    ///
    /// - `Conflict`: a `MarkSold` op's expected status did not match
    /// - `TicketNotFound`: a `MarkSold` op referenced a missing ticket
    /// - `DuplicateTransaction`: an `AppendTransaction` op's ticket already
    ///   has a transaction
    /// - `Backend`: the backing store failed
    fn commit(
        &self,
        batch: WriteBatch,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>>;
}

/// Live query subscriptions over the ticket store.
pub trait LiveTickets: Send + Sync {
    /// Open a standing query: an immediate snapshot plus a stream of fresh
    /// snapshots delivered on every committed change.
    ///
    /// # Errors
    ///
    /// - `Backend`: the backing store failed while taking the initial
    ///   snapshot
    fn subscribe(
        &self,
        query: TicketQuery,
    ) -> Pin<Box<dyn Future<Output = Result<TicketSubscription, StoreError>> + Send + '_>>;
}

/// Umbrella trait for a full marketplace store.
///
/// Blanket-implemented for anything that provides all four capabilities,
/// so callers can hold a single `Arc<dyn MarketStore>`.
pub trait MarketStore: TicketStore + TransactionLedger + BatchCommit + LiveTickets {}

impl<T> MarketStore for T where T: TicketStore + TransactionLedger + BatchCommit + LiveTickets {}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn conflict_error_display() {
        let error = StoreError::Conflict {
            ticket_id: TicketId::new(),
            expected: TicketStatus::Available,
            actual: TicketStatus::Sold,
        };

        let display = format!("{error}");
        assert!(display.contains("expected status available"));
        assert!(display.contains("found sold"));
    }

    #[test]
    fn sale_batch_fits_inline() {
        let mut batch = WriteBatch::new();
        batch.mark_sold(TicketId::new(), TicketStatus::Available);
        assert!(!batch.is_empty());
        assert_eq!(batch.len(), 1);
        assert!(matches!(batch.ops()[0], WriteOp::MarkSold { .. }));
    }
}
