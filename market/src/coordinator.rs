//! Purchase transaction coordinator.
//!
//! Orchestrates the atomic state transition that happens when a buyer
//! confirms a purchase: conditionally flip the ticket to sold, append the
//! transaction receipt, and append the buyer's purchase record, all in one
//! write batch, so either every record lands or none does.
//!
//! **Concurrency strategy**: no locks are taken here. The compare-and-swap
//! carried by the `MarkSold` op is the only cross-client coordination; when
//! two buyers race for the same ticket, exactly one batch validates and the
//! loser gets [`PurchaseError::TicketAlreadySold`].

use crate::activity::{
    ActivityEntry, ActivityLog, TracingActivityLog, UserAction, record_best_effort,
};
use crate::error::PurchaseError;
use crate::payment::PaymentGateway;
use cineswap_core::environment::Clock;
use cineswap_core::store::{MarketStore, StoreError, WriteBatch};
use cineswap_core::types::{
    Money, PaymentMethod, PurchaseRecord, Ticket, TicketStatus, Transaction, TransactionId,
    UserId, UserProfile,
};
use std::sync::Arc;

/// Result of a successful purchase commit.
///
/// Handed back to the initiating client, which applies it to its local
/// overlay immediately instead of waiting for the subscription round-trip.
#[derive(Clone, Debug, PartialEq)]
pub struct PurchaseOutcome {
    /// The ticket after the commit (status = sold).
    pub ticket: Ticket,
    /// The newly created transaction.
    pub transaction_id: TransactionId,
    /// The amount charged (price per ticket × ticket count).
    pub amount: Money,
}

/// Coordinates the atomic purchase transaction.
pub struct PurchaseCoordinator {
    store: Arc<dyn MarketStore>,
    gateway: Arc<dyn PaymentGateway>,
    clock: Arc<dyn Clock>,
    activity: Arc<dyn ActivityLog>,
}

impl PurchaseCoordinator {
    /// Creates a coordinator over a store, payment gateway, and clock
    #[must_use]
    pub fn new(
        store: Arc<dyn MarketStore>,
        gateway: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            gateway,
            clock,
            activity: Arc::new(TracingActivityLog),
        }
    }

    /// Replaces the best-effort activity sink
    #[must_use]
    pub fn with_activity_log(mut self, activity: Arc<dyn ActivityLog>) -> Self {
        self.activity = activity;
        self
    }

    /// Execute a purchase for the given buyer against a ticket snapshot.
    ///
    /// `snapshot` is the ticket as the buyer saw it when opening the
    /// purchase dialog. The seller id and the amount are captured from this
    /// snapshot (not re-read at commit time), which is safe because the
    /// conditional update rejects the whole batch if the ticket changed
    /// underneath.
    ///
    /// Once the commit is issued it runs to success or failure; there is no
    /// cancellation point past the payment step, and nothing is written
    /// before the commit.
    ///
    /// # Errors
    ///
    /// - [`PurchaseError::Unauthenticated`]: `buyer` is `None`
    /// - [`PurchaseError::SelfPurchaseRejected`]: buyer posted this ticket
    /// - [`PurchaseError::TicketAlreadySold`]: the snapshot was already
    ///   sold, or another buyer's commit won the race
    /// - [`PurchaseError::TicketNotFound`]: the ticket no longer resolves
    /// - [`PurchaseError::AmountOverflow`]: total price overflows
    /// - [`PurchaseError::CommitFailure`]: gateway or storage fault; safe
    ///   to retry, nothing was committed
    pub async fn purchase(
        &self,
        buyer: Option<&UserProfile>,
        snapshot: &Ticket,
        payment_method: PaymentMethod,
    ) -> Result<PurchaseOutcome, PurchaseError> {
        let buyer = buyer.ok_or(PurchaseError::Unauthenticated)?;

        if buyer.id == snapshot.posted_by {
            tracing::info!(
                ticket_id = %snapshot.id,
                buyer_id = %buyer.id,
                "self-purchase rejected"
            );
            return Err(PurchaseError::SelfPurchaseRejected {
                buyer_id: buyer.id,
                ticket_id: snapshot.id,
            });
        }

        // A stale view may still open the dialog; this is only a courtesy
        // short-circuit. The authoritative check is the conditional update
        // inside the commit.
        if !snapshot.is_available() {
            return Err(PurchaseError::TicketAlreadySold {
                ticket_id: snapshot.id,
            });
        }

        let amount = snapshot
            .total_price()
            .ok_or(PurchaseError::AmountOverflow {
                ticket_id: snapshot.id,
            })?;

        // Mock payment step. Nothing has been written yet, so a gateway
        // fault is reported as a retryable commit failure.
        self.gateway
            .process_payment(amount, payment_method)
            .await
            .map_err(|e| PurchaseError::CommitFailure {
                source: StoreError::Backend(format!("payment gateway: {e}")),
            })?;

        let now = self.clock.now();
        let transaction = Transaction {
            id: TransactionId::new(),
            ticket_id: snapshot.id,
            buyer_id: buyer.id,
            seller_id: snapshot.posted_by,
            payment_method,
            amount,
            transaction_date: now,
        };
        let transaction_id = transaction.id;
        let record = PurchaseRecord {
            transaction_id,
            ticket_id: snapshot.id,
            purchased_at: now,
        };

        // The single critical suspension point: one batch, all-or-nothing.
        let mut batch = WriteBatch::new();
        batch.mark_sold(snapshot.id, TicketStatus::Available);
        batch.append_transaction(transaction);
        batch.append_purchase_record(buyer.id, record);
        self.store.commit(batch).await?;

        // The accepted CAS proves the snapshot was current at commit time,
        // so the post-commit ticket is the snapshot with its status
        // flipped. No re-read: a transient read fault here would report a
        // committed sale as failed.
        let ticket = Ticket {
            status: TicketStatus::Sold,
            ..snapshot.clone()
        };

        tracing::info!(
            ticket_id = %snapshot.id,
            buyer_id = %buyer.id,
            seller_id = %snapshot.posted_by,
            transaction_id = %transaction_id,
            amount = %amount,
            method = %payment_method,
            "purchase committed"
        );

        record_best_effort(
            &*self.activity,
            ActivityEntry {
                user_id: buyer.id,
                action: UserAction::Purchase,
                timestamp: now,
            },
        )
        .await;

        Ok(PurchaseOutcome {
            ticket,
            transaction_id,
            amount,
        })
    }

    /// Resolve a buyer's purchase history: each purchase record followed up
    /// to its transaction and ticket.
    ///
    /// Records whose ticket or transaction no longer resolves are skipped
    /// rather than failing the whole view.
    ///
    /// # Errors
    ///
    /// - `Backend`: the backing store failed
    pub async fn purchased_tickets(
        &self,
        buyer_id: UserId,
    ) -> Result<Vec<(Transaction, Ticket)>, StoreError> {
        let records = self.store.list_by_buyer(buyer_id).await?;
        let mut resolved = Vec::with_capacity(records.len());
        for record in records {
            let transaction = match self.store.get_transaction(record.transaction_id).await {
                Ok(t) => t,
                Err(StoreError::TransactionNotFound(id)) => {
                    tracing::warn!(transaction_id = %id, "dangling purchase record; skipping");
                    continue;
                },
                Err(e) => return Err(e),
            };
            let ticket = match self.store.get(record.ticket_id).await {
                Ok(t) => t,
                Err(StoreError::TicketNotFound(id)) => {
                    tracing::warn!(ticket_id = %id, "purchased ticket missing; skipping");
                    continue;
                },
                Err(e) => return Err(e),
            };
            resolved.push((transaction, ticket));
        }
        Ok(resolved)
    }
}

impl std::fmt::Debug for PurchaseCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PurchaseCoordinator").finish_non_exhaustive()
    }
}
