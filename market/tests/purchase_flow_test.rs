//! Purchase flow integration tests.
//!
//! Exercises the full coordinator path against the in-memory store: the
//! canonical success scenario, every precondition rejection, and the
//! all-or-nothing behavior of a failed commit.
//!
//! Run with: `cargo test --test purchase_flow_test`

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use cineswap_core::environment::Clock;
use cineswap_core::store::{
    BatchCommit, LiveTickets, MarketStore, StoreError, TicketQuery, TicketStore,
    TicketSubscription, TransactionLedger, WriteBatch,
};
use cineswap_core::types::{
    Money, PaymentMethod, PurchaseRecord, Ticket, TicketId, TicketStatus, Transaction,
    TransactionId, UserId, UserProfile,
};
use cineswap_market::{PurchaseCoordinator, PurchaseError};
use cineswap_store::MemoryStore;
use cineswap_testing::fixtures::{available_ticket, buyer, seller};
use cineswap_testing::test_clock;
use cineswap_market::payment::MockPaymentGateway;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

fn setup() -> (Arc<MemoryStore>, PurchaseCoordinator) {
    let store = MemoryStore::shared();
    let market: Arc<dyn MarketStore> = store.clone();
    let coordinator = PurchaseCoordinator::new(
        market,
        Arc::new(MockPaymentGateway::with_delay(Duration::ZERO)),
        Arc::new(test_clock()),
    );
    (store, coordinator)
}

#[tokio::test]
async fn successful_purchase_commits_all_three_records() {
    let (store, coordinator) = setup();

    let ticket = available_ticket(seller());
    store.insert_ticket(ticket.clone()).unwrap();
    let purchaser = buyer();

    let outcome = coordinator
        .purchase(Some(&purchaser), &ticket, PaymentMethod::Card)
        .await
        .unwrap();

    // Ticket flipped exactly once.
    assert_eq!(outcome.ticket.status, TicketStatus::Sold);
    assert_eq!(outcome.amount, Money::from_rupees(30));

    // Exactly one transaction, consistent with the snapshot.
    let transaction = store.get_transaction(outcome.transaction_id).await.unwrap();
    assert_eq!(transaction.ticket_id, ticket.id);
    assert_eq!(transaction.buyer_id, purchaser.id);
    assert_eq!(transaction.seller_id, ticket.posted_by);
    assert_eq!(transaction.amount, Money::from_rupees(30));
    assert_eq!(transaction.payment_method, PaymentMethod::Card);
    assert_eq!(transaction.transaction_date, test_clock().now());

    // One purchase record under the buyer's scope, referencing it.
    let records = store.list_by_buyer(purchaser.id).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].transaction_id, outcome.transaction_id);
    assert_eq!(records[0].ticket_id, ticket.id);
    assert_eq!(records[0].purchased_at, transaction.transaction_date);
}

#[tokio::test]
async fn purchase_history_resolves_full_details() {
    let (store, coordinator) = setup();

    let ticket = available_ticket(seller());
    store.insert_ticket(ticket.clone()).unwrap();
    let purchaser = buyer();

    let outcome = coordinator
        .purchase(Some(&purchaser), &ticket, PaymentMethod::Upi)
        .await
        .unwrap();

    let history = coordinator.purchased_tickets(purchaser.id).await.unwrap();
    assert_eq!(history.len(), 1);
    let (transaction, purchased) = &history[0];
    assert_eq!(transaction.id, outcome.transaction_id);
    assert_eq!(purchased.id, ticket.id);
    assert!(purchased.status.is_sold());
}

#[tokio::test]
async fn unauthenticated_buyer_is_rejected_before_any_write() {
    let (store, coordinator) = setup();

    let ticket = available_ticket(seller());
    store.insert_ticket(ticket.clone()).unwrap();
    let before = store.revision().unwrap();

    let err = coordinator
        .purchase(None, &ticket, PaymentMethod::GooglePay)
        .await
        .unwrap_err();

    assert_eq!(err, PurchaseError::Unauthenticated);
    assert_eq!(store.revision().unwrap(), before);
}

#[tokio::test]
async fn self_purchase_is_rejected_before_any_write() {
    let (store, coordinator) = setup();

    let owner = seller();
    let ticket = available_ticket(owner);
    store.insert_ticket(ticket.clone()).unwrap();
    let before = store.revision().unwrap();

    let as_buyer = UserProfile::anonymous(owner);
    let err = coordinator
        .purchase(Some(&as_buyer), &ticket, PaymentMethod::Card)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        PurchaseError::SelfPurchaseRejected {
            buyer_id: owner,
            ticket_id: ticket.id,
        }
    );
    assert_eq!(store.revision().unwrap(), before);
    assert!(store.get(ticket.id).await.unwrap().is_available());
    assert_eq!(store.transaction_count_for(ticket.id).unwrap(), 0);
}

#[tokio::test]
async fn stale_sold_snapshot_short_circuits() {
    let (store, coordinator) = setup();

    let ticket = available_ticket(seller());
    store.insert_ticket(ticket.clone()).unwrap();
    store.mark_sold(ticket.id).await.unwrap();

    // The buyer's dialog still shows the old snapshot.
    let err = coordinator
        .purchase(Some(&buyer()), &ticket, PaymentMethod::Card)
        .await
        .unwrap_err();
    // Snapshot was stale but still claimed available; the CAS caught it.
    assert_eq!(
        err,
        PurchaseError::TicketAlreadySold {
            ticket_id: ticket.id
        }
    );
    assert_eq!(store.transaction_count_for(ticket.id).unwrap(), 0);
}

#[tokio::test]
async fn unknown_ticket_aborts_the_purchase() {
    let (store, coordinator) = setup();

    // Snapshot of a listing that was never stored.
    let ticket = available_ticket(seller());
    let err = coordinator
        .purchase(Some(&buyer()), &ticket, PaymentMethod::Upi)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        PurchaseError::TicketNotFound {
            ticket_id: ticket.id
        }
    );
    assert_eq!(store.revision().unwrap(), 0);
}

#[tokio::test]
async fn commit_failure_is_atomic_and_retryable() {
    let (store, coordinator) = setup();

    let ticket = available_ticket(seller());
    store.insert_ticket(ticket.clone()).unwrap();
    let purchaser = buyer();

    store.fail_next_commit();
    let err = coordinator
        .purchase(Some(&purchaser), &ticket, PaymentMethod::Card)
        .await
        .unwrap_err();

    assert!(matches!(err, PurchaseError::CommitFailure { .. }));
    assert!(err.is_retryable());

    // Nothing from the failed attempt is observable.
    assert!(store.get(ticket.id).await.unwrap().is_available());
    assert_eq!(store.transaction_count_for(ticket.id).unwrap(), 0);
    assert!(store.list_by_buyer(purchaser.id).await.unwrap().is_empty());

    // The retry succeeds from the same snapshot.
    let outcome = coordinator
        .purchase(Some(&purchaser), &ticket, PaymentMethod::Card)
        .await
        .unwrap();
    assert!(outcome.ticket.status.is_sold());
    assert_eq!(store.transaction_count_for(ticket.id).unwrap(), 1);
}

#[tokio::test]
async fn amount_is_captured_from_the_snapshot() {
    let (store, coordinator) = setup();

    let owner = seller();
    let ticket = cineswap_testing::fixtures::priced_ticket(owner, Money::from_paise(1250), 3);
    store.insert_ticket(ticket.clone()).unwrap();

    let outcome = coordinator
        .purchase(Some(&buyer()), &ticket, PaymentMethod::GooglePay)
        .await
        .unwrap();

    // 12.50 × 3 = 37.50, paise-exact.
    assert_eq!(outcome.amount, Money::from_paise(3750));
}

#[tokio::test]
async fn overflowing_amount_is_rejected_without_payment() {
    let (store, coordinator) = setup();

    let owner = seller();
    let ticket =
        cineswap_testing::fixtures::priced_ticket(owner, Money::from_paise(u64::MAX), 2);
    store.insert_ticket(ticket.clone()).unwrap();

    let err = coordinator
        .purchase(Some(&buyer()), &ticket, PaymentMethod::Card)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        PurchaseError::AmountOverflow {
            ticket_id: ticket.id
        }
    );
    assert!(store.get(ticket.id).await.unwrap().is_available());
}

#[tokio::test]
async fn ledger_rejects_second_transaction_for_a_ticket() {
    let (store, coordinator) = setup();

    let ticket = available_ticket(seller());
    store.insert_ticket(ticket.clone()).unwrap();

    coordinator
        .purchase(Some(&buyer()), &ticket, PaymentMethod::Card)
        .await
        .unwrap();

    // Even a direct ledger append cannot create a second receipt.
    let again = cineswap_core::types::Transaction {
        id: cineswap_core::types::TransactionId::new(),
        ticket_id: ticket.id,
        buyer_id: buyer().id,
        seller_id: ticket.posted_by,
        payment_method: PaymentMethod::Upi,
        amount: Money::from_rupees(30),
        transaction_date: test_clock().now(),
    };
    let record = cineswap_core::types::PurchaseRecord {
        transaction_id: again.id,
        ticket_id: ticket.id,
        purchased_at: again.transaction_date,
    };
    let err = store.record_sale(again, record).await.unwrap_err();
    assert_eq!(
        err,
        StoreError::DuplicateTransaction {
            ticket_id: ticket.id
        }
    );
}

/// Store whose point reads always fail while writes go through, standing in
/// for a backend that commits durably but drops the follow-up read.
struct FlakyReadStore {
    inner: Arc<MemoryStore>,
}

impl TicketStore for FlakyReadStore {
    fn list_available(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Ticket>, StoreError>> + Send + '_>> {
        self.inner.list_available()
    }

    fn get(
        &self,
        _ticket_id: TicketId,
    ) -> Pin<Box<dyn Future<Output = Result<Ticket, StoreError>> + Send + '_>> {
        Box::pin(async { Err(StoreError::Backend("read replica unavailable".into())) })
    }

    fn list_by_owner(
        &self,
        owner_id: UserId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Ticket>, StoreError>> + Send + '_>> {
        self.inner.list_by_owner(owner_id)
    }

    fn mark_sold(
        &self,
        ticket_id: TicketId,
    ) -> Pin<Box<dyn Future<Output = Result<Ticket, StoreError>> + Send + '_>> {
        self.inner.mark_sold(ticket_id)
    }
}

impl TransactionLedger for FlakyReadStore {
    fn record_sale(
        &self,
        transaction: Transaction,
        record: PurchaseRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>> {
        self.inner.record_sale(transaction, record)
    }

    fn list_by_buyer(
        &self,
        buyer_id: UserId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PurchaseRecord>, StoreError>> + Send + '_>> {
        self.inner.list_by_buyer(buyer_id)
    }

    fn get_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> Pin<Box<dyn Future<Output = Result<Transaction, StoreError>> + Send + '_>> {
        self.inner.get_transaction(transaction_id)
    }
}

impl BatchCommit for FlakyReadStore {
    fn commit(
        &self,
        batch: WriteBatch,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>> {
        self.inner.commit(batch)
    }
}

impl LiveTickets for FlakyReadStore {
    fn subscribe(
        &self,
        query: TicketQuery,
    ) -> Pin<Box<dyn Future<Output = Result<TicketSubscription, StoreError>> + Send + '_>> {
        self.inner.subscribe(query)
    }
}

#[tokio::test]
async fn committed_purchase_survives_a_failing_read_path() {
    let store = MemoryStore::shared();
    let flaky: Arc<dyn MarketStore> = Arc::new(FlakyReadStore {
        inner: store.clone(),
    });
    let coordinator = PurchaseCoordinator::new(
        flaky,
        Arc::new(MockPaymentGateway::with_delay(Duration::ZERO)),
        Arc::new(test_clock()),
    );

    let ticket = available_ticket(seller());
    store.insert_ticket(ticket.clone()).unwrap();
    let purchaser = buyer();

    // The commit landed, so the buyer must see success even though every
    // point read against this store fails.
    let outcome = coordinator
        .purchase(Some(&purchaser), &ticket, PaymentMethod::Upi)
        .await
        .unwrap();
    assert_eq!(
        outcome.ticket,
        Ticket {
            status: TicketStatus::Sold,
            ..ticket.clone()
        }
    );
    assert_eq!(store.transaction_count_for(ticket.id).unwrap(), 1);
    assert!(store.get(ticket.id).await.unwrap().status.is_sold());
}
