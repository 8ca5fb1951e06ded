//! # CineSwap Core
//!
//! Domain types, store traits, and errors for the CineSwap peer-to-peer
//! movie-ticket resale marketplace.
//!
//! ## Core Concepts
//!
//! - **Ticket**: a saleable listing with a one-way lifecycle
//!   (`available → sold`)
//! - **Transaction**: an immutable receipt, exactly one per sold ticket
//! - **Purchase Record**: a per-buyer pointer to a transaction, written in
//!   the same atomic unit
//! - **Write Batch**: an all-or-nothing multi-document commit carrying the
//!   compare-and-swap guard that prevents double-sale
//! - **Live Query**: a standing query pushing fresh snapshots on change
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   subscribe    ┌──────────────────────────────┐
//! │   Viewers    │◄───────────────│  Ticket Store + Ledger       │
//! └──────────────┘   snapshots    │  (document database)         │
//!                                 └──────────────▲───────────────┘
//! ┌──────────────┐                               │ one atomic batch:
//! │    Buyer     │──── purchase ────────────────►│ CAS status flip
//! └──────────────┘   (coordinator, `market`)     │ + transaction
//!                                                │ + purchase record
//! ```
//!
//! The traits in [`store`] are implemented by `cineswap-store`'s in-memory
//! document store; the purchase protocol lives in `cineswap-market`.

pub mod environment;
pub mod store;
pub mod types;

pub use environment::{Clock, SystemClock};
pub use store::{
    BatchCommit, LiveTickets, MarketStore, StoreError, TicketQuery, TicketStore,
    TicketSubscription, TransactionLedger, WriteBatch, WriteOp,
};
pub use types::{
    Money, PaymentMethod, PurchaseRecord, Ticket, TicketId, TicketStatus, Transaction,
    TransactionId, UserId, UserProfile,
};
