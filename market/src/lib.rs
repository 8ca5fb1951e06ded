//! # CineSwap Market
//!
//! The purchase transaction protocol for the CineSwap peer-to-peer
//! movie-ticket resale marketplace.
//!
//! # Architecture
//!
//! ```text
//!                    subscribe (read path, always active)
//!  ┌────────────┐ ◄──────────────────────────────────────┐
//!  │  Viewers   │        snapshots on every commit       │
//!  │ (ListingView: canonical + local overlay)            │
//!  └────────────┘                                        │
//!                                              ┌─────────┴─────────┐
//!  ┌────────────┐   purchase(buyer, snapshot)  │  Ticket Store +   │
//!  │   Buyer    │──► PurchaseCoordinator ─────►│  Transaction      │
//!  └────────────┘    1. precondition checks    │  Ledger           │
//!                    2. mock payment delay     │  (MemoryStore)    │
//!                    3. ONE atomic batch:      └───────────────────┘
//!                       CAS status flip
//!                       + transaction
//!                       + purchase record
//! ```
//!
//! # Key guarantees
//!
//! - **No double sale**: the batch carries a compare-and-swap on ticket
//!   status; of N concurrent attempts exactly one commits, the rest fail
//!   with [`PurchaseError::TicketAlreadySold`].
//! - **Atomicity**: the three writes of a sale validate and apply under one
//!   commit; on any failure none of them is visible.
//! - **Monotone visibility**: every subscriber observes a non-decreasing
//!   status per ticket; the initiating buyer's local overlay only ever
//!   patches forward.

pub mod activity;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod live;
pub mod payment;

pub use activity::{ActivityLog, TracingActivityLog, UserAction};
pub use config::Config;
pub use coordinator::{PurchaseCoordinator, PurchaseOutcome};
pub use error::PurchaseError;
pub use live::{ListingView, LocalOverlay, apply_overlay, search};
pub use payment::{MockPaymentGateway, PaymentGateway};
