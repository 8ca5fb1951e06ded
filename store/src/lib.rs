//! # CineSwap Store
//!
//! In-memory implementation of the marketplace store traits.
//!
//! This crate stands in for the external document database collaborator.
//! It implements all four capabilities from `cineswap-core`:
//!
//! - [`TicketStore`](cineswap_core::store::TicketStore) — listing reads and
//!   the conditional sold flip
//! - [`TransactionLedger`](cineswap_core::store::TransactionLedger) —
//!   append-only receipts and per-buyer purchase records
//! - [`BatchCommit`](cineswap_core::store::BatchCommit) — all-or-nothing
//!   multi-document batches
//! - [`LiveTickets`](cineswap_core::store::LiveTickets) — standing queries
//!   with snapshot-on-change delivery
//!
//! A production deployment would swap this for a store backed by a real
//! document database with the same contract (conditional updates, atomic
//! batch writes, live queries).

pub mod memory;

pub use memory::MemoryStore;
