//! Listing read model: live subscriptions with a local optimistic overlay.
//!
//! Any number of viewers subscribe to a ticket query and receive a fresh
//! snapshot whenever the store changes. The initiating buyer additionally
//! keeps a *local overlay*: after their own successful purchase, the bought
//! ticket is patched to sold immediately, without waiting for the
//! subscription round-trip. The overlay is merged over each canonical
//! snapshot by a pure function and reconciled away once the canonical data
//! reflects the sale, so the overlay never fights the subscription.

use cineswap_core::store::{LiveTickets, StoreError, TicketQuery, TicketSubscription};
use cineswap_core::types::{Ticket, TicketId};
use std::collections::HashMap;

// ============================================================================
// Local Overlay
// ============================================================================

/// Locally patched tickets, keyed by id.
///
/// Patches only ever move a ticket forward (to sold); there is no way to
/// stage an un-sell, so merged views stay monotone.
#[derive(Clone, Debug, Default)]
pub struct LocalOverlay {
    patches: HashMap<TicketId, Ticket>,
}

impl LocalOverlay {
    /// Creates an empty overlay
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a locally observed sale.
    ///
    /// `ticket` is the post-commit ticket from the purchase outcome; only
    /// sold tickets are accepted as patches.
    pub fn stage_sale(&mut self, ticket: Ticket) {
        debug_assert!(ticket.status.is_sold());
        if ticket.status.is_sold() {
            self.patches.insert(ticket.id, ticket);
        }
    }

    /// Whether any patches are outstanding
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// Drop every patch the canonical snapshot already reflects.
    ///
    /// A patch is spent when the snapshot either no longer contains the
    /// ticket (the query filtered the sold listing out) or contains it at
    /// the patched status or beyond.
    pub fn reconcile(&mut self, canonical: &[Ticket]) {
        self.patches.retain(|id, patch| {
            canonical
                .iter()
                .find(|t| t.id == *id)
                .is_some_and(|t| t.status < patch.status)
        });
    }
}

/// Merge a local overlay over a canonical snapshot.
///
/// Pure function: tickets present in the snapshot are replaced by their
/// patched version when one exists; patches without a matching snapshot
/// entry are not re-added (the canonical view has already moved past them).
#[must_use]
pub fn apply_overlay(canonical: &[Ticket], overlay: &LocalOverlay) -> Vec<Ticket> {
    canonical
        .iter()
        .map(|ticket| {
            overlay
                .patches
                .get(&ticket.id)
                .filter(|patch| patch.status > ticket.status)
                .unwrap_or(ticket)
                .clone()
        })
        .collect()
}

// ============================================================================
// Search
// ============================================================================

/// Case-insensitive substring filter over already-fetched listings.
///
/// Matches against movie name, theater name, and location. An empty query
/// matches everything.
#[must_use]
pub fn search(tickets: &[Ticket], query: &str) -> Vec<Ticket> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return tickets.to_vec();
    }
    tickets
        .iter()
        .filter(|t| {
            t.movie_name.to_lowercase().contains(&needle)
                || t.theater_name.to_lowercase().contains(&needle)
                || t.location.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}

// ============================================================================
// Listing View
// ============================================================================

/// A viewer's live window onto a ticket query.
///
/// Combines the canonical subscription with the viewer's local overlay.
/// Dropping the view unsubscribes.
pub struct ListingView {
    subscription: TicketSubscription,
    canonical: Vec<Ticket>,
    overlay: LocalOverlay,
}

impl ListingView {
    /// Open a view: subscribes and takes the initial snapshot.
    ///
    /// # Errors
    ///
    /// - `Backend`: the store failed while taking the initial snapshot
    pub async fn open<S>(store: &S, query: TicketQuery) -> Result<Self, StoreError>
    where
        S: LiveTickets + ?Sized,
    {
        let subscription = store.subscribe(query).await?;
        let canonical = subscription.initial().to_vec();
        Ok(Self {
            subscription,
            canonical,
            overlay: LocalOverlay::new(),
        })
    }

    /// The merged view: latest canonical snapshot with local patches applied
    #[must_use]
    pub fn tickets(&self) -> Vec<Ticket> {
        apply_overlay(&self.canonical, &self.overlay)
    }

    /// Apply the viewer's own successful purchase immediately.
    ///
    /// Called with the post-commit ticket from the purchase outcome so the
    /// initiating client sees "sold" before the canonical update arrives.
    pub fn apply_local_sale(&mut self, ticket: Ticket) {
        self.overlay.stage_sale(ticket);
    }

    /// Wait for the next canonical snapshot and reconcile the overlay.
    ///
    /// Returns `false` once the underlying subscription has ended.
    pub async fn refresh(&mut self) -> bool {
        match self.subscription.next_snapshot().await {
            Some(snapshot) => {
                self.overlay.reconcile(&snapshot);
                self.canonical = snapshot;
                true
            },
            None => false,
        }
    }
}

impl std::fmt::Debug for ListingView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListingView")
            .field("canonical", &self.canonical)
            .field("overlay", &self.overlay)
            .finish_non_exhaustive()
    }
}
