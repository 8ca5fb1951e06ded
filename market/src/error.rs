//! Purchase failure taxonomy.

use cineswap_core::store::StoreError;
use cineswap_core::types::{TicketId, UserId};
use thiserror::Error;

/// Errors reported by the purchase coordinator.
///
/// All failures are reported synchronously to the immediate caller (the
/// purchase dialog); none are silently swallowed. The dialog keeps the
/// purchase open on retryable failures and disables further attempts on
/// [`PurchaseError::TicketAlreadySold`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PurchaseError {
    /// No buyer identity was present at purchase time.
    ///
    /// Recovered by redirecting to the sign-in flow; not fatal.
    #[error("you must be signed in to purchase a ticket")]
    Unauthenticated,

    /// The buyer is the user who posted the ticket.
    ///
    /// Surfaced to the user; no retry.
    #[error("user {buyer_id} cannot purchase their own ticket {ticket_id}")]
    SelfPurchaseRejected {
        /// The offending buyer (== the ticket's owner).
        buyer_id: UserId,
        /// The ticket they posted.
        ticket_id: TicketId,
    },

    /// Another buyer won the race, or the ticket was already sold.
    ///
    /// Surfaced as "sold out"; the caller refreshes its local view from the
    /// live subscription. Not retried automatically.
    #[error("ticket {ticket_id} is no longer available")]
    TicketAlreadySold {
        /// The ticket that sold out from under the buyer.
        ticket_id: TicketId,
    },

    /// The referenced ticket no longer resolves.
    #[error("ticket {ticket_id} not found")]
    TicketNotFound {
        /// The unresolvable ticket id.
        ticket_id: TicketId,
    },

    /// The listing's total price overflows.
    ///
    /// Pathological (a listing priced near `u64::MAX` paise); rejected
    /// before any payment or store mutation is attempted.
    #[error("total price overflows for ticket {ticket_id}")]
    AmountOverflow {
        /// The offending listing.
        ticket_id: TicketId,
    },

    /// The atomic multi-document commit failed for storage or connectivity
    /// reasons.
    ///
    /// Surfaced as a generic "payment failed, try again". Safe to retry:
    /// no partial state was committed.
    #[error("purchase commit failed: {source}")]
    CommitFailure {
        /// The underlying store fault.
        #[source]
        source: StoreError,
    },
}

impl PurchaseError {
    /// Whether the caller may safely retry the purchase attempt.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::CommitFailure { .. })
    }
}

impl From<StoreError> for PurchaseError {
    /// Map store faults from the commit into the purchase taxonomy.
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Conflict { ticket_id, .. } => Self::TicketAlreadySold { ticket_id },
            StoreError::TicketNotFound(ticket_id) => Self::TicketNotFound { ticket_id },
            StoreError::DuplicateTransaction { ticket_id } => {
                // A duplicate append can only mean the ticket sold already.
                Self::TicketAlreadySold { ticket_id }
            },
            other => Self::CommitFailure { source: other },
        }
    }
}
