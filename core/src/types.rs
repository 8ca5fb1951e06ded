//! Domain types for the CineSwap marketplace.
//!
//! This module contains the value objects and entities shared by every layer:
//! identifiers, money, the ticket listing, the transaction receipt, and the
//! per-buyer purchase record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a ticket listing
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TicketId(Uuid);

impl TicketId {
    /// Creates a new random `TicketId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `TicketId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TicketId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a user (seller or buyer)
///
/// Issued by the external identity provider; the core only ever treats it as
/// an opaque, stable identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random `UserId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `UserId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a completed sale transaction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(Uuid);

impl TransactionId {
    /// Creates a new random `TransactionId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `TransactionId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Money Value Object (paise-based to avoid floating point errors)
// ============================================================================

/// Represents money in paise (1/100 rupee) to avoid floating-point errors
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Zero amount
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from paise
    #[must_use]
    pub const fn from_paise(paise: u64) -> Self {
        Self(paise)
    }

    /// Creates a `Money` value from whole rupees with overflow checking
    #[must_use]
    pub const fn checked_from_rupees(rupees: u64) -> Option<Self> {
        match rupees.checked_mul(100) {
            Some(paise) => Some(Self(paise)),
            None => None,
        }
    }

    /// Creates a `Money` value from whole rupees, saturating on overflow
    #[must_use]
    pub const fn from_rupees(rupees: u64) -> Self {
        match rupees.checked_mul(100) {
            Some(paise) => Self(paise),
            None => Self(u64::MAX),
        }
    }

    /// Returns the amount in paise
    #[must_use]
    pub const fn paise(&self) -> u64 {
        self.0
    }

    /// Returns the amount in whole rupees (rounded down)
    #[must_use]
    pub const fn rupees(&self) -> u64 {
        self.0 / 100
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two money amounts with overflow checking
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Multiplies money by a quantity with overflow checking
    #[must_use]
    pub const fn checked_multiply(self, quantity: u32) -> Option<Self> {
        match self.0.checked_mul(quantity as u64) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "₹{}.{:02}", self.rupees(), self.0 % 100)
    }
}

// ============================================================================
// Payment Methods
// ============================================================================

/// Payment methods offered by the purchase dialog
///
/// The set is fixed; the mock gateway accepts all of them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// UPI transfer (PhonePe or any UPI app)
    Upi,
    /// Google Pay
    GooglePay,
    /// Credit or debit card
    Card,
}

impl PaymentMethod {
    /// All methods, in the order the dialog presents them
    pub const ALL: [Self; 3] = [Self::Upi, Self::GooglePay, Self::Card];
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upi => write!(f, "PhonePe / UPI"),
            Self::GooglePay => write!(f, "Google Pay"),
            Self::Card => write!(f, "Credit / Debit Card"),
        }
    }
}

// ============================================================================
// Ticket Listing
// ============================================================================

/// Lifecycle status of a ticket listing
///
/// The ordering is meaningful: `Available < Sold`, and the only legal
/// transition is `Available → Sold` as part of a successful purchase
/// commit. Live-view subscribers therefore observe a non-decreasing
/// status for any given ticket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    /// Listed and purchasable
    Available,
    /// Purchased; a matching transaction exists in the ledger
    Sold,
}

impl TicketStatus {
    /// Whether the ticket has been sold
    #[must_use]
    pub const fn is_sold(self) -> bool {
        matches!(self, Self::Sold)
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available => write!(f, "available"),
            Self::Sold => write!(f, "sold"),
        }
    }
}

/// A saleable ticket listing
///
/// Created by the posting flow with `status = Available`; mutated exactly
/// once, by the purchase coordinator, to `status = Sold`. Business fields
/// (movie name, theater, ...) are opaque to the core beyond display.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    /// Listing identifier (assigned by the store at creation)
    pub id: TicketId,
    /// Movie name
    pub movie_name: String,
    /// Theater name
    pub theater_name: String,
    /// Free-text location
    pub location: String,
    /// Show date and time
    pub show_time: DateTime<Utc>,
    /// Number of tickets in the listing (positive)
    pub ticket_count: u32,
    /// Price per ticket
    pub price_per_ticket: Money,
    /// Poster image URL (opaque; supplied by the external image service)
    pub poster_url: String,
    /// Optional hint describing the poster image
    pub image_hint: Option<String>,
    /// User who posted the listing (the seller)
    pub posted_by: UserId,
    /// Lifecycle status
    pub status: TicketStatus,
}

impl Ticket {
    /// Total price of the listing: price per ticket × ticket count
    ///
    /// Returns `None` if the multiplication would overflow.
    #[must_use]
    pub const fn total_price(&self) -> Option<Money> {
        self.price_per_ticket.checked_multiply(self.ticket_count)
    }

    /// Whether the listing is still purchasable
    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self.status, TicketStatus::Available)
    }
}

// ============================================================================
// Transaction Receipt
// ============================================================================

/// An immutable receipt of a completed sale
///
/// Created once, atomically with the ticket status flip; never mutated or
/// deleted. Exactly one transaction ever exists per sold ticket.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction identifier
    pub id: TransactionId,
    /// The ticket that was sold
    pub ticket_id: TicketId,
    /// The purchasing user
    pub buyer_id: UserId,
    /// The selling user (the ticket's owner at time of sale)
    pub seller_id: UserId,
    /// Payment method the buyer selected
    pub payment_method: PaymentMethod,
    /// Total amount: price per ticket × ticket count, captured at commit
    /// time and never re-derived
    pub amount: Money,
    /// Commit-time timestamp
    pub transaction_date: DateTime<Utc>,
}

/// A per-buyer pointer to a transaction
///
/// Denormalized index entry letting a buyer list "tickets I purchased"
/// without scanning the whole ledger. Written in the same atomic unit as
/// the transaction it references.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    /// The transaction this record points to
    pub transaction_id: TransactionId,
    /// The ticket that was purchased
    pub ticket_id: TicketId,
    /// Purchase timestamp (equals the transaction date)
    pub purchased_at: DateTime<Utc>,
}

// ============================================================================
// Users
// ============================================================================

/// Profile data supplied by the external identity provider
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Stable opaque identifier
    pub id: UserId,
    /// Display name, if the provider has one
    pub name: Option<String>,
    /// Email address, if the provider has one
    pub email: Option<String>,
}

impl UserProfile {
    /// Creates a profile with just an id (name and email unknown)
    #[must_use]
    pub const fn anonymous(id: UserId) -> Self {
        Self {
            id,
            name: None,
            email: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn money_display_uses_paise() {
        let price = Money::from_paise(1550);
        assert_eq!(price.to_string(), "₹15.50");
        assert_eq!(Money::from_rupees(30).to_string(), "₹30.00");
    }

    #[test]
    fn money_checked_multiply_overflow() {
        let max = Money::from_paise(u64::MAX);
        assert_eq!(max.checked_multiply(2), None);
        assert_eq!(
            Money::from_rupees(15).checked_multiply(2),
            Some(Money::from_rupees(30))
        );
    }

    #[test]
    fn status_ordering_is_monotone() {
        assert!(TicketStatus::Available < TicketStatus::Sold);
        assert!(TicketStatus::Sold.is_sold());
        assert!(!TicketStatus::Available.is_sold());
    }

    #[test]
    fn payment_method_labels() {
        assert_eq!(PaymentMethod::Upi.to_string(), "PhonePe / UPI");
        assert_eq!(PaymentMethod::GooglePay.to_string(), "Google Pay");
        assert_eq!(PaymentMethod::Card.to_string(), "Credit / Debit Card");
    }

    #[test]
    fn ticket_status_display_matches_wire_shape() {
        assert_eq!(TicketStatus::Available.to_string(), "available");
        assert_eq!(TicketStatus::Sold.to_string(), "sold");
    }
}
