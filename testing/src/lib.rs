//! # CineSwap Testing
//!
//! Testing utilities and fixtures for the CineSwap marketplace.
//!
//! This crate provides:
//! - A fixed clock for deterministic commit timestamps
//! - Ticket and user fixtures shared by the store and market test suites
//!
//! ## Example
//!
//! ```
//! use cineswap_testing::{fixtures, test_clock};
//! use cineswap_core::environment::Clock;
//!
//! let clock = test_clock();
//! let ticket = fixtures::available_ticket(fixtures::seller());
//! assert!(ticket.is_available());
//! assert_eq!(clock.now(), clock.now());
//! ```

use chrono::{DateTime, Utc};
use cineswap_core::environment::Clock;

/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making commit timestamps reproducible.
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Ticket and user fixtures.
pub mod fixtures {
    use chrono::{Duration, Utc};
    use cineswap_core::types::{Money, Ticket, TicketId, TicketStatus, UserId, UserProfile};

    /// A seller id, fresh per call
    #[must_use]
    pub fn seller() -> UserId {
        UserId::new()
    }

    /// A buyer profile, fresh per call
    #[must_use]
    pub fn buyer() -> UserProfile {
        UserProfile {
            id: UserId::new(),
            name: Some("Asha Rao".to_string()),
            email: Some("asha@example.com".to_string()),
        }
    }

    /// An available two-seat listing at ₹15.00 per ticket
    ///
    /// Matches the canonical purchase scenario: total price ₹30.00.
    #[must_use]
    pub fn available_ticket(posted_by: UserId) -> Ticket {
        Ticket {
            id: TicketId::new(),
            movie_name: "Interstellar".to_string(),
            theater_name: "PVR Phoenix".to_string(),
            location: "Lower Parel, Mumbai".to_string(),
            show_time: Utc::now() + Duration::days(2),
            ticket_count: 2,
            price_per_ticket: Money::from_rupees(15),
            poster_url: "https://images.example.com/posters/interstellar.jpg".to_string(),
            image_hint: Some("space film poster".to_string()),
            posted_by,
            status: TicketStatus::Available,
        }
    }

    /// An available listing with a chosen price and seat count
    #[must_use]
    pub fn priced_ticket(posted_by: UserId, price: Money, count: u32) -> Ticket {
        Ticket {
            ticket_count: count,
            price_per_ticket: price,
            ..available_ticket(posted_by)
        }
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[test]
    fn fixture_total_price() {
        let ticket = fixtures::available_ticket(fixtures::seller());
        assert_eq!(
            ticket.total_price(),
            Some(cineswap_core::types::Money::from_rupees(30))
        );
    }
}
