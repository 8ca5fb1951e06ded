//! Marketplace demo.
//!
//! Seeds a couple of listings, opens a live view, and races two buyers for
//! the same ticket to show the no-double-sale guarantee end to end.

use chrono::{Duration, Utc};
use cineswap_core::environment::SystemClock;
use cineswap_core::store::{MarketStore, TicketQuery};
use cineswap_core::types::{
    Money, PaymentMethod, Ticket, TicketId, TicketStatus, UserId, UserProfile,
};
use cineswap_market::{Config, ListingView, MockPaymentGateway, PurchaseCoordinator};
use cineswap_store::MemoryStore;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn listing(posted_by: UserId, movie: &str, theater: &str, price_rupees: u64) -> Ticket {
    Ticket {
        id: TicketId::new(),
        movie_name: movie.to_string(),
        theater_name: theater.to_string(),
        location: "Andheri West, Mumbai".to_string(),
        show_time: Utc::now() + Duration::days(3),
        ticket_count: 2,
        price_per_ticket: Money::from_rupees(price_rupees),
        poster_url: format!(
            "https://images.example.com/posters/{}.jpg",
            movie.to_lowercase().replace(' ', "-")
        ),
        image_hint: None,
        posted_by,
        status: TicketStatus::Available,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cineswap=info,cineswap_market=info,cineswap_store=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(payment_delay_ms = config.payment_delay_ms, "Starting CineSwap demo");

    let store = MemoryStore::shared();
    let market: Arc<dyn MarketStore> = store.clone();

    let seller = UserId::new();
    let contested = listing(seller, "Interstellar", "PVR Phoenix", 15);
    let contested_id = contested.id;
    store.insert_ticket(contested.clone())?;
    if config.seed_demo_data {
        store.insert_ticket(listing(seller, "Dune Part Two", "INOX Megaplex", 25))?;
        info!("Seeded extra demo listings");
    }

    // A browsing session watching the available listings.
    let mut view = ListingView::open(&*market, TicketQuery::Available).await?;
    info!(listings = view.tickets().len(), "Live view opened");

    let gateway = Arc::new(MockPaymentGateway::with_delay(config.payment_delay()));
    let coordinator = Arc::new(PurchaseCoordinator::new(
        market.clone(),
        gateway,
        Arc::new(SystemClock),
    ));

    // Two buyers race for the same listing.
    let asha = UserProfile {
        id: UserId::new(),
        name: Some("Asha".to_string()),
        email: Some("asha@example.com".to_string()),
    };
    let vikram = UserProfile {
        id: UserId::new(),
        name: Some("Vikram".to_string()),
        email: Some("vikram@example.com".to_string()),
    };

    let (first, second) = tokio::join!(
        coordinator.purchase(Some(&asha), &contested, PaymentMethod::Upi),
        coordinator.purchase(Some(&vikram), &contested, PaymentMethod::Card),
    );

    for (name, outcome) in [("Asha", &first), ("Vikram", &second)] {
        match outcome {
            Ok(purchase) => info!(
                buyer = name,
                transaction_id = %purchase.transaction_id,
                amount = %purchase.amount,
                "purchase succeeded"
            ),
            Err(e) => info!(buyer = name, error = %e, "purchase failed"),
        }
    }
    anyhow::ensure!(
        first.is_ok() != second.is_ok(),
        "exactly one of the racing purchases must succeed"
    );

    // The winner patches their local view immediately...
    if let Ok(purchase) = first.or(second) {
        view.apply_local_sale(purchase.ticket);
    }
    info!(
        available_now = view.tickets().iter().filter(|t| t.is_available()).count(),
        "merged view after local patch"
    );

    // ...and the canonical subscription catches everyone else up.
    if view.refresh().await {
        info!(listings = view.tickets().len(), "canonical snapshot arrived");
    }

    let remaining = store.transaction_count_for(contested_id)?;
    info!(transactions_for_listing = remaining, "demo complete");
    Ok(())
}
