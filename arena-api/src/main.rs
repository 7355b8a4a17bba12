use std::net::SocketAddr;
use std::sync::Arc;
use arena_api::{app, AppState, AuthConfig};
use arena_core::repository::{InteractionRepository, ListingRepository};
use arena_core::{InteractionService, ListingService, MemoryStore, SortColumn};
use arena_store::{Config, DbClient, PgInteractionRepository, PgListingRepository};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "arena_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().expect("Failed to load config");
    tracing::info!("Starting Arena API on port {}", config.server.port);

    // Bad thresholds and windows are fatal at startup.
    let thresholds = config.rate_thresholds().expect("Invalid filter.exp thresholds");
    let guard = config.dedup_guard().expect("Invalid interactions.vote_cooldown_hours");
    let aggregator = config.aggregator().expect("Invalid interactions.window_days");
    let default_sort: SortColumn = config
        .interactions
        .default_sort
        .parse()
        .unwrap_or_else(|_| panic!("Unknown interactions.default_sort '{}'", config.interactions.default_sort));

    let (listing_repo, interaction_repo): (Arc<dyn ListingRepository>, Arc<dyn InteractionRepository>) =
        if config.database.url.is_empty() {
            tracing::warn!("No database.url configured, using the in-memory store");
            let store = Arc::new(MemoryStore::new());
            (
                store.clone() as Arc<dyn ListingRepository>,
                store as Arc<dyn InteractionRepository>,
            )
        } else {
            let db = DbClient::new(&config.database.url, config.database.max_connections)
                .await
                .expect("Failed to connect to Postgres");
            db.migrate().await.expect("Failed to run migrations");
            (
                Arc::new(PgListingRepository::new(db.pool.clone())) as Arc<dyn ListingRepository>,
                Arc::new(PgInteractionRepository::new(db.pool.clone())) as Arc<dyn InteractionRepository>,
            )
        };

    let listings = ListingService::new(
        listing_repo.clone(),
        interaction_repo.clone(),
        thresholds,
        aggregator,
    )
    .with_default_sort(default_sort);
    let interactions = InteractionService::new(listing_repo, interaction_repo, guard);

    let app_state = AppState {
        listings: Arc::new(listings),
        interactions: Arc::new(interactions),
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
        },
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>()
    ).await.unwrap();
}
