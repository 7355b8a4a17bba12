use std::sync::Arc;
use arena_core::{InteractionService, ListingService};

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

#[derive(Clone)]
pub struct AppState {
    pub listings: Arc<ListingService>,
    pub interactions: Arc<InteractionService>,
    pub auth: AuthConfig,
}
