pub mod app_config;
pub mod database;
pub mod interaction_repo;
pub mod listing_repo;

pub use app_config::Config;
pub use database::DbClient;
pub use interaction_repo::PgInteractionRepository;
pub use listing_repo::PgListingRepository;

use arena_core::CoreError;

/// Opaque storage failure, propagated unchanged.
pub(crate) fn storage(err: sqlx::Error) -> CoreError {
    CoreError::Storage(err.into())
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}
