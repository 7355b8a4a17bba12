pub mod filter;
pub mod query;
pub mod repository;
pub mod memory;
pub mod service;

use arena_catalog::ConfigurationError;
use arena_interaction::{InteractionError, InteractionKind};

pub use filter::{AggregatedListing, ListingFilter, Selection, SortColumn, SortDirection};
pub use query::ListingQuery;
pub use repository::{InteractionRepository, ListingRepository};
pub use memory::MemoryStore;
pub use service::{InteractionService, ListingProfile, ListingService};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("invalid sort column '{column}'")]
    InvalidSortColumn { column: String, allowed: Vec<String> },

    #[error("invalid value '{value}' for {field}")]
    InvalidFilterValue {
        field: &'static str,
        value: String,
        allowed: Vec<String>,
    },

    #[error("{message}")]
    DuplicateInteraction { kind: InteractionKind, message: String },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl CoreError {
    /// Allowed values for input errors, empty for everything else.
    pub fn allowed_values(&self) -> &[String] {
        match self {
            CoreError::InvalidSortColumn { allowed, .. } | CoreError::InvalidFilterValue { allowed, .. } => allowed,
            _ => &[],
        }
    }
}

impl From<InteractionError> for CoreError {
    fn from(err: InteractionError) -> Self {
        match err {
            InteractionError::Duplicate { kind, .. } => {
                let message = match kind {
                    InteractionKind::Vote => "You already voted for this listing recently.",
                    InteractionKind::Review => "You already made a review on this listing.",
                    InteractionKind::Click => "Duplicate click.",
                };
                CoreError::DuplicateInteraction {
                    kind,
                    message: message.to_string(),
                }
            }
            other => CoreError::Validation(other.to_string()),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
