pub mod models;
pub mod aggregator;
pub mod dedup;

pub use models::{Actor, Interaction, InteractionDetail, InteractionError, InteractionKind, ReviewBody, ReviewPatch};
pub use aggregator::{Aggregator, InteractionSummary};
pub use dedup::DedupGuard;
