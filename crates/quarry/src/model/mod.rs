//! In-memory data model: records, batches, and validated shapes.

mod batch;
mod curated;
mod record;

pub use batch::Batch;
pub use curated::{CuratedRecord, RejectedRecord};
pub use record::{Record, CANONICAL_FIELDS};
