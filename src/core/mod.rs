pub mod error;
pub mod pipeline;
pub mod render;
pub mod scoring;
pub mod selection;
pub mod store;
pub mod upload;
pub mod video;

pub use error::{HighlightError, MediaDecodeError, ScoringError, ValidationError};
pub use pipeline::{HighlightPipeline, RunSummary};
pub use selection::{select, SelectionPolicy};
pub use store::{ResultStore, StoredResults};
