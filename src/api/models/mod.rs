pub mod highlight;

pub use highlight::{Highlight, HighlightRecord, RunMetadata, ScoredFrame, StoredResults};
