pub mod highlight;
pub mod models;

pub use highlight::HighlightProcessor;
