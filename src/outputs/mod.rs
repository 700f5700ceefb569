//! Output generation for a run.
//!
//! # Submodules
//!
//! - [`json`]: the fetched-article cache and the per-run sentiment report
//! - [`chart`]: the per-article polarity bar chart
//!
//! # Output Structure
//!
//! ```text
//! json_output_dir/
//! ├── articles.json
//! └── sentiment_{backend}.json
//!
//! article_sentiment_graph.svg
//! ```

pub mod chart;
pub mod json;
