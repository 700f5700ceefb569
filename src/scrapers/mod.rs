//! Document sources that supply raw articles to the pipeline.
//!
//! | Source | Module | Method |
//! |--------|--------|--------|
//! | Al Jazeera section page | [`aljazeera`] | HTML scraping |
//! | Saved `articles.json` | [`cache`] | JSON file |
//!
//! The scraper follows a two-phase pattern:
//!
//! 1. **Indexing**: discover article links on the section page
//! 2. **Fetching**: download each article and extract its paragraphs
//!
//! Failed article fetches are logged and skipped; a failed index fetch is
//! fatal because there is nothing left to process.

pub mod aljazeera;
pub mod cache;
