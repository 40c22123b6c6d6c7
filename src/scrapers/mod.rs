//! Naver news search scraping.
//!
//! Scraping is split into two halves:
//!
//! 1. **Fetching**: [`naver`] builds the paginated search URL and retrieves
//!    the raw result page through a [`naver::PageFetcher`]
//! 2. **Extraction**: [`extract`] finds the result items on the page and
//!    resolves each field through an ordered selector fallback chain
//!
//! Pagination and termination live in [`crate::crawler`].

pub mod extract;
pub mod naver;
