pub mod cached_fetcher;
pub mod error;
pub mod fetcher;
pub mod response;
