//! HTTP client for the Beslist.nl affiliate product-search and direct-match
//! endpoints.

pub mod client;
pub mod error;
pub mod extract;
mod rate_limit;
pub mod types;

pub use client::{
    BeslistClient, ClientConfig, DirectMatchOutcome, SearchOutcome, SearchPage, MAX_PAGES,
};
pub use error::ClientError;
pub use extract::format_product_url;
