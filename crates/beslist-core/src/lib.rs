//! Shared records and configuration for the Beslist fetch, analysis, and
//! reporting crates.

pub mod analysis;
mod app_config;
mod config;
pub mod products;

use thiserror::Error;

pub use analysis::{
    AbStatistics, AnalysisRecord, AnalysisSummary, ComparisonRecord, PageFeatures,
    PageInspection, VariantCapture, Verdict, Winner,
};
pub use app_config::{AppConfig, SortDirection};
pub use config::{load_app_config, load_app_config_from_env, load_app_config_with};
pub use products::{
    sort_offers_by_price, DirectMatchRecord, FetchFiles, FetchSummary, ProductRecord,
    ProductResult, VendorOffer,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
