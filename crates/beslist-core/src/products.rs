use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A product listed by the affiliate product-search endpoint.
///
/// Records are immutable once written; the next fetch cycle supersedes them
/// wholesale rather than merging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Affiliate-specific product key (falls back to the pim id when the
    /// search item carries no own key).
    pub product_id: String,
    /// Cross-vendor pim id used for direct-match lookups. Absent for products
    /// that cannot be matched.
    #[serde(rename = "pim3puntnull", default, skip_serializing_if = "Option::is_none")]
    pub pim_id: Option<String>,
    /// Canonical product-page URL.
    pub product_url: String,
    pub category: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// One vendor offer returned by a direct-match lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorOffer {
    pub url: String,
    /// Offer price. Offers without a price sort after all priced offers.
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub shop_name: Option<String>,
}

/// Sorts offers by ascending price, keeping unpriced offers last.
///
/// The sort is stable, so equal prices keep their upstream order.
pub fn sort_offers_by_price(offers: &mut [VendorOffer]) {
    offers.sort_by_key(|offer| (offer.price.is_none(), offer.price));
}

/// Direct-match result for one pim id: at most `cap` offers, cheapest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectMatchRecord {
    #[serde(rename = "pim3puntnull")]
    pub pim_id: String,
    pub offers: Vec<VendorOffer>,
}

impl DirectMatchRecord {
    /// Builds a record from raw offers, enforcing price order and the cap.
    #[must_use]
    pub fn from_offers(pim_id: impl Into<String>, mut offers: Vec<VendorOffer>, cap: usize) -> Self {
        sort_offers_by_price(&mut offers);
        offers.truncate(cap);
        Self {
            pim_id: pim_id.into(),
            offers,
        }
    }

    /// A record for a product with no vendor matches.
    #[must_use]
    pub fn empty(pim_id: impl Into<String>) -> Self {
        Self {
            pim_id: pim_id.into(),
            offers: Vec::new(),
        }
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.offers.iter().map(|o| o.url.as_str())
    }
}

/// One entry of a fetch cycle's final result: the product plus its vendor
/// offers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductResult {
    pub product_id: String,
    #[serde(rename = "pim3puntnull", default, skip_serializing_if = "Option::is_none")]
    pub pim_id: Option<String>,
    pub product_url: String,
    pub category: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub direct_matches: Vec<VendorOffer>,
}

impl ProductResult {
    /// Merges a product with its direct-match record. Products without a pim
    /// id, or whose lookup failed, get an empty offer list.
    #[must_use]
    pub fn new(product: &ProductRecord, matches: Option<&DirectMatchRecord>) -> Self {
        Self {
            product_id: product.product_id.clone(),
            pim_id: product.pim_id.clone(),
            product_url: product.product_url.clone(),
            category: product.category.clone(),
            title: product.title.clone(),
            direct_matches: matches.map(|m| m.offers.clone()).unwrap_or_default(),
        }
    }
}

/// Links to the files of one snapshot, relative to the data directory and
/// prefixed with `/data/` so they resolve against the static-file route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchFiles {
    pub product_search: String,
    pub products: String,
    pub final_result: String,
    pub latest_result: String,
}

/// Outcome of a completed fetch cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchSummary {
    pub message: String,
    pub category: String,
    pub fetch_directory: String,
    pub fetched_at: DateTime<Utc>,
    /// Products returned by the search stage before filtering.
    pub product_count: usize,
    pub products_with_pim: usize,
    pub final_result_count: usize,
    /// Direct-match lookups that failed and were recorded as empty.
    pub failed_lookups: usize,
    /// Set when fewer products than requested came back upstream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortfall_reason: Option<String>,
    pub files: FetchFiles,
}
