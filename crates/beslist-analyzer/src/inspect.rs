//! HTML inspection of product and listing pages.
//!
//! The site uses CSS-module class names with a hashed suffix
//! (`thumb__image--a1B2c`), so matching is by class-name prefix.

use std::collections::BTreeMap;
use std::sync::LazyLock;
use std::time::Duration;

use beslist_core::PageInspection;
use regex::Regex;

use crate::config::AnalyzerConfig;
use crate::error::AnalyzerError;

/// Shops listing at least this many sizes set `has_shop_with_many_sizes`.
pub const MANY_SIZES_THRESHOLD: usize = 5;

/// Product titles kept per listing page.
pub const MAX_LISTING_TITLES: usize = 10;

static H1_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h1[^>]*>(.*?)</h1>").expect("valid h1 regex"));
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]+>").expect("valid tag regex"));
static THUMB_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<img\b[^>]*class\s*=\s*["'][^"']*\bthumb__image--"#)
        .expect("valid thumbnail regex")
});
static REVIEW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<span\b[^>]*class\s*=\s*["'][^"']*\breviewStars--"#)
        .expect("valid review regex")
});
static COMPARISON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<div\b[^>]*class\s*=\s*["'][^"']*\bcomparison--"#)
        .expect("valid comparison regex")
});
static SHOP_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)class\s*=\s*["'][^"']*\bcomparison__shopname--ellipsis[^"']*["'][^>]*>(.*?)</"#)
        .expect("valid shop name regex")
});
static SIZE_BADGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)class\s*=\s*["'][^"']*\bfashionSizeBadge--"#)
        .expect("valid size badge regex")
});
static ARTICLE_TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<article\b[^>]*>.*?<h[23][^>]*>(.*?)</h[23]>")
        .expect("valid article title regex")
});
static PRODUCT_TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<[a-z0-9]+\b[^>]*class\s*=\s*["'][^"']*\bproduct-title[^"']*["'][^>]*>(.*?)</"#)
        .expect("valid product title regex")
});

/// Fetches page HTML for inspection.
#[derive(Debug, Clone)]
pub struct PageInspector {
    client: reqwest::Client,
}

impl PageInspector {
    /// # Errors
    ///
    /// Returns [`AnalyzerError::Http`] if the client cannot be built.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, AnalyzerError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    /// # Errors
    ///
    /// Returns [`AnalyzerError::Http`] if the client cannot be built.
    pub fn from_config(config: &AnalyzerConfig) -> Result<Self, AnalyzerError> {
        Self::new(config.request_timeout_secs, &config.user_agent)
    }

    /// GETs `url` and returns the body.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::Http`] on transport failure or a non-success
    /// status.
    pub async fn fetch_html(&self, url: &str) -> Result<String, AnalyzerError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

/// Reads the structural facts of a product page. `has_size_in_title` is left
/// `false`; the caller decides it from the returned title.
#[must_use]
pub fn inspect_html(html: &str) -> PageInspection {
    let thumbnail_count = THUMB_RE.find_iter(html).count();
    let shop_size_counts = shop_size_counts(html);
    let has_shop_with_many_sizes = shop_size_counts
        .values()
        .any(|&n| n >= MANY_SIZES_THRESHOLD);

    PageInspection {
        title: extract_h1(html),
        thumbnail_count,
        has_multiple_images: thumbnail_count > 1,
        has_reviews: REVIEW_RE.is_match(html),
        shop_size_counts,
        has_shop_with_many_sizes,
        has_size_in_title: false,
    }
}

/// Text of the first `<h1>`, tags stripped and whitespace collapsed.
#[must_use]
pub fn extract_h1(html: &str) -> Option<String> {
    H1_RE
        .captures(html)
        .and_then(|cap| cap.get(1))
        .map(|m| clean_text(m.as_str()))
        .filter(|t| !t.is_empty())
}

/// Product titles on a listing page: headings inside `<article>` blocks,
/// else elements with a `product-title` class. At most
/// [`MAX_LISTING_TITLES`].
#[must_use]
pub fn listing_titles(html: &str) -> Vec<String> {
    for re in [&*ARTICLE_TITLE_RE, &*PRODUCT_TITLE_RE] {
        let titles: Vec<String> = re
            .captures_iter(html)
            .filter_map(|cap| cap.get(1))
            .map(|m| clean_text(m.as_str()))
            .filter(|t| !t.is_empty())
            .take(MAX_LISTING_TITLES)
            .collect();
        if !titles.is_empty() {
            return titles;
        }
    }
    Vec::new()
}

/// Size badges per shop offer block. Blocks without a readable shop name are
/// keyed `shop_<n>`; a shop listed twice keeps its larger count.
fn shop_size_counts(html: &str) -> BTreeMap<String, usize> {
    let starts: Vec<usize> = COMPARISON_RE.find_iter(html).map(|m| m.start()).collect();
    let mut counts = BTreeMap::new();

    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(html.len());
        let block = &html[start..end];

        let badges = SIZE_BADGE_RE.find_iter(block).count();
        if badges == 0 {
            continue;
        }
        let shop = SHOP_NAME_RE
            .captures(block)
            .and_then(|cap| cap.get(1))
            .map(|m| clean_text(m.as_str()))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| format!("shop_{}", i + 1));

        let entry = counts.entry(shop).or_insert(0);
        *entry = (*entry).max(badges);
    }

    counts
}

fn clean_text(input: &str) -> String {
    let stripped = TAG_RE.replace_all(input, " ");
    stripped
        .replace("&amp;", "&")
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRODUCT_PAGE: &str = r#"
        <html><body>
          <h1 class="title--x1">Nike  Air Max <span>90</span> maat 42</h1>
          <img class="thumb__image--a1 lazy" src="1.jpg">
          <img class="thumb__image--a1" src="2.jpg">
          <img class="hero" src="big.jpg">
          <span class="reviewStars--Qz">4.5</span>
          <div class="comparison--k9 offer">
            <div class="comparison__shopname--ellipsis--p2">Zalando</div>
            <div class="fashionSize--r4">
              <span class="fashionSizeBadge--t1">40</span>
              <span class="fashionSizeBadge--t1">41</span>
              <span class="fashionSizeBadge--t1">42</span>
              <span class="fashionSizeBadge--t1">43</span>
              <span class="fashionSizeBadge--t1">44</span>
            </div>
          </div>
          <div class="comparison--k9">
            <div class="comparison__shopname--ellipsis--p2">Sportshop &amp; Co</div>
            <div class="fashionSize--r4">
              <span class="fashionSizeBadge--t1">42</span>
            </div>
          </div>
        </body></html>
    "#;

    #[test]
    fn inspects_product_page_structure() {
        let inspection = inspect_html(PRODUCT_PAGE);
        assert_eq!(inspection.title.as_deref(), Some("Nike Air Max 90 maat 42"));
        assert_eq!(inspection.thumbnail_count, 2);
        assert!(inspection.has_multiple_images);
        assert!(inspection.has_reviews);
        assert_eq!(inspection.shop_size_counts.get("Zalando"), Some(&5));
        assert_eq!(inspection.shop_size_counts.get("Sportshop & Co"), Some(&1));
        assert!(inspection.has_shop_with_many_sizes);
        assert!(!inspection.has_size_in_title);
    }

    #[test]
    fn bare_page_yields_empty_inspection() {
        let inspection = inspect_html("<html><body><p>nothing</p></body></html>");
        assert_eq!(inspection.title, None);
        assert_eq!(inspection.thumbnail_count, 0);
        assert!(!inspection.has_multiple_images);
        assert!(!inspection.has_reviews);
        assert!(inspection.shop_size_counts.is_empty());
        assert!(!inspection.has_shop_with_many_sizes);
    }

    #[test]
    fn single_thumbnail_is_not_multiple_images() {
        let inspection = inspect_html(r#"<img class="thumb__image--z" src="a.jpg">"#);
        assert_eq!(inspection.thumbnail_count, 1);
        assert!(!inspection.has_multiple_images);
    }

    #[test]
    fn unnamed_shop_gets_positional_key() {
        let html = r#"<div class="comparison--a"><span class="fashionSizeBadge--b">40</span></div>"#;
        let inspection = inspect_html(html);
        assert_eq!(inspection.shop_size_counts.get("shop_1"), Some(&1));
    }

    #[test]
    fn listing_titles_prefer_article_headings() {
        let html = r#"
            <article class="card"><a><h3>Sneaker <b>wit</b></h3></a></article>
            <article class="card"><h2>Laars zwart</h2></article>
            <div class="product-title">ignored</div>
        "#;
        assert_eq!(listing_titles(html), vec!["Sneaker wit", "Laars zwart"]);
    }

    #[test]
    fn listing_titles_fall_back_to_class_and_cap() {
        let html: String = (0..15)
            .map(|i| format!(r#"<div class="product-title x">Item {i}</div>"#))
            .collect();
        let titles = listing_titles(&html);
        assert_eq!(titles.len(), MAX_LISTING_TITLES);
        assert_eq!(titles[0], "Item 0");
    }
}
