//! Response types for the Beslist product-search and direct-match endpoints.
//!
//! Both endpoints wrap their items as `{"results": [{"resultSet": [...]}]}`.
//! Only the first result block is used. Identifier fields arrive as strings
//! on some items and as numbers on others, and prices as either numbers or
//! decimal strings, so those fields go through lenient helpers.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

/// Top-level envelope shared by both endpoints.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<ResultBlock<T>>,
}

#[derive(Debug, Deserialize)]
pub struct ResultBlock<T> {
    #[serde(rename = "resultSet", default = "Vec::new")]
    pub result_set: Vec<T>,
}

impl<T> ApiResponse<T> {
    /// Items of the first result block, or nothing when the response has no
    /// result set.
    #[must_use]
    pub fn into_result_set(self) -> Vec<T> {
        self.results
            .into_iter()
            .next()
            .map(|block| block.result_set)
            .unwrap_or_default()
    }
}

/// One product from the search endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchItem {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(rename = "pim3puntNullId", default, deserialize_with = "lenient_id")]
    pub pim_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// One vendor offer from the direct-match endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectMatchItem {
    #[serde(rename = "shopItem", default)]
    pub shop_item: Option<ShopItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShopItem {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient_price")]
    pub price: Option<Decimal>,
    #[serde(rename = "shopName", alias = "shop_name", default)]
    pub shop_name: Option<String>,
}

pub type SearchResponse = ApiResponse<SearchItem>;
pub type DirectMatchResponse = ApiResponse<DirectMatchItem>;

/// Accepts a string or a number; empty strings become `None`.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_owned())
        }
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Accepts `12.5`, `"12.50"`, or `"12,50"`. Anything unparseable is `None`,
/// which sorts the offer after priced ones.
fn lenient_price<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        Some(serde_json::Value::String(s)) => Decimal::from_str(&s.trim().replace(',', ".")).ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_item_accepts_numeric_ids() {
        let item: SearchItem = serde_json::from_value(serde_json::json!({
            "id": 12345,
            "pim3puntNullId": "abc-1",
            "title": "Sneaker"
        }))
        .unwrap();
        assert_eq!(item.id.as_deref(), Some("12345"));
        assert_eq!(item.pim_id.as_deref(), Some("abc-1"));
        assert!(item.url.is_none());
    }

    #[test]
    fn blank_pim_id_is_absent() {
        let item: SearchItem =
            serde_json::from_value(serde_json::json!({"id": "1", "pim3puntNullId": "  "})).unwrap();
        assert!(item.pim_id.is_none());
    }

    #[test]
    fn price_accepts_numbers_and_comma_strings() {
        let shop: ShopItem =
            serde_json::from_value(serde_json::json!({"url": "https://s/1", "price": 19.95}))
                .unwrap();
        assert_eq!(shop.price, Some(Decimal::new(1995, 2)));
        let shop: ShopItem =
            serde_json::from_value(serde_json::json!({"url": "https://s/1", "price": "24,50"}))
                .unwrap();
        assert_eq!(shop.price, Some(Decimal::new(2450, 2)));
        let shop: ShopItem =
            serde_json::from_value(serde_json::json!({"url": "https://s/1", "price": "n/a"}))
                .unwrap();
        assert!(shop.price.is_none());
    }

    #[test]
    fn missing_result_set_is_empty() {
        let response: SearchResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(response.into_result_set().is_empty());
        let response: SearchResponse =
            serde_json::from_value(serde_json::json!({"results": [{}]})).unwrap();
        assert!(response.into_result_set().is_empty());
    }
}
