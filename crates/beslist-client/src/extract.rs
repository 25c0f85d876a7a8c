//! Conversion of raw API items into domain records.

use beslist_core::{ProductRecord, VendorOffer};

use crate::types::{DirectMatchItem, SearchItem};

/// Fills `{category}` and `{pim_id}` in a product URL template.
#[must_use]
pub fn format_product_url(template: &str, category: &str, pim_id: &str) -> String {
    template
        .replace("{category}", category)
        .replace("{pim_id}", pim_id)
}

/// Builds a product record from a search item.
///
/// Returns `None` (with a warning) when the item carries no identifier at
/// all, or when no product URL can be resolved for it.
#[must_use]
pub fn product_record(item: &SearchItem, category: &str, url_template: &str) -> Option<ProductRecord> {
    let Some(product_id) = item.id.clone().or_else(|| item.pim_id.clone()) else {
        tracing::warn!(title = ?item.title, "search item has no identifier; skipping");
        return None;
    };

    let product_url = match (&item.pim_id, &item.url) {
        (Some(pim_id), _) => format_product_url(url_template, category, pim_id),
        (None, Some(url)) if !url.trim().is_empty() => url.trim().to_owned(),
        (None, _) => {
            tracing::warn!(product_id, "search item has no resolvable product URL; skipping");
            return None;
        }
    };

    Some(ProductRecord {
        product_id,
        pim_id: item.pim_id.clone(),
        product_url,
        category: category.to_owned(),
        title: item.title.clone(),
    })
}

/// Extracts vendor offers from direct-match items, dropping items without a
/// shop URL. Order is preserved; price sorting happens when the record is
/// built.
#[must_use]
pub fn vendor_offers(items: Vec<DirectMatchItem>) -> Vec<VendorOffer> {
    items
        .into_iter()
        .filter_map(|item| item.shop_item)
        .filter_map(|shop| {
            let url = shop.url?.trim().to_owned();
            if url.is_empty() {
                return None;
            }
            Some(VendorOffer {
                url,
                price: shop.price,
                shop_name: shop.shop_name,
            })
        })
        .collect()
}
