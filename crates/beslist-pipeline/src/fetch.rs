//! Fetch cycle: search → direct match → snapshot → latest pointer.

use beslist_client::BeslistClient;
use beslist_core::{FetchSummary, ProductResult};
use beslist_store::SnapshotStore;
use chrono::Utc;

use crate::error::PipelineError;
use crate::matcher::match_products;

/// A completed fetch cycle.
#[derive(Debug, Clone)]
pub struct FetchCycle {
    pub summary: FetchSummary,
    pub results: Vec<ProductResult>,
}

/// Runs one complete fetch cycle for `category`.
///
/// The snapshot is written into a partial directory and only published,
/// together with the latest pointer, once every stage has succeeded. A
/// search failure aborts the cycle and leaves the previous latest intact.
/// Direct-match failures are per product and never abort the cycle.
///
/// # Errors
///
/// Returns [`PipelineError::Client`] when the search stage fails after
/// retries, or [`PipelineError::Store`] on filesystem failure.
pub async fn run_fetch_cycle(
    client: &BeslistClient,
    store: &SnapshotStore,
    category: &str,
    limit: usize,
) -> Result<FetchCycle, PipelineError> {
    let fetched_at = Utc::now();
    let writer = store.begin_snapshot(fetched_at)?;
    tracing::info!(category, limit, snapshot = writer.name(), "fetch cycle started");

    let search = match client.search_products(category, limit).await {
        Ok(search) => search,
        Err(e) => {
            tracing::error!(category, error = %e, "product search failed; aborting fetch cycle");
            writer.abort();
            return Err(e.into());
        }
    };
    writer.write_product_search(&search.raw_pages)?;
    writer.write_products(&search.products)?;

    let matched = match_products(client, &search.products, Some(&writer)).await?;

    let results: Vec<ProductResult> = search
        .products
        .iter()
        .map(|product| {
            let record = product
                .pim_id
                .as_ref()
                .and_then(|pim| matched.records.get(pim));
            ProductResult::new(product, record)
        })
        .collect();

    let products_with_pim = search
        .products
        .iter()
        .filter(|p| p.pim_id.is_some())
        .count();

    let shortfall_reason = (search.products.len() < limit).then(|| {
        if search.exhausted {
            format!(
                "category {category} returned only {} usable products upstream",
                search.products.len()
            )
        } else {
            format!(
                "search stopped after {} unique products (duplicates or unusable items)",
                search.products.len()
            )
        }
    });

    let summary = FetchSummary {
        message: "Data fetch completed successfully".to_owned(),
        category: category.to_owned(),
        fetch_directory: writer.final_dir().display().to_string(),
        fetched_at,
        product_count: search.upstream_count,
        products_with_pim,
        final_result_count: results.len(),
        failed_lookups: matched.failed,
        shortfall_reason,
        files: writer.files(),
    };

    writer.finish(&results, &summary)?;

    tracing::info!(
        category,
        products = results.len(),
        products_with_pim,
        failed_lookups = summary.failed_lookups,
        "fetch cycle completed"
    );

    Ok(FetchCycle { summary, results })
}
