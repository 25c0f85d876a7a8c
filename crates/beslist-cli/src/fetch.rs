//! `fetch` and `product` command handlers.

use beslist_core::AppConfig;
use beslist_pipeline::Pipeline;

/// Runs one fetch cycle and prints its summary as JSON.
///
/// # Errors
///
/// Returns an error if the search stage fails or the snapshot cannot be
/// written. The previous latest result stays in place on failure.
pub(crate) async fn run_fetch(
    config: &AppConfig,
    category: Option<&str>,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let category = category.unwrap_or(&config.default_category);
    let limit = limit.unwrap_or(config.default_limit);
    anyhow::ensure!(limit > 0, "--limit must be at least 1");

    let pipeline = Pipeline::from_app_config(config)?;
    let cycle = pipeline.fetch(category, limit).await?;

    println!("{}", serde_json::to_string_pretty(&cycle.summary)?);
    if let Some(reason) = &cycle.summary.shortfall_reason {
        println!("note: {reason}");
    }
    Ok(())
}

/// Prints one product with its vendor offers.
///
/// # Errors
///
/// Returns an error if the live direct-match lookup fails.
pub(crate) async fn run_product(
    config: &AppConfig,
    pim_id: &str,
    category: Option<&str>,
) -> anyhow::Result<()> {
    let category = category.unwrap_or(&config.default_category);
    let pipeline = Pipeline::from_app_config(config)?;
    let product = pipeline.product_by_pim(pim_id, category).await?;
    println!("{}", serde_json::to_string_pretty(&product)?);
    Ok(())
}
