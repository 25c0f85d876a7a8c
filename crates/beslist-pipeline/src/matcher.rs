//! Direct-match stage: one lookup per product that carries a pim id.

use std::collections::HashMap;
use std::time::Duration;

use beslist_client::BeslistClient;
use beslist_core::{DirectMatchRecord, ProductRecord};
use beslist_store::{SnapshotWriter, StoreError};

/// Direct-match records keyed by pim id, plus the number of lookups that
/// failed and were recorded as empty.
#[derive(Debug, Default)]
pub struct MatchOutcome {
    pub records: HashMap<String, DirectMatchRecord>,
    pub failed: usize,
}

/// Products eligible for a direct-match lookup, in input order. Products
/// without a pim id never reach the lookup stage.
pub fn lookup_candidates(products: &[ProductRecord]) -> impl Iterator<Item = &str> {
    products.iter().filter_map(|p| p.pim_id.as_deref())
}

/// Looks up vendor offers for every product with a pim id.
///
/// Lookup errors are logged and recorded as an empty record so one failure
/// does not abort the batch. Raw responses are stored in `snapshot` when
/// given.
///
/// # Errors
///
/// Returns [`StoreError`] only if a raw response cannot be written.
pub async fn match_products(
    client: &BeslistClient,
    products: &[ProductRecord],
    snapshot: Option<&SnapshotWriter>,
) -> Result<MatchOutcome, StoreError> {
    let delay = Duration::from_millis(client.config().inter_request_delay_ms);
    let mut outcome = MatchOutcome::default();

    for (i, pim_id) in lookup_candidates(products).enumerate() {
        if outcome.records.contains_key(pim_id) {
            continue;
        }
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let record = match client.direct_matches(pim_id).await {
            Ok(found) => {
                if let Some(writer) = snapshot {
                    writer.write_direct_match(pim_id, &found.raw)?;
                }
                tracing::debug!(pim_id, offers = found.record.offers.len(), "direct match found");
                found.record
            }
            Err(e) => {
                tracing::warn!(pim_id, error = %e, "direct-match lookup failed; recording empty");
                outcome.failed += 1;
                DirectMatchRecord::empty(pim_id)
            }
        };
        outcome.records.insert(pim_id.to_owned(), record);
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, pim: Option<&str>) -> ProductRecord {
        ProductRecord {
            product_id: id.to_owned(),
            pim_id: pim.map(str::to_owned),
            product_url: format!("https://www.beslist.nl/p/{id}/"),
            category: "schoenen".to_owned(),
            title: None,
        }
    }

    #[test]
    fn candidates_exclude_products_without_pim() {
        let products = vec![
            product("1", Some("pim-1")),
            product("2", None),
            product("3", Some("pim-3")),
        ];
        let pims: Vec<&str> = lookup_candidates(&products).collect();
        assert_eq!(pims, vec!["pim-1", "pim-3"]);
    }
}
