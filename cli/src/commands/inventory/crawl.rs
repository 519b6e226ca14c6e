use ckan_client::{Dataset, Result};
use log::{debug, warn};

use crate::catalog::Catalog;

/// Page through `package_search` until the announced total is reached.
///
/// The summaries lack most metadata; use `package_show` for the full record.
pub fn crawl_catalog(catalog: &impl Catalog, page_size: usize) -> Result<Vec<Dataset>> {
    let mut summaries = Vec::new();
    loop {
        let page = catalog.search_datasets(summaries.len(), page_size)?;
        let total = page.count;
        if page.results.is_empty() {
            if summaries.len() < total {
                warn!(
                    "Catalog announced {} datasets but stopped returning them after {}",
                    total,
                    summaries.len()
                );
            }
            break;
        }

        summaries.extend(page.results);
        debug!("Fetched {} of {} dataset summaries", summaries.len(), total);
        if summaries.len() >= total {
            break;
        }
    }
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fake::FakeCatalog;
    use ckan_client::DatasetId;
    use pretty_assertions::assert_eq;

    fn catalog(size: usize) -> FakeCatalog {
        FakeCatalog {
            datasets: (0..size)
                .map(|index| Dataset {
                    id: DatasetId(format!("id-{index}")),
                    name: format!("base-{index}"),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_crawl_pages_until_total() {
        let catalog = catalog(250);
        let summaries = crawl_catalog(&catalog, 100).unwrap();
        assert_eq!(catalog.search_calls.get(), 3);
        assert_eq!(summaries.len(), 250);
        assert_eq!(summaries[249].name, "base-249");
    }

    #[test]
    fn test_crawl_exact_multiple_of_page_size() {
        let catalog = catalog(200);
        assert_eq!(crawl_catalog(&catalog, 100).unwrap().len(), 200);
        assert_eq!(catalog.search_calls.get(), 2);
    }

    #[test]
    fn test_crawl_empty_catalog() {
        let catalog = catalog(0);
        assert!(crawl_catalog(&catalog, 100).unwrap().is_empty());
        assert_eq!(catalog.search_calls.get(), 1);
    }

    #[test]
    fn test_crawl_stops_when_catalog_shrinks() {
        let catalog = FakeCatalog {
            reported_count: Some(300),
            ..catalog(150)
        };
        assert_eq!(crawl_catalog(&catalog, 100).unwrap().len(), 150);
        assert_eq!(catalog.search_calls.get(), 3);
    }
}
