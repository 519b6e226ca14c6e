//! Catalog inventory: every resource of every dataset of the portal, one row
//! each, pushed to a Google Sheets worksheet.
mod crawl;
mod dates;
mod flatten;
mod sheet;

use anyhow::{anyhow, Result};
use ckan_client::{
    sheets::Config as SheetsConfig, value_to_string, Client, Config as ClientConfig,
    DEFAULT_PAGE_SIZE,
};
use log::{debug, error, info, warn};
use reqwest::Url;
use serde_json::Value;
use std::{
    env, io,
    path::{Path, PathBuf},
};
use structopt::StructOpt;

use self::{
    dates::FreshnessPolicy,
    flatten::{flatten_dataset, InventoryRow, HEADERS},
    sheet::Worksheet,
};
use crate::{
    catalog::{Catalog, LinkChecker},
    config::BiaPineConfig,
    errors::{self, Error},
    progress::{Progress, ProgressReporter},
};

pub use self::{crawl::crawl_catalog, sheet::SpreadsheetLocator};

pub const CREDENTIALS_ENV_VARIABLE_NAME: &str = "GOOGLE_CREDENTIALS_JSON";

#[derive(Debug, StructOpt)]
pub struct InventoryArgs {
    #[structopt(long = "portal")]
    /// Portal to inventory. Overrides `--endpoint` and the config file.
    pub portal: Option<Url>,

    #[structopt(long = "check-urls")]
    /// Send a HEAD request to every resource link and count broken ones.
    pub check_urls: bool,

    #[structopt(long = "csv", parse(from_os_str))]
    /// Also write the inventory table to this CSV file.
    pub csv: Option<PathBuf>,
}

/// Everything an inventory run needs; credentials included.
pub struct SyncConfig {
    pub catalog: ClientConfig,
    pub check_urls: bool,
    /// Service account key, as the JSON document Google issues.
    pub credentials_json: Option<String>,
    pub spreadsheet: SpreadsheetLocator,
    pub worksheet_name: String,
    pub csv_path: Option<PathBuf>,
    /// Datasets not modified for longer than this are reported as outdated.
    pub stale_after_days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub datasets: usize,
    pub skipped: usize,
    /// Header followed by one record per resource.
    pub table: Vec<Vec<Value>>,
}

impl SyncReport {
    fn summary(&self) -> String {
        let mut message = format!(
            "Inventory updated with {} resources from {} datasets",
            self.table.len().saturating_sub(1),
            self.datasets - self.skipped
        );
        if self.skipped > 0 {
            message.push_str(&format!(", {} datasets skipped", self.skipped));
        }
        message
    }
}

pub fn run(args: &InventoryArgs, catalog: ClientConfig, config: &BiaPineConfig) -> Result<()> {
    let catalog = match &args.portal {
        Some(portal) => ClientConfig {
            endpoint: portal.clone(),
            ..catalog
        },
        None => catalog,
    };
    let spreadsheet = match &config.spreadsheet_id {
        Some(id) => SpreadsheetLocator::Id(id.clone()),
        None => SpreadsheetLocator::Name(config.sheet_name.clone()),
    };
    let sync_config = SyncConfig {
        catalog,
        check_urls: args.check_urls,
        credentials_json: env::var(CREDENTIALS_ENV_VARIABLE_NAME).ok(),
        spreadsheet,
        worksheet_name: config.worksheet_name.clone(),
        csv_path: args.csv.clone(),
        stale_after_days: config.stale_after_days,
    };

    let progress = Progress::new("Datasets");
    let outcome = sync_inventory(&sync_config, &progress);
    progress.done();

    if outcome.success {
        info!("{}", outcome.message);
        Ok(())
    } else {
        Err(anyhow!("Inventory sync failed: {}", outcome.message))
    }
}

/// Run the whole inventory. Failures are reported in the outcome, never
/// returned.
pub fn sync_inventory(config: &SyncConfig, progress: &dyn ProgressReporter) -> SyncOutcome {
    match try_sync_inventory(config, progress) {
        Ok(report) => SyncOutcome {
            success: true,
            message: report.summary(),
        },
        Err(error) => {
            let message = format!("{:#}", anyhow::Error::from(error));
            error!("{}", message);
            SyncOutcome {
                success: false,
                message,
            }
        }
    }
}

fn try_sync_inventory(
    config: &SyncConfig,
    progress: &dyn ProgressReporter,
) -> errors::Result<SyncReport> {
    let credentials_json = config
        .credentials_json
        .as_deref()
        .filter(|credentials| !credentials.trim().is_empty())
        .ok_or_else(|| {
            Error::Credential(format!(
                "`{CREDENTIALS_ENV_VARIABLE_NAME}` is not set to a service account key"
            ))
        })?;

    let sheets = sheet::authorize(
        credentials_json,
        SheetsConfig {
            proxy: config.catalog.proxy.clone(),
            ..Default::default()
        },
    )
    .map_err(Error::from_sheets)?;
    let worksheet = sheet::open_worksheet(&sheets, &config.spreadsheet, &config.worksheet_name)
        .map_err(Error::from_sheets)?;

    let client = Client::new(ClientConfig {
        endpoint: config.catalog.endpoint.clone(),
        accept_invalid_certificates: config.catalog.accept_invalid_certificates,
        proxy: config.catalog.proxy.clone(),
        timeout: config.catalog.timeout,
        link_check_timeout: config.catalog.link_check_timeout,
    })
    .map_err(Error::Upstream)?;
    let link_checker = if config.check_urls {
        Some(&client as &dyn LinkChecker)
    } else {
        None
    };

    let report = run_sync(
        &client,
        link_checker,
        &FreshnessPolicy::as_of_today(config.stale_after_days),
        &worksheet,
        progress,
    )?;
    if let Some(csv_path) = &config.csv_path {
        write_csv(csv_path, &report.table)?;
        info!("Inventory also written to `{}`", csv_path.display());
    }
    Ok(report)
}

/// Crawl the catalog, flatten it and replace the worksheet contents.
pub fn run_sync(
    catalog: &impl Catalog,
    link_checker: Option<&dyn LinkChecker>,
    freshness_policy: &FreshnessPolicy,
    worksheet: &impl Worksheet,
    progress: &dyn ProgressReporter,
) -> errors::Result<SyncReport> {
    let summaries = crawl_catalog(catalog, DEFAULT_PAGE_SIZE).map_err(Error::Upstream)?;
    info!("Found {} datasets in the catalog", summaries.len());
    progress.report(0);

    let mut table: Vec<Vec<Value>> =
        vec![HEADERS.iter().map(|header| Value::from(*header)).collect()];
    let mut skipped = 0;
    for (index, summary) in summaries.iter().enumerate() {
        let dataset_id = if summary.id.0.is_empty() {
            &summary.name
        } else {
            &summary.id.0
        };
        match catalog.get_dataset(dataset_id) {
            Ok(dataset) => {
                let link = catalog.dataset_link(&dataset.name);
                table.extend(
                    flatten_dataset(&dataset, &link, link_checker, freshness_policy)
                        .iter()
                        .map(InventoryRow::to_record),
                );
            }
            Err(error) => {
                warn!("Skipping dataset `{}`: {}", dataset_id, error);
                skipped += 1;
            }
        }
        progress.report(((index + 1) * 100 / summaries.len()) as u64);
    }
    if summaries.is_empty() {
        progress.report(100);
    }

    worksheet.clear().map_err(Error::from_sheets)?;
    worksheet.update(&table).map_err(Error::from_sheets)?;
    match worksheet.values() {
        Ok(written) if written.len() == table.len() => {
            debug!("Worksheet holds the {} written rows", written.len());
        }
        Ok(written) => warn!(
            "Worksheet holds {} rows after the update, {} were written",
            written.len(),
            table.len()
        ),
        Err(error) => warn!("Could not read the worksheet back: {}", error),
    }

    Ok(SyncReport {
        datasets: summaries.len(),
        skipped,
        table,
    })
}

fn write_csv(path: &Path, table: &[Vec<Value>]) -> errors::Result<()> {
    let output_error = |source: io::Error| Error::Output {
        path: path.to_owned(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(|error| output_error(error.into()))?;
    for record in table {
        writer
            .write_record(record.iter().map(value_to_string))
            .map_err(|error| output_error(error.into()))?;
    }
    writer.flush().map_err(output_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::fake::{FakeCatalog, FakeLinkChecker},
        commands::inventory::sheet::fake::FakeWorksheet,
        progress::fake::RecordingProgress,
    };
    use chrono::NaiveDate;
    use ckan_client::{Dataset, DatasetId, Resource, ResourceId};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::HashSet;

    fn policy() -> FreshnessPolicy {
        FreshnessPolicy {
            today: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            stale_after_days: 30,
        }
    }

    fn as_text(table: &[Vec<Value>]) -> Vec<Vec<String>> {
        table
            .iter()
            .map(|row| row.iter().map(value_to_string).collect())
            .collect()
    }

    fn dataset(index: usize, resources: usize) -> Dataset {
        Dataset {
            id: DatasetId(format!("id-{index}")),
            name: format!("base-{index}"),
            title: format!("Base {index}"),
            resources: (0..resources)
                .map(|resource| Resource {
                    id: ResourceId(format!("r-{index}-{resource}")),
                    format: "CSV".to_owned(),
                    url: format!("https://files/{index}/{resource}.csv"),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    fn catalog(datasets: Vec<Dataset>) -> FakeCatalog {
        FakeCatalog {
            datasets,
            ..Default::default()
        }
    }

    #[test]
    fn test_sync_whole_catalog() {
        let catalog = catalog((0..250).map(|index| dataset(index, 1)).collect());
        let worksheet = FakeWorksheet::default();
        let progress = RecordingProgress::default();

        let report = run_sync(&catalog, None, &policy(), &worksheet, &progress).unwrap();

        assert_eq!(catalog.search_calls.get(), 3);
        assert_eq!(catalog.show_calls.get(), 250);
        assert_eq!(report.datasets, 250);
        assert_eq!(report.table.len(), 251);
        assert_eq!(report.table[0].len(), HEADERS.len());
        assert_eq!(report.table[1][14], json!(1));
        assert_eq!(report.table[1][15], json!(1));
        assert_eq!(*worksheet.updates.borrow(), 1);
        assert_eq!(*worksheet.reads.borrow(), 1);

        let reports = progress.reports.borrow();
        assert_eq!(reports.first(), Some(&0));
        assert_eq!(reports.last(), Some(&100));
        assert_eq!(reports.len(), 251);
        assert!(reports.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn test_written_table_reads_back_in_order() {
        let catalog = catalog(vec![dataset(0, 2), dataset(1, 0), dataset(2, 3)]);
        let worksheet = FakeWorksheet::with_rows(vec![vec!["stale".to_owned(); 40]; 30]);

        let report = run_sync(
            &catalog,
            None,
            &policy(),
            &worksheet,
            &RecordingProgress::default(),
        )
        .unwrap();

        let values = worksheet.values().unwrap();
        assert_eq!(values, as_text(&report.table));
        assert_eq!(values.len(), 6);
        assert_eq!(values[0][0], "ID_Base");
        assert_eq!(
            values[1..]
                .iter()
                .map(|row| row[21].as_str())
                .collect::<Vec<_>>(),
            vec!["r-0-0", "r-0-1", "r-2-0", "r-2-1", "r-2-2"]
        );
        assert_eq!(values[1][3], "https://portal.example/dataset/base-0");
    }

    #[test]
    fn test_failing_dataset_is_skipped() {
        let catalog = FakeCatalog {
            failing_datasets: HashSet::from(["id-1".to_owned()]),
            ..catalog((0..5).map(|index| dataset(index, 1)).collect())
        };
        let worksheet = FakeWorksheet::default();

        let report = run_sync(
            &catalog,
            None,
            &policy(),
            &worksheet,
            &RecordingProgress::default(),
        )
        .unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(
            report.table[1..]
                .iter()
                .map(|row| row[0].clone())
                .collect::<Vec<_>>(),
            vec![json!("id-0"), json!("id-2"), json!("id-3"), json!("id-4")]
        );
        assert_eq!(
            report.summary(),
            "Inventory updated with 4 resources from 4 datasets, 1 datasets skipped"
        );
    }

    #[test]
    fn test_link_checking_is_optional() {
        let mut broken = dataset(0, 2);
        broken.resources[1].url = "https://files/broken.csv".to_owned();
        let catalog = catalog(vec![broken]);

        let checker = FakeLinkChecker::default();
        let report = run_sync(
            &catalog,
            None,
            &policy(),
            &FakeWorksheet::default(),
            &RecordingProgress::default(),
        )
        .unwrap();
        assert!(report.table[1..]
            .iter()
            .all(|row| row[20] == json!(0) && row[25] == json!("")));

        let report = run_sync(
            &catalog,
            Some(&checker),
            &policy(),
            &FakeWorksheet::default(),
            &RecordingProgress::default(),
        )
        .unwrap();
        assert_eq!(checker.checked.borrow().len(), 2);
        assert!(report.table[1..].iter().all(|row| row[20] == json!(1)));
        assert_eq!(report.table[2][25], json!("ERRO"));
    }

    #[test]
    fn test_empty_catalog_writes_header_only() {
        let worksheet = FakeWorksheet::default();
        let progress = RecordingProgress::default();
        let report =
            run_sync(&catalog(Vec::new()), None, &policy(), &worksheet, &progress).unwrap();

        assert_eq!(worksheet.values().unwrap(), as_text(&report.table));
        assert_eq!(report.table.len(), 1);
        assert_eq!(*progress.reports.borrow(), vec![0, 100]);
    }

    #[test]
    fn test_worksheet_failure_is_an_error() {
        let worksheet = FakeWorksheet {
            fail_updates: true,
            ..Default::default()
        };
        let result = run_sync(
            &catalog(vec![dataset(0, 1)]),
            None,
            &policy(),
            &worksheet,
            &RecordingProgress::default(),
        );
        assert!(matches!(result, Err(Error::Upstream(_))));
    }

    fn sync_config(credentials_json: Option<&str>) -> SyncConfig {
        SyncConfig {
            catalog: ClientConfig::default(),
            check_urls: false,
            credentials_json: credentials_json.map(str::to_owned),
            spreadsheet: SpreadsheetLocator::Name("RELATORIO".to_owned()),
            worksheet_name: "Página1".to_owned(),
            csv_path: None,
            stale_after_days: 30,
        }
    }

    #[test]
    fn test_missing_credentials_fail_the_outcome() {
        for credentials in [None, Some(""), Some("{not json"), Some(r#"{"client_email": ""}"#)] {
            let outcome = sync_inventory(&sync_config(credentials), &RecordingProgress::default());
            assert!(!outcome.success, "{credentials:?}");
            assert!(outcome.message.contains("credentials"), "{}", outcome.message);
        }
    }

    #[test]
    fn test_write_csv() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("inventario.csv");
        let table = vec![
            vec![json!("ID_Base"), json!("Tags"), json!("Quantidade_CSV")],
            vec![json!("id-0"), json!("saúde, leitos"), json!(2)],
        ];
        write_csv(&path, &table).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "ID_Base,Tags,Quantidade_CSV\nid-0,\"saúde, leitos\",2\n"
        );
    }
}
