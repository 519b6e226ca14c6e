use anyhow::{Context, Result};
use ckan_client::DEFAULT_ENDPOINT;
use log::debug;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::{Path, PathBuf},
};
use url::Url;

pub const DEFAULT_SHEET_NAME: &str = "RELATORIO";
pub const DEFAULT_WORKSHEET_NAME: &str = "Página1";
pub const DEFAULT_TEMPLATE: &str = "modelo_bia2_pronto_para_preencher.docx";
pub const DEFAULT_STALE_AFTER_DAYS: u32 = 30;

/// Settings persisted between runs. Spreadsheet credentials are never stored
/// here, they come from the environment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BiaPineConfig {
    pub portal: Url,
    pub accept_invalid_certificates: bool,
    pub proxy: Option<Url>,
    pub sheet_name: String,
    pub worksheet_name: String,
    /// Takes precedence over `sheet_name` when set.
    pub spreadsheet_id: Option<String>,
    pub template: PathBuf,
    pub output_dir: Option<PathBuf>,
    /// Age in days after which the inventory marks a dataset as outdated.
    pub stale_after_days: u32,
}

impl Default for BiaPineConfig {
    fn default() -> Self {
        BiaPineConfig {
            portal: DEFAULT_ENDPOINT.clone(),
            accept_invalid_certificates: false,
            proxy: None,
            sheet_name: DEFAULT_SHEET_NAME.to_owned(),
            worksheet_name: DEFAULT_WORKSHEET_NAME.to_owned(),
            spreadsheet_id: None,
            template: PathBuf::from(DEFAULT_TEMPLATE),
            output_dir: None,
            stale_after_days: DEFAULT_STALE_AFTER_DAYS,
        }
    }
}

pub fn read_bia_pine_config(path: impl AsRef<Path>) -> Result<BiaPineConfig> {
    debug!("Reading config file at `{}`", path.as_ref().display());
    if path.as_ref().exists() {
        let file = File::open(&path)
            .with_context(|| format!("Could not open config file `{}`", path.as_ref().display()))?;
        let config_reader = BufReader::new(file);
        serde_json::from_reader(config_reader)
            .with_context(|| format!("Could not parse config file `{}`", path.as_ref().display()))
    } else {
        Ok(Default::default())
    }
}

pub fn write_bia_pine_config(path: impl AsRef<Path>, config: &BiaPineConfig) -> Result<()> {
    debug!("Writing config file at `{}`", path.as_ref().display());
    let file = File::create(&path)
        .with_context(|| format!("Could not create config file `{}`", path.as_ref().display()))?;
    let config_writer = BufWriter::new(file);
    serde_json::to_writer_pretty(config_writer, &config).with_context(|| {
        format!(
            "Could not serialise configuration to `{}`",
            path.as_ref().display()
        )
    })
}
