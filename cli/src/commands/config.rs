use anyhow::Result;
use colored::Colorize;
use log::info;
use prettytable::{format, row, Table};
use reqwest::Url;
use std::path::{Path, PathBuf};
use structopt::StructOpt;

use crate::config::{self, BiaPineConfig};

#[derive(Debug, StructOpt)]
pub enum ConfigArgs {
    #[structopt(name = "show")]
    /// Display the settings in use
    Show,

    #[structopt(name = "set")]
    /// Change settings in the configuration file
    Set(SetConfigArgs),
}

#[derive(Debug, Default, StructOpt)]
pub struct SetConfigArgs {
    #[structopt(long = "portal")]
    /// Base URL of the CKAN portal
    portal: Option<Url>,

    #[structopt(long = "sheet")]
    /// Title of the spreadsheet receiving the inventory
    sheet: Option<String>,

    #[structopt(long = "worksheet")]
    /// Title of the worksheet (tab) receiving the inventory
    worksheet: Option<String>,

    #[structopt(long = "spreadsheet-id")]
    /// Open the spreadsheet by id instead of by title. An empty value unsets it.
    spreadsheet_id: Option<String>,

    #[structopt(long = "template", parse(from_os_str))]
    /// Word template of the data dictionary
    template: Option<PathBuf>,

    #[structopt(long = "output-dir", parse(from_os_str))]
    /// Directory where data dictionaries are written
    output_dir: Option<PathBuf>,

    #[structopt(long = "stale-after-days")]
    /// Days without modification after which a dataset is reported as outdated
    stale_after_days: Option<u32>,

    #[structopt(long = "accept-invalid-certificates", parse(try_from_str))]
    /// Whether to accept invalid TLS certificates from the portal
    accept_invalid_certificates: Option<bool>,

    #[structopt(long = "proxy")]
    /// URL for an HTTP proxy that will be used for all requests if specified
    proxy: Option<Url>,
}

pub fn run(
    args: &ConfigArgs,
    config: BiaPineConfig,
    config_path: impl AsRef<Path>,
) -> Result<BiaPineConfig> {
    match args {
        ConfigArgs::Show => {
            show_config(&config, config_path.as_ref());
            Ok(config)
        }
        ConfigArgs::Set(set_args) => {
            let config = apply_settings(config, set_args);
            config::write_bia_pine_config(&config_path, &config)?;
            info!(
                "Configuration saved to `{}`.",
                config_path.as_ref().display()
            );
            Ok(config)
        }
    }
}

fn apply_settings(mut config: BiaPineConfig, args: &SetConfigArgs) -> BiaPineConfig {
    if let Some(portal) = &args.portal {
        config.portal = portal.clone();
    }
    if let Some(sheet) = &args.sheet {
        config.sheet_name = sheet.clone();
    }
    if let Some(worksheet) = &args.worksheet {
        config.worksheet_name = worksheet.clone();
    }
    if let Some(spreadsheet_id) = &args.spreadsheet_id {
        config.spreadsheet_id = Some(spreadsheet_id.trim().to_owned()).filter(|id| !id.is_empty());
    }
    if let Some(template) = &args.template {
        config.template = template.clone();
    }
    if let Some(output_dir) = &args.output_dir {
        config.output_dir = Some(output_dir.clone());
    }
    if let Some(stale_after_days) = args.stale_after_days {
        config.stale_after_days = stale_after_days;
    }
    if let Some(accept_invalid_certificates) = args.accept_invalid_certificates {
        config.accept_invalid_certificates = accept_invalid_certificates;
    }
    if let Some(proxy) = &args.proxy {
        config.proxy = Some(proxy.clone());
    }
    config
}

fn show_config(config: &BiaPineConfig, config_path: &Path) {
    let unset = || "<unset>".dimmed().to_string();
    let mut table = new_table();
    table.set_titles(row![bFg => "Setting", "Value"]);
    table.add_row(row!["File", config_path.display()]);
    table.add_row(row!["Portal", config.portal]);
    table.add_row(row![
        "Insecure",
        if config.accept_invalid_certificates {
            "Yes"
        } else {
            "No"
        }
    ]);
    table.add_row(row![
        "Proxy",
        config
            .proxy
            .as_ref()
            .map(Url::to_string)
            .unwrap_or_else(unset)
    ]);
    table.add_row(row!["Spreadsheet", config.sheet_name]);
    table.add_row(row![
        "Spreadsheet id",
        config.spreadsheet_id.clone().unwrap_or_else(unset)
    ]);
    table.add_row(row!["Worksheet", config.worksheet_name]);
    table.add_row(row!["Template", config.template.display()]);
    table.add_row(row!["Outdated after (days)", config.stale_after_days]);
    table.add_row(row![
        "Output directory",
        config
            .output_dir
            .as_ref()
            .map(|output_dir| output_dir.display().to_string())
            .unwrap_or_else(unset)
    ]);
    table.printstd();
}

fn new_table() -> Table {
    let mut table = Table::new();
    let format = format::FormatBuilder::new()
        .column_separator(' ')
        .borders(' ')
        .separators(&[], format::LineSeparator::new('-', '+', '+', '+'))
        .padding(0, 1)
        .build();
    table.set_format(format);
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_apply_settings_only_changes_given_values() {
        let config = apply_settings(
            BiaPineConfig::default(),
            &SetConfigArgs {
                sheet: Some("INVENTARIO".to_owned()),
                spreadsheet_id: Some("1AbC".to_owned()),
                stale_after_days: Some(40),
                accept_invalid_certificates: Some(true),
                ..Default::default()
            },
        );
        assert_eq!(
            config,
            BiaPineConfig {
                sheet_name: "INVENTARIO".to_owned(),
                spreadsheet_id: Some("1AbC".to_owned()),
                stale_after_days: 40,
                accept_invalid_certificates: true,
                ..Default::default()
            }
        );

        let config = apply_settings(
            config,
            &SetConfigArgs {
                spreadsheet_id: Some(String::new()),
                ..Default::default()
            },
        );
        assert_eq!(config.spreadsheet_id, None);
    }

    #[test]
    fn test_set_writes_config_file() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("config.json");
        let args = ConfigArgs::Set(SetConfigArgs {
            worksheet: Some("Inventário".to_owned()),
            ..Default::default()
        });

        run(&args, BiaPineConfig::default(), &path).unwrap();
        assert_eq!(
            config::read_bia_pine_config(&path).unwrap().worksheet_name,
            "Inventário"
        );
    }
}
