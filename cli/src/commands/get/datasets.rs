use anyhow::{Context, Result};
use ckan_client::{Client, DEFAULT_PAGE_SIZE};
use colored::Colorize;
use log::info;
use prettytable::{row, Row};
use serde::Serialize;
use structopt::StructOpt;

use crate::{
    commands::inventory::crawl_catalog,
    printer::{DisplayTable, Printer},
};

#[derive(Debug, StructOpt)]
pub struct GetDatasetsArgs {
    #[structopt(long = "full")]
    /// Page through the search API and show title, organisation and resource
    /// count of each dataset
    full: bool,
}

#[derive(Debug, Serialize)]
struct DatasetName {
    name: String,
}

impl DisplayTable for DatasetName {
    fn to_table_headers() -> Row {
        row![bFg => "Name"]
    }

    fn to_table_row(&self) -> Row {
        row![self.name]
    }
}

pub fn get(client: &Client, args: &GetDatasetsArgs, printer: &Printer) -> Result<()> {
    if args.full {
        let mut datasets = crawl_catalog(client, DEFAULT_PAGE_SIZE)
            .context("Operation to list datasets has failed.")?;
        datasets.sort_unstable_by(|lhs, rhs| lhs.name.cmp(&rhs.name));
        info!(
            "{} datasets in {}",
            datasets.len(),
            client.base_url().as_str().dimmed()
        );
        printer.print_resources(&datasets)
    } else {
        let names: Vec<DatasetName> = client
            .get_dataset_names()
            .context("Operation to list datasets has failed.")?
            .into_iter()
            .map(|name| DatasetName { name })
            .collect();
        printer.print_resources(&names)
    }
}
