use anyhow::{Context, Result};
use ckan_client::{Client, ResourceReference};
use log::info;
use structopt::StructOpt;

use crate::{
    commands::dictionary::{profile_columns, RECORD_LIMIT},
    errors::Error,
    printer::Printer,
};

#[derive(Debug, StructOpt)]
pub struct GetColumnsArgs {
    /// Link to the resource page, `.../dataset/<dataset>/resource/<resource>`
    pub resource_url: String,
}

pub fn get(client: &Client, args: &GetColumnsArgs, printer: &Printer) -> Result<()> {
    let reference: ResourceReference = args
        .resource_url
        .parse()
        .map_err(Error::from_client)
        .context("Operation to get columns has failed.")?;

    let records = client
        .get_records(&reference.resource_id, RECORD_LIMIT)
        .with_context(|| {
            format!(
                "Could not read the datastore of resource `{}`",
                reference.resource_id.0
            )
        })?;
    let columns = profile_columns(&records);
    info!("{} columns in {} records", columns.len(), records.len());
    printer.print_resources(&columns)
}
