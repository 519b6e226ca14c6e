mod columns;
mod datasets;

use anyhow::Result;
use ckan_client::Client;
use structopt::StructOpt;

use self::{columns::GetColumnsArgs, datasets::GetDatasetsArgs};
use crate::{catalog::portal_of, printer::Printer};

#[derive(Debug, StructOpt)]
pub enum GetArgs {
    #[structopt(name = "datasets")]
    /// List the datasets of the portal
    Datasets(GetDatasetsArgs),

    #[structopt(name = "columns")]
    /// Show the inferred columns of a datastore resource, without writing a
    /// dictionary
    Columns(GetColumnsArgs),
}

impl GetArgs {
    /// Portal named by the command's own arguments, if any.
    pub fn portal(&self) -> Option<reqwest::Url> {
        match self {
            GetArgs::Datasets(_) => None,
            GetArgs::Columns(args) => portal_of(&args.resource_url),
        }
    }
}

pub fn run(args: &GetArgs, client: Client, printer: &Printer) -> Result<()> {
    match args {
        GetArgs::Datasets(args) => datasets::get(&client, args, printer),
        GetArgs::Columns(args) => columns::get(&client, args, printer),
    }
}
