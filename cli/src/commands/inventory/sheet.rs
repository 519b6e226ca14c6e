use ckan_client::{
    sheets::{Config as SheetsConfig, ServiceAccountKey, SheetsClient, Worksheet as GoogleWorksheet},
    Result,
};
use log::info;
use serde_json::Value;

/// Destination of the inventory table.
pub trait Worksheet {
    fn clear(&self) -> Result<()>;

    /// Write all rows in one request, starting at the top-left cell.
    fn update(&self, rows: &[Vec<Value>]) -> Result<()>;

    /// Every value of the worksheet, as text.
    fn values(&self) -> Result<Vec<Vec<String>>>;
}

impl Worksheet for GoogleWorksheet<'_> {
    fn clear(&self) -> Result<()> {
        GoogleWorksheet::clear(self)
    }

    fn update(&self, rows: &[Vec<Value>]) -> Result<()> {
        GoogleWorksheet::update(self, rows)
    }

    fn values(&self) -> Result<Vec<Vec<String>>> {
        GoogleWorksheet::values(self)
    }
}

/// Which spreadsheet receives the inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpreadsheetLocator {
    Name(String),
    Id(String),
}

pub fn authorize(credentials_json: &str, config: SheetsConfig) -> Result<SheetsClient> {
    let key: ServiceAccountKey = credentials_json.parse()?;
    info!("Authenticating with Google as `{}`", key.client_email);
    SheetsClient::authorize(&key, config)
}

pub fn open_worksheet<'a>(
    client: &'a SheetsClient,
    spreadsheet: &SpreadsheetLocator,
    worksheet_name: &str,
) -> Result<GoogleWorksheet<'a>> {
    let spreadsheet = match spreadsheet {
        SpreadsheetLocator::Name(name) => client.open_by_name(name)?,
        SpreadsheetLocator::Id(id) => client.open_by_id(id)?,
    };
    info!(
        "Opened spreadsheet `{}` ({}), worksheets: {}",
        spreadsheet.title,
        spreadsheet.id,
        spreadsheet.worksheet_titles().join(", ")
    );
    spreadsheet.worksheet(worksheet_name)
}
