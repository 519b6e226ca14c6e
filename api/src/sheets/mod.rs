//! Google Sheets backend for the catalog inventory.
//!
//! The client authenticates as a service account, finds a spreadsheet by
//! name through the Drive API (or by id), and offers the handful of worksheet
//! operations the inventory sync needs: clear, bulk update and read back.
mod auth;

use http::Method;
use log::{debug, warn};
use once_cell::sync::Lazy;
use reqwest::{blocking::Client as HttpClient, Proxy};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::{
    construct_endpoint,
    error::{Error, Result},
    resources::value_to_string,
};

pub use self::auth::{AccessToken, ServiceAccountKey, SCOPES};

const SPREADSHEET_MIME_TYPE: &str = "application/vnd.google-apps.spreadsheet";
const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 30;

pub static DEFAULT_SHEETS_ENDPOINT: Lazy<Url> = Lazy::new(|| {
    Url::parse("https://sheets.googleapis.com/v4/spreadsheets").expect("Default URL is well-formed")
});

pub static DEFAULT_DRIVE_ENDPOINT: Lazy<Url> = Lazy::new(|| {
    Url::parse("https://www.googleapis.com/drive/v3/files").expect("Default URL is well-formed")
});

pub struct Config {
    pub sheets_endpoint: Url,
    pub drive_endpoint: Url,
    pub proxy: Option<Url>,
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            sheets_endpoint: DEFAULT_SHEETS_ENDPOINT.clone(),
            drive_endpoint: DEFAULT_DRIVE_ENDPOINT.clone(),
            proxy: None,
            timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECONDS),
        }
    }
}

#[derive(Debug)]
pub struct SheetsClient {
    http_client: HttpClient,
    token: AccessToken,
    sheets_endpoint: Url,
    drive_endpoint: Url,
}

impl SheetsClient {
    /// Authenticate as the service account and create a client.
    pub fn authorize(key: &ServiceAccountKey, config: Config) -> Result<Self> {
        let mut builder = HttpClient::builder().timeout(Some(config.timeout));
        if let Some(proxy) = config.proxy {
            builder = builder.proxy(Proxy::all(proxy).map_err(Error::BuildHttpClient)?);
        }
        let http_client = builder.build().map_err(Error::BuildHttpClient)?;
        let token = auth::fetch_access_token(&http_client, key)?;

        Ok(SheetsClient {
            http_client,
            token,
            sheets_endpoint: config.sheets_endpoint,
            drive_endpoint: config.drive_endpoint,
        })
    }

    /// Open the first spreadsheet with this exact title that the service
    /// account can see.
    pub fn open_by_name(&self, name: &str) -> Result<Spreadsheet<'_>> {
        let query = DriveFilesQuery {
            q: format!(
                "name = '{}' and mimeType = '{}' and trashed = false",
                escape_drive_literal(name),
                SPREADSHEET_MIME_TYPE
            ),
            fields: "files(id,name)",
            page_size: 10,
        };
        let files = self
            .request::<_, (), DriveFileList>(
                Method::GET,
                self.drive_endpoint.clone(),
                Some(&query),
                None,
            )?
            .files;

        if files.len() > 1 {
            warn!(
                "{} spreadsheets are named `{}`, using the first one ({}).",
                files.len(),
                name,
                files[0].id
            );
        }
        let file = files
            .into_iter()
            .next()
            .ok_or_else(|| Error::SpreadsheetNotFound {
                name: name.to_owned(),
            })?;
        self.open_by_id(&file.id)
    }

    /// Open a spreadsheet by its id (the long token in its url).
    pub fn open_by_id(&self, spreadsheet_id: &str) -> Result<Spreadsheet<'_>> {
        let metadata: SpreadsheetMetadata = self.request::<_, (), _>(
            Method::GET,
            construct_endpoint(&self.sheets_endpoint, &[spreadsheet_id])?,
            Some(&[(
                "fields",
                "spreadsheetId,properties.title,sheets.properties(sheetId,title)",
            )]),
            None,
        )?;
        debug!(
            "Opened spreadsheet `{}` ({}) with {} worksheet(s)",
            metadata.properties.title,
            metadata.spreadsheet_id,
            metadata.sheets.len()
        );

        Ok(Spreadsheet {
            client: self,
            id: metadata.spreadsheet_id,
            title: metadata.properties.title,
            worksheet_titles: metadata
                .sheets
                .into_iter()
                .map(|sheet| sheet.properties.title)
                .collect(),
        })
    }

    fn request<QueryT, BodyT, SuccessT>(
        &self,
        method: Method,
        url: Url,
        query: Option<&QueryT>,
        body: Option<&BodyT>,
    ) -> Result<SuccessT>
    where
        QueryT: Serialize + ?Sized,
        BodyT: Serialize,
        SuccessT: DeserializeOwned,
    {
        debug!("Attempting {} `{}`", method, url);
        let request = self
            .http_client
            .request(method.clone(), url)
            .bearer_auth(&self.token.0);
        let request = match query {
            Some(query) => request.query(query),
            None => request,
        };
        let request = match body {
            Some(body) => request.json(body),
            None => request,
        };
        let http_response = request.send().map_err(|source| Error::ReqwestError {
            source,
            message: format!("{method} operation failed."),
        })?;

        let status_code = http_response.status();
        if status_code.is_success() {
            http_response.json().map_err(Error::BadJsonResponse)
        } else {
            let message = http_response
                .json::<GoogleErrorResponse>()
                .map(GoogleErrorResponse::into_message)
                .unwrap_or_default();
            Err(Error::Sheets {
                status_code,
                message,
            })
        }
    }
}

#[derive(Debug)]
pub struct Spreadsheet<'a> {
    client: &'a SheetsClient,
    pub id: String,
    pub title: String,
    worksheet_titles: Vec<String>,
}

impl<'a> Spreadsheet<'a> {
    pub fn worksheet_titles(&self) -> &[String] {
        &self.worksheet_titles
    }

    /// Look up a worksheet (tab) by its exact title.
    pub fn worksheet(&self, title: &str) -> Result<Worksheet<'a>> {
        if self.worksheet_titles.iter().any(|existing| existing == title) {
            Ok(Worksheet {
                client: self.client,
                spreadsheet_id: self.id.clone(),
                title: title.to_owned(),
            })
        } else {
            Err(Error::WorksheetNotFound {
                spreadsheet: self.title.clone(),
                name: title.to_owned(),
            })
        }
    }
}

#[derive(Debug)]
pub struct Worksheet<'a> {
    client: &'a SheetsClient,
    spreadsheet_id: String,
    title: String,
}

impl Worksheet<'_> {
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Remove every value in the worksheet. Formatting is kept.
    pub fn clear(&self) -> Result<()> {
        let range = quote_sheet_title(&self.title);
        let _: Value = self.client.request::<(), _, _>(
            Method::POST,
            self.values_endpoint(&format!("{range}:clear"))?,
            None,
            Some(&serde_json::json!({})),
        )?;
        Ok(())
    }

    /// Write `rows` starting at the top-left cell, in a single request.
    ///
    /// Values are stored as sent: numbers stay numbers, strings are not
    /// parsed as formulas or dates.
    pub fn update(&self, rows: &[Vec<Value>]) -> Result<()> {
        let range = format!("{}!A1", quote_sheet_title(&self.title));
        let response: UpdateValuesResponse = self.client.request(
            Method::PUT,
            self.values_endpoint(&range)?,
            Some(&[("valueInputOption", "RAW")]),
            Some(&ValueRange {
                range: range.clone(),
                major_dimension: "ROWS",
                values: rows,
            }),
        )?;
        debug!(
            "Updated {} rows in `{}`",
            response.updated_rows.unwrap_or(0),
            range
        );
        Ok(())
    }

    /// Read every value of the worksheet as text.
    ///
    /// Google drops trailing empty cells, so rows are padded back to the width
    /// of the widest row.
    pub fn values(&self) -> Result<Vec<Vec<String>>> {
        let range = quote_sheet_title(&self.title);
        let response: ValuesResponse = self.client.request::<(), (), _>(
            Method::GET,
            self.values_endpoint(&range)?,
            None,
            None,
        )?;
        Ok(pad_rows(
            response
                .values
                .into_iter()
                .map(|row| row.iter().map(value_to_string).collect())
                .collect(),
        ))
    }

    fn values_endpoint(&self, range: &str) -> Result<Url> {
        construct_endpoint(
            &self.client.sheets_endpoint,
            &[&self.spreadsheet_id, "values", range],
        )
    }
}

/// Quote a worksheet title for use in A1 notation.
pub fn quote_sheet_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

fn escape_drive_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn pad_rows(mut rows: Vec<Vec<String>>) -> Vec<Vec<String>> {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    for row in rows.iter_mut() {
        row.resize(width, String::new());
    }
    rows
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DriveFilesQuery {
    q: String,
    fields: &'static str,
    page_size: u32,
}

#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpreadsheetMetadata {
    spreadsheet_id: String,
    properties: SpreadsheetProperties,
    #[serde(default)]
    sheets: Vec<Sheet>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct Sheet {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange<'a> {
    range: String,
    major_dimension: &'static str,
    values: &'a [Vec<Value>],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateValuesResponse {
    #[serde(default)]
    updated_rows: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ValuesResponse {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Google APIs report errors either as `{"error": {"message": ..}}` or, for
/// the OAuth token endpoint, as `{"error": "..", "error_description": ".."}`.
#[derive(Debug, Deserialize)]
pub(crate) struct GoogleErrorResponse {
    #[serde(default)]
    error: Value,
    #[serde(default)]
    error_description: Option<String>,
}

impl GoogleErrorResponse {
    pub(crate) fn into_message(self) -> String {
        let error = match &self.error {
            Value::Object(fields) => fields
                .get("message")
                .map(value_to_string)
                .unwrap_or_default(),
            other => value_to_string(other),
        };
        match self.error_description {
            Some(description) if !description.is_empty() => format!("{error}: {description}"),
            _ => error,
        }
    }
}
