use reqwest::StatusCode;
use url::Url;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("API request failed with {}: {}", status_code, message)]
    Api {
        status_code: StatusCode,
        message: String,
    },

    #[error("Invalid endpoint `{}`", endpoint)]
    BadEndpoint { endpoint: Url },

    #[error("Invalid resource link, expected `.../resource/<id>`, got: {}", url)]
    BadResourceUrl { url: String },

    #[error("Could not extract the dataset id from the link, expected `.../dataset/<id>`, got: {}", url)]
    BadDatasetUrl { url: String },

    #[error("Could not parse JSON response.")]
    BadJsonResponse(#[source] reqwest::Error),

    #[error(
        "Status code {} inconsistent with response payload: {}",
        status_code,
        message
    )]
    BadProtocol {
        status_code: StatusCode,
        message: String,
    },

    #[error("Failed to initialise the HTTP client")]
    BuildHttpClient(#[source] reqwest::Error),

    #[error("HTTP request error: {}", message)]
    ReqwestError {
        message: String,
        source: reqwest::Error,
    },

    #[error("Url parsing error: {}", message)]
    UrlParseError {
        message: String,
        source: url::ParseError,
    },

    #[error("Invalid service account credentials: {}", message)]
    BadCredentials { message: String },

    #[error("Could not sign the service account assertion")]
    SignAssertion(#[source] jsonwebtoken::errors::Error),

    #[error("Google API request failed with {}: {}", status_code, message)]
    Sheets {
        status_code: StatusCode,
        message: String,
    },

    #[error("No spreadsheet named `{}` is shared with the service account", name)]
    SpreadsheetNotFound { name: String },

    #[error("Spreadsheet `{}` has no worksheet named `{}`", spreadsheet, name)]
    WorksheetNotFound { spreadsheet: String, name: String },
}
