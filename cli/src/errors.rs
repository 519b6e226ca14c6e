use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Input error: {0}")]
    InvalidInput(String),

    #[error("Template `{}` does not exist", .0.display())]
    TemplateNotFound(PathBuf),

    #[error("Invalid template: {0}")]
    TemplateFormat(String),

    #[error("Remote request failed: {0}")]
    Upstream(#[source] ckan_client::Error),

    #[error("Spreadsheet credentials: {0}")]
    Credential(String),

    #[error("Could not write `{}`", path.display())]
    Output {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Error {
    /// Classify a client error: malformed links are the caller's fault, the
    /// rest comes from the portal.
    pub fn from_client(error: ckan_client::Error) -> Self {
        match error {
            ckan_client::Error::BadResourceUrl { .. } | ckan_client::Error::BadDatasetUrl { .. } => {
                Error::InvalidInput(error.to_string())
            }
            error => Error::Upstream(error),
        }
    }

    /// Classify a spreadsheet error: unusable service account keys are
    /// credential problems, the rest comes from Google.
    pub fn from_sheets(error: ckan_client::Error) -> Self {
        match error {
            ckan_client::Error::BadCredentials { .. } | ckan_client::Error::SignAssertion(_) => {
                Error::Credential(error.to_string())
            }
            error => Error::Upstream(error),
        }
    }
}
