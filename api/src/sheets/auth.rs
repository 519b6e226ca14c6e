use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use log::debug;
use reqwest::blocking::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::{
    error::{Error, Result},
    sheets::GoogleErrorResponse,
};

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECONDS: i64 = 3600;

pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/drive.readonly",
];

/// The JSON key file Google issues for a service account.
///
/// Only the fields needed for the JWT bearer grant are kept.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub token_uri: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<hidden>")
            .field("token_uri", &self.token_uri)
            .field("project_id", &self.project_id)
            .finish()
    }
}

impl FromStr for ServiceAccountKey {
    type Err = Error;

    fn from_str(json: &str) -> Result<Self> {
        let key: ServiceAccountKey =
            serde_json::from_str(json).map_err(|error| Error::BadCredentials {
                message: error.to_string(),
            })?;
        if key.client_email.is_empty() || key.private_key.is_empty() {
            return Err(Error::BadCredentials {
                message: "`client_email` and `private_key` must not be empty".to_owned(),
            });
        }
        Ok(key)
    }
}

impl ServiceAccountKey {
    pub fn token_uri(&self) -> &str {
        self.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI)
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    grant_type: &'a str,
    assertion: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(pub String);

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("AccessToken(<hidden>)")
    }
}

fn sign_assertion(key: &ServiceAccountKey, issued_at: i64) -> Result<String> {
    let claims = Claims {
        iss: &key.client_email,
        scope: SCOPES.join(" "),
        aud: key.token_uri(),
        iat: issued_at,
        exp: issued_at + ASSERTION_LIFETIME_SECONDS,
    };
    let encoding_key =
        EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|error| {
            Error::BadCredentials {
                message: format!("`private_key` is not a PEM encoded RSA key: {error}"),
            }
        })?;
    jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
        .map_err(Error::SignAssertion)
}

/// Exchange a signed service account assertion for an OAuth access token.
pub(crate) fn fetch_access_token(
    http_client: &HttpClient,
    key: &ServiceAccountKey,
) -> Result<AccessToken> {
    let assertion = sign_assertion(key, Utc::now().timestamp())?;
    debug!(
        "Requesting access token for `{}` from `{}`",
        key.client_email,
        key.token_uri()
    );

    let http_response = http_client
        .post(key.token_uri())
        .form(&TokenRequest {
            grant_type: JWT_BEARER_GRANT_TYPE,
            assertion: &assertion,
        })
        .send()
        .map_err(|source| Error::ReqwestError {
            source,
            message: "Token request failed.".to_owned(),
        })?;

    let status_code = http_response.status();
    if !status_code.is_success() {
        let message = http_response
            .json::<GoogleErrorResponse>()
            .map(GoogleErrorResponse::into_message)
            .unwrap_or_default();
        return Err(Error::BadCredentials {
            message: format!("token endpoint answered {status_code}: {message}"),
        });
    }

    Ok(AccessToken(
        http_response
            .json::<TokenResponse>()
            .map_err(Error::BadJsonResponse)?
            .access_token,
    ))
}
