#![deny(clippy::all)]
//! Blocking clients for the two remote systems the bia-pine tools talk to: the
//! CKAN action API of an open data portal and the Google Sheets workbook that
//! holds the catalog inventory (see [`sheets`]).
mod error;
pub mod resources;
pub mod sheets;

use http::Method;
use log::debug;
use once_cell::sync::Lazy;
use reqwest::{blocking::Client as HttpClient, redirect, IntoUrl, Proxy, StatusCode};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, time::Duration};
use url::Url;

use crate::resources::{
    datastore::{SearchQuery as DatastoreSearchQuery, SearchResult as DatastoreSearchResult},
    search::{SearchQuery as PackageSearchQuery, ShowQuery},
    Response,
};

pub use crate::{
    error::{Error, Result},
    resources::{
        datastore::{column_names, Record},
        package::{Dataset, Extra, Group, Id as DatasetId, Organization, Tag},
        resource::{Id as ResourceId, Reference as ResourceReference, Resource},
        search::{SearchPage, DEFAULT_PAGE_SIZE},
        value_to_string,
    },
};

pub struct Config {
    /// Base url of the portal, e.g. `https://dadosabertos.go.gov.br`.
    pub endpoint: Url,
    pub accept_invalid_certificates: bool,
    pub proxy: Option<Url>,
    /// Applies to every catalog request.
    pub timeout: Duration,
    /// Applies to resource link checks only.
    pub link_check_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            endpoint: DEFAULT_ENDPOINT.clone(),
            accept_invalid_certificates: false,
            proxy: None,
            timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECONDS),
            link_check_timeout: Duration::from_secs(DEFAULT_LINK_CHECK_TIMEOUT_SECONDS),
        }
    }
}

#[derive(Debug)]
pub struct Client {
    endpoints: Endpoints,
    http_client: HttpClient,
    link_client: HttpClient,
}

impl Client {
    /// Create a new API client.
    pub fn new(config: Config) -> Result<Client> {
        let http_client = build_http_client(&config)?;
        let link_client = build_link_client(&config)?;
        let endpoints = Endpoints::new(config.endpoint)?;
        Ok(Client {
            endpoints,
            http_client,
            link_client,
        })
    }

    /// Get the base url for the client
    pub fn base_url(&self) -> &Url {
        &self.endpoints.base
    }

    /// Public link of a dataset on the portal.
    pub fn dataset_link(&self, name: &str) -> Result<Url> {
        construct_endpoint(&self.endpoints.base, &["dataset", name])
    }

    /// List the names of all public datasets.
    pub fn get_dataset_names(&self) -> Result<Vec<String>> {
        self.get(self.endpoints.action("package_list")?)
    }

    /// Get one page of the dataset catalog.
    pub fn search_datasets(&self, start: usize, rows: usize) -> Result<SearchPage> {
        self.get_query(
            self.endpoints.action("package_search")?,
            Some(&PackageSearchQuery { start, rows }),
        )
    }

    /// Get the full metadata of a dataset by id or name.
    pub fn get_dataset(&self, dataset: &str) -> Result<Dataset> {
        self.get_query(
            self.endpoints.action("package_show")?,
            Some(&ShowQuery { id: dataset }),
        )
    }

    /// Get the metadata of a single resource.
    pub fn get_resource(&self, resource_id: &ResourceId) -> Result<Resource> {
        self.get_query(
            self.endpoints.action("resource_show")?,
            Some(&ShowQuery { id: &resource_id.0 }),
        )
    }

    /// Get up to `limit` rows of a resource loaded into the datastore.
    pub fn get_records(&self, resource_id: &ResourceId, limit: usize) -> Result<Vec<Record>> {
        Ok(self
            .get_query::<_, _, DatastoreSearchResult>(
                self.endpoints.action("datastore_search")?,
                Some(&DatastoreSearchQuery {
                    resource_id: &resource_id.0,
                    limit,
                }),
            )?
            .records)
    }

    /// Whether a resource link answers a HEAD request with `200 OK`.
    ///
    /// Redirects are not followed. Empty or unreachable links count as broken;
    /// errors are not propagated.
    pub fn is_link_alive(&self, link: &str) -> bool {
        if link.trim().is_empty() {
            return false;
        }
        match self.link_client.head(link).send()
        {
            Ok(response) => {
                debug!("HEAD `{}` -> {}", link, response.status());
                response.status() == StatusCode::OK
            }
            Err(error) => {
                debug!("HEAD `{}` failed: {}", link, error);
                false
            }
        }
    }

    fn get<LocationT, SuccessT>(&self, url: LocationT) -> Result<SuccessT>
    where
        LocationT: IntoUrl + Display + Clone,
        for<'de> SuccessT: Deserialize<'de>,
    {
        self.request(&Method::GET, &url, &None::<()>)
    }

    fn get_query<LocationT, QueryT, SuccessT>(
        &self,
        url: LocationT,
        query: Option<&QueryT>,
    ) -> Result<SuccessT>
    where
        LocationT: IntoUrl + Display + Clone,
        QueryT: Serialize,
        for<'de> SuccessT: Deserialize<'de>,
    {
        self.request(&Method::GET, &url, &query)
    }

    fn request<LocationT, QueryT, SuccessT>(
        &self,
        method: &Method,
        url: &LocationT,
        query: &Option<QueryT>,
    ) -> Result<SuccessT>
    where
        LocationT: IntoUrl + Display + Clone,
        QueryT: Serialize,
        for<'de> SuccessT: Deserialize<'de>,
    {
        debug!("Attempting {} `{}`", method, url);
        let request = self.http_client.request(method.clone(), url.clone());
        let request = match query {
            Some(query) => request.query(query),
            None => request,
        };
        let http_response = request.send().map_err(|source| Error::ReqwestError {
            source,
            message: format!("{method} operation failed."),
        })?;

        let status = http_response.status();

        http_response
            .json::<Response<SuccessT>>()
            .map_err(Error::BadJsonResponse)?
            .into_result(status)
    }
}

#[derive(Debug)]
struct Endpoints {
    base: Url,
}

pub(crate) fn construct_endpoint(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut endpoint = base.clone();

    let mut endpoint_segments = endpoint
        .path_segments_mut()
        .map_err(|_| Error::BadEndpoint {
            endpoint: base.clone(),
        })?;

    endpoint_segments.pop_if_empty();
    for segment in segments {
        endpoint_segments.push(segment);
    }

    drop(endpoint_segments);

    Ok(endpoint)
}

impl Endpoints {
    pub fn new(base: Url) -> Result<Self> {
        // Fail early on urls that cannot carry a path, e.g. `mailto:`.
        construct_endpoint(&base, &[])?;
        Ok(Endpoints { base })
    }

    fn action(&self, name: &str) -> Result<Url> {
        construct_endpoint(&self.base, &["api", "3", "action", name])
    }
}

const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_LINK_CHECK_TIMEOUT_SECONDS: u64 = 5;

fn build_http_client(config: &Config) -> Result<HttpClient> {
    let mut builder = HttpClient::builder()
        .gzip(true)
        .danger_accept_invalid_certs(config.accept_invalid_certificates)
        .timeout(Some(config.timeout));

    if let Some(proxy) = config.proxy.clone() {
        builder = builder.proxy(Proxy::all(proxy).map_err(Error::BuildHttpClient)?);
    }
    builder.build().map_err(Error::BuildHttpClient)
}

fn build_link_client(config: &Config) -> Result<HttpClient> {
    let mut builder = HttpClient::builder()
        .redirect(redirect::Policy::none())
        .danger_accept_invalid_certs(config.accept_invalid_certificates)
        .timeout(Some(config.link_check_timeout));

    if let Some(proxy) = config.proxy.clone() {
        builder = builder.proxy(Proxy::all(proxy).map_err(Error::BuildHttpClient)?);
    }
    builder.build().map_err(Error::BuildHttpClient)
}

pub static DEFAULT_ENDPOINT: Lazy<Url> = Lazy::new(|| {
    Url::parse("https://dadosabertos.go.gov.br").expect("Default URL is well-formed")
});
