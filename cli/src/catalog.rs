//! Seams between the commands and the portal, so the dictionary and inventory
//! workflows can run against an in-memory catalog in tests.
use ckan_client::{
    Client, Dataset, Record, Resource, ResourceId, ResourceReference, Result, SearchPage,
};
use reqwest::Url;

pub trait Catalog {
    fn search_datasets(&self, start: usize, rows: usize) -> Result<SearchPage>;

    fn get_dataset(&self, dataset: &str) -> Result<Dataset>;

    fn get_resource(&self, resource_id: &ResourceId) -> Result<Resource>;

    fn get_records(&self, resource_id: &ResourceId, limit: usize) -> Result<Vec<Record>>;

    /// Public page of a dataset, e.g. `https://portal/dataset/<name>`.
    fn dataset_link(&self, name: &str) -> String;
}

/// Portal hosting a resource, taken from its link.
pub fn portal_of(resource_url: &str) -> Option<Url> {
    resource_url
        .parse::<ResourceReference>()
        .ok()
        .and_then(|reference| reference.portal)
}

pub trait LinkChecker {
    fn is_link_alive(&self, link: &str) -> bool;
}

impl Catalog for Client {
    fn search_datasets(&self, start: usize, rows: usize) -> Result<SearchPage> {
        Client::search_datasets(self, start, rows)
    }

    fn get_dataset(&self, dataset: &str) -> Result<Dataset> {
        Client::get_dataset(self, dataset)
    }

    fn get_resource(&self, resource_id: &ResourceId) -> Result<Resource> {
        Client::get_resource(self, resource_id)
    }

    fn get_records(&self, resource_id: &ResourceId, limit: usize) -> Result<Vec<Record>> {
        Client::get_records(self, resource_id, limit)
    }

    fn dataset_link(&self, name: &str) -> String {
        match Client::dataset_link(self, name) {
            Ok(link) => link.to_string(),
            Err(_) => format!(
                "{}/dataset/{}",
                self.base_url().as_str().trim_end_matches('/'),
                name
            ),
        }
    }
}

impl LinkChecker for Client {
    fn is_link_alive(&self, link: &str) -> bool {
        Client::is_link_alive(self, link)
    }
}
