use serde::{Deserialize, Serialize};

use crate::resources::package::Dataset;

/// Maximum page size the catalog crawl requests from `package_search`.
pub const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SearchPage {
    pub count: usize,

    #[serde(default)]
    pub results: Vec<Dataset>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SearchQuery {
    pub start: usize,
    pub rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ShowQuery<'a> {
    pub id: &'a str,
}
