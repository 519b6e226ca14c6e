use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One row of a datastore table, keys in the order the portal sent them.
pub type Record = Map<String, Value>;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SearchResult {
    #[serde(default)]
    pub records: Vec<Record>,

    #[serde(default)]
    pub total: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SearchQuery<'a> {
    pub resource_id: &'a str,
    pub limit: usize,
}

/// Column names of a set of records in first-seen order.
pub fn column_names(records: &[Record]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !columns.iter().any(|column| column == key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}
