use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use url::Url;

use crate::{
    error::{Error, Result},
    resources::{nullable_string, package::Id as DatasetId},
};

/// A single downloadable file or data endpoint belonging to a dataset.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct Resource {
    #[serde(default)]
    pub id: Id,

    #[serde(default, deserialize_with = "nullable_string")]
    pub name: String,

    #[serde(default, deserialize_with = "nullable_string")]
    pub format: String,

    #[serde(default, deserialize_with = "nullable_string")]
    pub url: String,

    #[serde(default, deserialize_with = "nullable_string")]
    pub created: String,

    #[serde(default, deserialize_with = "nullable_string")]
    pub last_modified: String,

    /// Portals send this as a number, a string or `null`.
    #[serde(default)]
    pub size: Value,

    #[serde(default, deserialize_with = "nullable_string")]
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct Id(pub String);

static RESOURCE_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/resource/([a-zA-Z0-9-]+)").expect("regex is well-formed"));

static DATASET_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/dataset/([a-zA-Z0-9-]+)").expect("regex is well-formed"));

/// Identifies a resource through its portal link, e.g.
/// `https://portal/dataset/<dataset>/resource/<resource>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub resource_id: Id,
    pub dataset_id: DatasetId,

    /// Everything before `/dataset/` in the link.
    pub portal: Option<Url>,
}

impl FromStr for Reference {
    type Err = Error;

    fn from_str(link: &str) -> Result<Self> {
        let resource_id = RESOURCE_SEGMENT
            .captures(link)
            .map(|captures| Id(captures[1].to_owned()))
            .ok_or_else(|| Error::BadResourceUrl {
                url: link.to_owned(),
            })?;

        let dataset_match = DATASET_SEGMENT
            .captures(link)
            .ok_or_else(|| Error::BadDatasetUrl {
                url: link.to_owned(),
            })?;
        let dataset_id = DatasetId(dataset_match[1].to_owned());

        let prefix_end = dataset_match.get(0).map_or(0, |whole| whole.start());
        let portal = Url::parse(&link[..prefix_end]).ok();

        Ok(Reference {
            resource_id,
            dataset_id,
            portal,
        })
    }
}
