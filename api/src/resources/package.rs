use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::resources::{nullable_string, resource::Resource, value_to_string};

/// A CKAN dataset ("package") as returned by `package_show` and `package_search`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct Dataset {
    pub id: Id,

    /// Technical name, the slug used in dataset URLs.
    #[serde(default)]
    pub name: String,

    #[serde(default, deserialize_with = "nullable_string")]
    pub title: String,

    #[serde(default)]
    pub organization: Option<Organization>,

    #[serde(default, deserialize_with = "nullable_string")]
    pub notes: String,

    #[serde(default)]
    pub private: bool,

    #[serde(default, rename = "type", deserialize_with = "nullable_string")]
    pub kind: String,

    #[serde(default, deserialize_with = "nullable_string")]
    pub metadata_created: String,

    #[serde(default, deserialize_with = "nullable_string")]
    pub metadata_modified: String,

    #[serde(default)]
    pub tags: Vec<Tag>,

    #[serde(default)]
    pub groups: Vec<Group>,

    #[serde(default)]
    pub extras: Vec<Extra>,

    #[serde(default)]
    pub resources: Vec<Resource>,

    #[serde(default)]
    pub num_resources: Option<usize>,
}

impl Dataset {
    /// The title if there is one, otherwise the technical name.
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            &self.name
        } else {
            &self.title
        }
    }

    pub fn organization_title(&self) -> &str {
        self.organization
            .as_ref()
            .map_or("", |organization| organization.display_title())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct Id(pub String);

impl Display for Id {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FmtResult {
        write!(formatter, "{}", self.0)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Organization {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, deserialize_with = "nullable_string")]
    pub title: String,
}

impl Organization {
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.name
        } else {
            &self.title
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Group {
    #[serde(default)]
    pub name: String,

    #[serde(default, deserialize_with = "nullable_string")]
    pub title: String,
}

impl Group {
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.name
        } else {
            &self.title
        }
    }
}

/// Free-form key/value metadata attached to a dataset.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct Extra {
    pub key: String,

    #[serde(default)]
    pub value: Value,
}

impl Extra {
    pub fn value_string(&self) -> String {
        value_to_string(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_deserialize_package_show_result() {
        let dataset: Dataset = serde_json::from_value(json!({
            "id": "0b9c6a4e-7f0e-4c1f-9d3b-1c2d3e4f5a6b",
            "name": "censo-escolar",
            "title": "Censo Escolar 2021",
            "organization": {"id": "org-1", "name": "seduc", "title": "Secretaria da Educação"},
            "notes": null,
            "private": false,
            "type": "dataset",
            "metadata_created": "2021-03-04T12:00:00.123456",
            "metadata_modified": "2022-01-02T08:30:00",
            "tags": [{"name": "educação", "id": "t1"}],
            "groups": [{"name": "educacao", "title": "Educação"}],
            "extras": [{"key": "frequencia", "value": "anual"}, {"key": "ano", "value": 2021}],
            "resources": [{"id": "r1", "name": "Matrículas", "format": "CSV", "url": "https://portal/r1.csv"}],
            "num_resources": 1,
            "unknown_field": {"ignored": true}
        }))
        .unwrap();

        assert_eq!(dataset.name, "censo-escolar");
        assert_eq!(dataset.notes, "");
        assert_eq!(dataset.kind, "dataset");
        assert_eq!(dataset.organization_title(), "Secretaria da Educação");
        assert_eq!(dataset.tags[0].name, "educação");
        assert_eq!(dataset.groups[0].display_title(), "Educação");
        assert_eq!(dataset.extras[1].value_string(), "2021");
        assert_eq!(dataset.resources.len(), 1);
    }

    #[test]
    fn test_display_title_falls_back_to_name() {
        let dataset: Dataset =
            serde_json::from_value(json!({"id": "x", "name": "sem-titulo", "title": "  "}))
                .unwrap();
        assert_eq!(dataset.display_title(), "sem-titulo");
        assert_eq!(dataset.organization_title(), "");
    }
}
