//! One inventory row per (dataset, resource) pair.
use ckan_client::{value_to_string, Dataset, Resource};
use itertools::Itertools;
use serde_json::Value;

use super::dates::{format_date, format_date_time, Freshness, FreshnessPolicy};
use crate::catalog::LinkChecker;

pub const HEADERS: [&str; 31] = [
    "ID_Base",
    "Nome_da_Base",
    "Nome_Tecnico",
    "Link_Base",
    "ID_Orgao",
    "Orgao",
    "Descricao_Base",
    "Privado",
    "Tipo",
    "Data_Criacao",
    "Ultima_Atualizacao",
    "Tags",
    "Grupos",
    "Extras",
    "Quantidade_de_Recursos",
    "Quantidade_CSV",
    "Quantidade_XLSX",
    "Quantidade_PDF",
    "Quantidade_JSON",
    "Formatos",
    "Quantidade_ErroLeitura",
    "ID_Recurso",
    "Nome_Recurso",
    "Formato_Recurso",
    "URL_Recurso",
    "Status_URL_Recurso",
    "Data_Publicacao_Recurso",
    "Tamanho_Recurso_Bytes",
    "Descricao_Recurso",
    "Dias_Desde_Atualizacao",
    "Status_Atualizacao",
];

/// Figures computed over all the resources of a dataset and repeated on each
/// of its rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetAggregates {
    pub resource_count: usize,
    pub csv_count: usize,
    pub xlsx_count: usize,
    pub pdf_count: usize,
    pub json_count: usize,
    /// Distinct upper-cased formats in first-seen order.
    pub formats: String,
    /// Always 0 when links are not checked.
    pub broken_links: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Unchecked,
    Alive,
    Broken,
}

impl LinkStatus {
    pub fn label(&self) -> &'static str {
        match self {
            LinkStatus::Unchecked => "",
            LinkStatus::Alive => "OK",
            LinkStatus::Broken => "ERRO",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InventoryRow {
    pub dataset_id: String,
    pub dataset_title: String,
    pub dataset_name: String,
    pub dataset_link: String,
    pub organization_id: String,
    pub organization: String,
    pub dataset_description: String,
    pub private: bool,
    pub kind: String,
    pub created: String,
    pub modified: String,
    pub tags: String,
    pub groups: String,
    pub extras: String,
    pub aggregates: DatasetAggregates,
    pub resource_id: String,
    pub resource_name: String,
    pub resource_format: String,
    pub resource_url: String,
    pub link_status: LinkStatus,
    pub resource_created: String,
    /// A number when the portal reports one.
    pub resource_size: Value,
    pub resource_description: String,
    pub freshness: Freshness,
}

impl InventoryRow {
    /// Cells in `HEADERS` order. Counts, sizes and ages are numbers so the
    /// spreadsheet can sum and filter them.
    pub fn to_record(&self) -> Vec<Value> {
        let aggregates = &self.aggregates;
        vec![
            Value::from(self.dataset_id.as_str()),
            Value::from(self.dataset_title.as_str()),
            Value::from(self.dataset_name.as_str()),
            Value::from(self.dataset_link.as_str()),
            Value::from(self.organization_id.as_str()),
            Value::from(self.organization.as_str()),
            Value::from(self.dataset_description.as_str()),
            Value::from(if self.private { "Sim" } else { "Não" }),
            Value::from(self.kind.as_str()),
            Value::from(self.created.as_str()),
            Value::from(self.modified.as_str()),
            Value::from(self.tags.as_str()),
            Value::from(self.groups.as_str()),
            Value::from(self.extras.as_str()),
            Value::from(aggregates.resource_count),
            Value::from(aggregates.csv_count),
            Value::from(aggregates.xlsx_count),
            Value::from(aggregates.pdf_count),
            Value::from(aggregates.json_count),
            Value::from(aggregates.formats.as_str()),
            Value::from(aggregates.broken_links),
            Value::from(self.resource_id.as_str()),
            Value::from(self.resource_name.as_str()),
            Value::from(self.resource_format.as_str()),
            Value::from(self.resource_url.as_str()),
            Value::from(self.link_status.label()),
            Value::from(self.resource_created.as_str()),
            self.resource_size.clone(),
            Value::from(self.resource_description.as_str()),
            self.freshness
                .days_since_update
                .map_or_else(|| Value::from(""), Value::from),
            Value::from(self.freshness.label()),
        ]
    }
}

/// Sizes arrive as numbers, numeric strings or `null`.
fn size_cell(size: &Value) -> Value {
    match size {
        Value::Number(_) => size.clone(),
        Value::String(text) => text
            .trim()
            .parse::<u64>()
            .map_or_else(|_| Value::from(text.trim()), Value::from),
        other => Value::from(value_to_string(other)),
    }
}

fn count_format(resources: &[Resource], format: &str) -> usize {
    resources
        .iter()
        .filter(|resource| resource.format.trim().eq_ignore_ascii_case(format))
        .count()
}

/// Check every resource link when a checker is given, one request per link.
fn link_statuses(resources: &[Resource], link_checker: Option<&dyn LinkChecker>) -> Vec<LinkStatus> {
    resources
        .iter()
        .map(|resource| match link_checker {
            None => LinkStatus::Unchecked,
            Some(checker) if checker.is_link_alive(resource.url.trim()) => LinkStatus::Alive,
            Some(_) => LinkStatus::Broken,
        })
        .collect()
}

fn aggregate(resources: &[Resource], statuses: &[LinkStatus]) -> DatasetAggregates {
    DatasetAggregates {
        resource_count: resources.len(),
        csv_count: count_format(resources, "CSV"),
        xlsx_count: count_format(resources, "XLSX"),
        pdf_count: count_format(resources, "PDF"),
        json_count: count_format(resources, "JSON"),
        formats: resources
            .iter()
            .map(|resource| resource.format.trim().to_uppercase())
            .filter(|format| !format.is_empty())
            .unique()
            .join(", "),
        broken_links: statuses
            .iter()
            .filter(|status| **status == LinkStatus::Broken)
            .count(),
    }
}

/// Flatten a dataset into one row per resource; datasets without resources
/// produce no rows.
pub fn flatten_dataset(
    dataset: &Dataset,
    dataset_link: &str,
    link_checker: Option<&dyn LinkChecker>,
    freshness_policy: &FreshnessPolicy,
) -> Vec<InventoryRow> {
    let statuses = link_statuses(&dataset.resources, link_checker);
    let aggregates = aggregate(&dataset.resources, &statuses);
    let freshness = freshness_policy.assess(&dataset.metadata_modified);

    let tags = dataset.tags.iter().map(|tag| tag.name.as_str()).join(", ");
    let groups = dataset
        .groups
        .iter()
        .map(|group| group.display_title())
        .join(", ");
    let extras = dataset
        .extras
        .iter()
        .map(|extra| format!("{}={}", extra.key, extra.value_string()))
        .join("; ");

    dataset
        .resources
        .iter()
        .zip(statuses)
        .map(|(resource, link_status)| InventoryRow {
            dataset_id: dataset.id.0.clone(),
            dataset_title: dataset.title.clone(),
            dataset_name: dataset.name.clone(),
            dataset_link: dataset_link.to_owned(),
            organization_id: dataset
                .organization
                .as_ref()
                .map(|organization| organization.id.clone())
                .unwrap_or_default(),
            organization: dataset.organization_title().to_owned(),
            dataset_description: dataset.notes.clone(),
            private: dataset.private,
            kind: dataset.kind.clone(),
            created: format_date(&dataset.metadata_created),
            modified: format_date(&dataset.metadata_modified),
            tags: tags.clone(),
            groups: groups.clone(),
            extras: extras.clone(),
            aggregates: aggregates.clone(),
            resource_id: resource.id.0.clone(),
            resource_name: resource.name.clone(),
            resource_format: resource.format.clone(),
            resource_url: resource.url.clone(),
            link_status,
            resource_created: format_date_time(&resource.created),
            resource_size: size_cell(&resource.size),
            resource_description: resource.description.clone(),
            freshness,
        })
        .collect()
}
