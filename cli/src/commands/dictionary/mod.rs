//! Builds the Word data dictionary of a datastore resource.
mod columns;
mod template;
mod title;

use anyhow::{Context, Result};
use ckan_client::{Client, Dataset, Resource, ResourceReference};
use log::{info, warn};
use reqwest::Url;
use std::{
    fs,
    path::{Path, PathBuf},
};
use structopt::StructOpt;

use self::{
    template::DictionaryDocument,
    title::{document_title, output_file_name, title_label},
};
use crate::{
    catalog::{portal_of, Catalog},
    config::BiaPineConfig,
    errors::{self, Error},
};

pub use self::columns::profile_columns;

/// Maximum number of datastore rows read to profile the columns.
pub const RECORD_LIMIT: usize = 5000;

#[derive(Debug, StructOpt)]
pub struct DictionaryArgs {
    /// Link to the resource page, e.g.
    /// `https://dadosabertos.go.gov.br/dataset/<dataset>/resource/<resource>`
    pub resource_url: String,

    #[structopt(long = "template", parse(from_os_str))]
    /// Word template to fill. Defaults to the one in the config file.
    pub template: Option<PathBuf>,

    #[structopt(long = "output-dir", parse(from_os_str))]
    /// Directory where the dictionary is written. Defaults to the current
    /// directory.
    pub output_dir: Option<PathBuf>,
}

impl DictionaryArgs {
    /// Portal hosting the resource, if the link names one.
    pub fn portal(&self) -> Option<Url> {
        portal_of(&self.resource_url)
    }
}

pub fn run(args: &DictionaryArgs, client: &Client, config: &BiaPineConfig) -> Result<()> {
    let template_path = args.template.as_ref().unwrap_or(&config.template);
    let output_dir = args
        .output_dir
        .clone()
        .or_else(|| config.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));

    let output_path = build_dictionary(client, &args.resource_url, template_path, &output_dir)
        .with_context(|| format!("Could not build the data dictionary of `{}`", args.resource_url))?;

    info!("Data dictionary written to `{}`", output_path.display());
    println!("{}", output_path.display());
    Ok(())
}

/// Fill `template_path` with the column profile of the resource behind
/// `resource_url` and save it in `output_dir`, returning the new file's path.
///
/// Nothing is written unless every step succeeds.
pub fn build_dictionary(
    catalog: &impl Catalog,
    resource_url: &str,
    template_path: &Path,
    output_dir: &Path,
) -> errors::Result<PathBuf> {
    let reference: ResourceReference = resource_url.parse().map_err(Error::from_client)?;

    let dataset = catalog
        .get_dataset(&reference.dataset_id.0)
        .map_err(Error::Upstream)?;
    let label = title_label(&dataset.title);
    let title = document_title(&label);

    let resource = match catalog.get_resource(&reference.resource_id) {
        Ok(resource) => Some(resource),
        Err(error) => {
            warn!(
                "Could not get resource `{}`, its description will not be used: {}",
                reference.resource_id.0, error
            );
            None
        }
    };
    let description = describe(resource.as_ref(), &dataset, &label);

    let records = catalog
        .get_records(&reference.resource_id, RECORD_LIMIT)
        .map_err(Error::Upstream)?;
    let columns = profile_columns(&records);
    info!(
        "Profiled {} columns from {} records of resource `{}`",
        columns.len(),
        records.len(),
        reference.resource_id.0
    );

    let document = template::render(
        template_path,
        &DictionaryDocument {
            title: &title,
            description: &description,
            columns: &columns,
        },
    )?;

    fs::create_dir_all(output_dir).map_err(|source| Error::Output {
        path: output_dir.to_owned(),
        source,
    })?;
    let output_path = output_dir.join(output_file_name(&title));
    fs::write(&output_path, document).map_err(|source| Error::Output {
        path: output_path.clone(),
        source,
    })?;
    Ok(output_path)
}

fn describe(resource: Option<&Resource>, dataset: &Dataset, label: &str) -> String {
    resource
        .map(|resource| resource.description.trim())
        .filter(|description| !description.is_empty())
        .or_else(|| Some(dataset.notes.trim()).filter(|notes| !notes.is_empty()))
        .map(str::to_owned)
        .unwrap_or_else(|| format!("DADOS DA BASE: {label}"))
}

#[cfg(test)]
mod tests {
    use super::{template::fixtures::*, *};
    use crate::catalog::fake::FakeCatalog;
    use ckan_client::{DatasetId, Record, ResourceId};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::{collections::HashMap, io::Read};

    const RESOURCE_URL: &str =
        "https://dadosabertos.go.gov.br/dataset/censo-escolar/resource/4b2c-99aa";

    fn catalog() -> FakeCatalog {
        let records: Vec<Record> = serde_json::from_value(json!([
            {"_id": 1, "codigo_ibge": "5208707", "municipio": "Goiânia"},
            {"_id": 2, "codigo_ibge": "5201108", "municipio": "Anápolis"},
        ]))
        .unwrap();
        FakeCatalog {
            datasets: vec![Dataset {
                id: DatasetId("censo-escolar".to_owned()),
                name: "censo-escolar".to_owned(),
                title: "Educação Censo 2021 março".to_owned(),
                notes: "Notas do conjunto".to_owned(),
                ..Default::default()
            }],
            resources: HashMap::from([(
                "4b2c-99aa".to_owned(),
                Resource {
                    id: ResourceId("4b2c-99aa".to_owned()),
                    description: "Matrículas por município".to_owned(),
                    ..Default::default()
                },
            )]),
            records: HashMap::from([("4b2c-99aa".to_owned(), records)]),
            ..Default::default()
        }
    }

    fn read_document_xml(path: &Path) -> String {
        let mut archive = zip::ZipArchive::new(fs::File::open(path).unwrap()).unwrap();
        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        xml
    }

    #[test]
    fn test_build_dictionary() {
        let directory = tempfile::tempdir().unwrap();
        let template_path = directory.path().join("modelo.docx");
        write_docx(&template_path, &template_xml());
        let output_dir = directory.path().join("saida");

        let output_path =
            build_dictionary(&catalog(), RESOURCE_URL, &template_path, &output_dir).unwrap();

        assert_eq!(
            output_path,
            output_dir.join("DICIONÁRIO_DE_DADOS_EDUCAÇÃO_CENSO.docx")
        );
        let xml = read_document_xml(&output_path);
        assert!(xml.contains("DICIONÁRIO DE DADOS EDUCAÇÃO CENSO"));
        assert!(xml.contains("Descrição: Matrículas por município"));
        assert_eq!(
            table_texts(&xml)[1][1..].to_vec(),
            vec![
                vec!["_id", "NUMÉRICO", " ID"],
                vec!["codigo_ibge", "NUMÉRICO", "CODIGO IBGE"],
                vec!["municipio", "TEXTO", "MUNICIPIO"],
            ]
            .into_iter()
            .map(|row| row.into_iter().map(str::to_owned).collect::<Vec<_>>())
            .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_invalid_link_fails_before_any_request() {
        let catalog = catalog();
        let directory = tempfile::tempdir().unwrap();
        for link in [
            "https://dadosabertos.go.gov.br/dataset/censo-escolar",
            "https://dadosabertos.go.gov.br/resource/4b2c-99aa",
        ] {
            let result = build_dictionary(
                &catalog,
                link,
                &directory.path().join("modelo.docx"),
                directory.path(),
            );
            assert!(matches!(result, Err(Error::InvalidInput(_))), "{link}");
        }
        assert_eq!(catalog.show_calls.get(), 0);
        assert_eq!(catalog.records_calls.get(), 0);
    }

    #[test]
    fn test_missing_resource_metadata_is_not_fatal() {
        let mut catalog = catalog();
        catalog.resources.clear();
        let directory = tempfile::tempdir().unwrap();
        let template_path = directory.path().join("modelo.docx");
        write_docx(&template_path, &template_xml());

        let output_path =
            build_dictionary(&catalog, RESOURCE_URL, &template_path, directory.path()).unwrap();
        assert!(read_document_xml(&output_path).contains("Descrição: Notas do conjunto"));
    }

    #[test]
    fn test_datastore_failure_is_upstream_error() {
        let mut catalog = catalog();
        catalog.records.clear();
        let directory = tempfile::tempdir().unwrap();
        let template_path = directory.path().join("modelo.docx");
        write_docx(&template_path, &template_xml());

        let result = build_dictionary(&catalog, RESOURCE_URL, &template_path, directory.path());
        assert!(matches!(result, Err(Error::Upstream(_))));
    }

    #[test]
    fn test_missing_template_writes_nothing() {
        let directory = tempfile::tempdir().unwrap();
        let output_dir = directory.path().join("saida");
        let result = build_dictionary(
            &catalog(),
            RESOURCE_URL,
            &directory.path().join("nao-existe.docx"),
            &output_dir,
        );
        assert!(matches!(result, Err(Error::TemplateNotFound(_))));
        assert!(!output_dir.exists());
    }

    #[test]
    fn test_description_priority() {
        let dataset = Dataset {
            notes: "  Notas  ".to_owned(),
            ..Default::default()
        };
        let resource = Resource {
            description: "Recurso".to_owned(),
            ..Default::default()
        };
        let blank = Resource {
            description: "   ".to_owned(),
            ..Default::default()
        };

        assert_eq!(describe(Some(&resource), &dataset, "CENSO"), "Recurso");
        assert_eq!(describe(Some(&blank), &dataset, "CENSO"), "Notas");
        assert_eq!(describe(None, &dataset, "CENSO"), "Notas");
        assert_eq!(
            describe(None, &Dataset::default(), "CENSO"),
            "DADOS DA BASE: CENSO"
        );
    }

    #[test]
    fn test_portal_from_link() {
        let args = DictionaryArgs {
            resource_url: RESOURCE_URL.to_owned(),
            template: None,
            output_dir: None,
        };
        assert_eq!(
            args.portal().map(|portal| portal.to_string()),
            Some("https://dadosabertos.go.gov.br/".to_owned())
        );
    }
}
