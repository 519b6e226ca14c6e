//! Filling the Word template of the data dictionary.
//!
//! A `.docx` file is a zip archive; everything the dictionary touches lives in
//! `word/document.xml`. The rewrite works on element spans of the
//! WordprocessingML markup (`w:p` paragraphs, `w:tbl` tables, `w:tr` rows,
//! `w:tc` cells, `w:r` runs and `w:t` text nodes) and copies every other part
//! of the archive unchanged.
use std::{
    fs::File,
    io::{BufReader, Cursor, Read, Write},
    ops::Range,
    path::Path,
};
use zip::{result::ZipError, write::SimpleFileOptions, ZipArchive, ZipWriter};

use crate::{
    commands::dictionary::columns::ColumnProfile,
    errors::{Error, Result},
};

const DOCUMENT_PART: &str = "word/document.xml";

pub const TITLE_PLACEHOLDER: &str = "{{ titulo_documento }}";
pub const DESCRIPTION_PLACEHOLDER: &str = "{{ descricao_base }}";
pub const TABLE_HEADER: [&str; 3] = ["CAMPO/COLUNA", "TIPO", "DESCRIÇÃO"];

pub struct DictionaryDocument<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub columns: &'a [ColumnProfile],
}

/// Render the dictionary into a copy of the template, returning the bytes of
/// the new `.docx` file.
pub fn render(template_path: &Path, document: &DictionaryDocument<'_>) -> Result<Vec<u8>> {
    if !template_path.exists() {
        return Err(Error::TemplateNotFound(template_path.to_owned()));
    }
    let bad_archive = |error: ZipError| {
        Error::TemplateFormat(format!(
            "`{}` is not a Word document: {error}",
            template_path.display()
        ))
    };

    let file = File::open(template_path).map_err(|error| {
        Error::TemplateFormat(format!(
            "could not open `{}`: {error}",
            template_path.display()
        ))
    })?;
    let mut archive = ZipArchive::new(BufReader::new(file)).map_err(bad_archive)?;

    let mut document_xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(bad_archive)?
        .read_to_string(&mut document_xml)
        .map_err(|error| Error::TemplateFormat(format!("unreadable {DOCUMENT_PART}: {error}")))?;
    let document_xml = fill_document_xml(&document_xml, document)?;

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(bad_archive)?;
        let name = entry.name().to_owned();
        let options = SimpleFileOptions::default().compression_method(entry.compression());

        if entry.is_dir() {
            writer.add_directory(name, options).map_err(bad_archive)?;
            continue;
        }

        let mut contents = Vec::new();
        if name == DOCUMENT_PART {
            contents.extend_from_slice(document_xml.as_bytes());
        } else {
            entry.read_to_end(&mut contents).map_err(|error| {
                Error::TemplateFormat(format!("unreadable part `{name}`: {error}"))
            })?;
        }
        writer.start_file(name, options).map_err(bad_archive)?;
        writer
            .write_all(&contents)
            .map_err(|error| Error::TemplateFormat(error.to_string()))?;
    }

    Ok(writer.finish().map_err(bad_archive)?.into_inner())
}

/// Apply the placeholders and the column table to the main document part.
pub fn fill_document_xml(xml: &str, document: &DictionaryDocument<'_>) -> Result<String> {
    let xml = replace_placeholders(
        xml,
        &[
            (TITLE_PLACEHOLDER, document.title),
            (DESCRIPTION_PLACEHOLDER, document.description),
        ],
    );
    let rows: Vec<[&str; 3]> = document
        .columns
        .iter()
        .map(|column| {
            [
                column.name.as_str(),
                column.inferred_type.label(),
                column.display_label.as_str(),
            ]
        })
        .collect();
    fill_dictionary_table(&xml, &rows)
}

fn replace_placeholders(xml: &str, replacements: &[(&str, &str)]) -> String {
    let mut edits = Vec::new();
    collect_placeholder_edits(xml, 0..xml.len(), replacements, &mut edits);
    edits.sort_by_key(|(text_node, _)| text_node.start);

    let mut output = String::with_capacity(xml.len());
    let mut copied_up_to = 0;
    for (text_node, replacement) in edits {
        output.push_str(&xml[copied_up_to..text_node.start]);
        output.push_str(&replacement);
        copied_up_to = text_node.end;
    }
    output.push_str(&xml[copied_up_to..]);
    output
}

/// For every paragraph in `scope` whose own text holds a placeholder, put the
/// replaced text into its first text node and empty the others, so a
/// placeholder split over several runs is replaced as a whole. Paragraphs
/// nested in text boxes are handled on their own.
fn collect_placeholder_edits(
    xml: &str,
    scope: Range<usize>,
    replacements: &[(&str, &str)],
    edits: &mut Vec<(Range<usize>, String)>,
) {
    for paragraph in element_spans(xml, "w:p", scope) {
        let paragraph_inner = inner_range(xml, &paragraph);
        let nested = element_spans(xml, "w:p", paragraph_inner.clone());
        let text_nodes = own_text_nodes(xml, paragraph_inner.clone(), &nested);

        let text: String = text_nodes
            .iter()
            .map(|text_node| unescape_text(&xml[inner_range(xml, text_node)]))
            .collect();
        if replacements
            .iter()
            .any(|(placeholder, _)| text.contains(placeholder))
        {
            let replaced = replacements
                .iter()
                .fold(text, |text, (placeholder, value)| {
                    text.replace(placeholder, value)
                });
            for (index, text_node) in text_nodes.into_iter().enumerate() {
                let replacement = if index == 0 {
                    text_node_xml(&replaced)
                } else {
                    "<w:t/>".to_owned()
                };
                edits.push((text_node, replacement));
            }
        }

        if !nested.is_empty() {
            collect_placeholder_edits(xml, paragraph_inner, replacements, edits);
        }
    }
}

/// Text nodes of a paragraph, leaving out those of the paragraphs nested in it.
fn own_text_nodes(
    xml: &str,
    paragraph_inner: Range<usize>,
    nested: &[Range<usize>],
) -> Vec<Range<usize>> {
    let mut text_nodes = Vec::new();
    let mut gap_start = paragraph_inner.start;
    for paragraph in nested {
        text_nodes.extend(element_spans(xml, "w:t", gap_start..paragraph.start));
        gap_start = paragraph.end;
    }
    text_nodes.extend(element_spans(xml, "w:t", gap_start..paragraph_inner.end));
    text_nodes
}

fn fill_dictionary_table(xml: &str, rows: &[[&str; 3]]) -> Result<String> {
    for table in element_spans(xml, "w:tbl", 0..xml.len()) {
        let table_rows = element_spans(xml, "w:tr", inner_range(xml, &table));
        let header = match table_rows.first() {
            Some(header) => header.clone(),
            None => continue,
        };
        if !is_dictionary_header(xml, header.clone()) {
            continue;
        }

        let last_row_end = table_rows.last().map_or(header.end, |row| row.end);
        let row_template = table_rows.get(1).unwrap_or(&header).clone();
        let row_template = xml[row_template].replace("<w:tblHeader/>", "");

        let mut output = String::with_capacity(xml.len() + rows.len() * row_template.len());
        output.push_str(&xml[..header.end]);
        for row in rows {
            output.push_str(&fill_row(&row_template, row));
        }
        output.push_str(&xml[last_row_end..]);
        return Ok(output);
    }

    Err(Error::TemplateFormat(format!(
        "no table with the header {} was found",
        TABLE_HEADER.join(" | ")
    )))
}

fn is_dictionary_header(xml: &str, row: Range<usize>) -> bool {
    let cells: Vec<String> = element_spans(xml, "w:tc", row)
        .into_iter()
        .map(|cell| text_of(xml, cell).trim().to_uppercase())
        .collect();
    cells.len() == TABLE_HEADER.len()
        && cells
            .iter()
            .zip(TABLE_HEADER.iter())
            .all(|(cell, expected)| cell == expected)
}

fn fill_row(row_template: &str, values: &[&str; 3]) -> String {
    let mut output = String::with_capacity(row_template.len());
    let mut copied_up_to = 0;

    for (cell, value) in element_spans(row_template, "w:tc", 0..row_template.len())
        .into_iter()
        .zip(values.iter())
    {
        output.push_str(&row_template[copied_up_to..cell.start]);
        output.push_str(&set_cell_text(row_template, cell.clone(), value));
        copied_up_to = cell.end;
    }

    output.push_str(&row_template[copied_up_to..]);
    output
}

/// Replace the content of a cell with a single paragraph holding `text`,
/// keeping the cell, paragraph and run properties of the first paragraph.
fn set_cell_text(xml: &str, cell: Range<usize>, text: &str) -> String {
    let cell_inner = inner_range(xml, &cell);
    let paragraphs = element_spans(xml, "w:p", cell_inner.clone());
    let first_paragraph = match paragraphs.first() {
        Some(paragraph) => paragraph.clone(),
        None => {
            return format!(
                "{}<w:p><w:r>{}</w:r></w:p>{}",
                &xml[cell.start..cell_inner.end],
                text_node_xml(text),
                &xml[cell_inner.end..cell.end]
            )
        }
    };
    let last_paragraph_end = paragraphs.last().map_or(first_paragraph.end, |p| p.end);

    let paragraph_inner = inner_range(xml, &first_paragraph);
    let paragraph_properties = element_spans(xml, "w:pPr", paragraph_inner.clone())
        .into_iter()
        .next()
        .map_or("", |span| &xml[span]);
    let run = match element_spans(xml, "w:r", paragraph_inner).into_iter().next() {
        Some(run) => {
            let run_properties = element_spans(xml, "w:rPr", inner_range(xml, &run))
                .into_iter()
                .next()
                .map_or("", |span| &xml[span]);
            format!(
                "{}{}{}</w:r>",
                opening_tag(xml, &run),
                run_properties,
                text_node_xml(text)
            )
        }
        None => format!("<w:r>{}</w:r>", text_node_xml(text)),
    };

    format!(
        "{}{}{}{}</w:p>{}",
        &xml[cell.start..first_paragraph.start],
        opening_tag(xml, &first_paragraph),
        paragraph_properties,
        run,
        &xml[last_paragraph_end..cell.end]
    )
}

fn text_node_xml(text: &str) -> String {
    format!("<w:t xml:space=\"preserve\">{}</w:t>", escape_text(text))
}

/// Concatenated content of the `w:t` nodes inside `span`.
fn text_of(xml: &str, span: Range<usize>) -> String {
    element_spans(xml, "w:t", span)
        .into_iter()
        .map(|text_node| unescape_text(&xml[inner_range(xml, &text_node)]))
        .collect()
}

/// Byte ranges of the outermost `tag` elements (start of the opening tag to
/// the end of the closing tag) found in `xml[scope]`.
fn element_spans(xml: &str, tag: &str, scope: Range<usize>) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut element_start = 0;
    let mut position = scope.start;

    while let Some(offset) = xml[position..scope.end].find('<') {
        let open = position + offset;
        let close = match xml[open..scope.end].find('>') {
            Some(offset) => open + offset + 1,
            None => break,
        };
        let markup = &xml[open + 1..close - 1];

        if let Some(name) = markup.strip_prefix('/') {
            if name.trim_end() == tag && depth > 0 {
                depth -= 1;
                if depth == 0 {
                    spans.push(element_start..close);
                }
            }
        } else if tag_name(markup) == tag {
            if depth == 0 {
                element_start = open;
            }
            if markup.ends_with('/') {
                if depth == 0 {
                    spans.push(open..close);
                }
            } else {
                depth += 1;
            }
        }
        position = close;
    }

    spans
}

fn tag_name(markup: &str) -> &str {
    let end = markup
        .find(|char: char| char.is_whitespace() || char == '/')
        .unwrap_or(markup.len());
    &markup[..end]
}

fn opening_tag<'a>(xml: &'a str, element: &Range<usize>) -> &'a str {
    let end = xml[element.clone()]
        .find('>')
        .map_or(element.end, |offset| element.start + offset + 1);
    &xml[element.start..end]
}

/// Content between the opening and the closing tag; empty for `<tag/>`.
fn inner_range(xml: &str, element: &Range<usize>) -> Range<usize> {
    let opening = opening_tag(xml, element);
    if opening.ends_with("/>") {
        return element.end..element.end;
    }
    let start = element.start + opening.len();
    let end = xml[start..element.end]
        .rfind("</")
        .map_or(element.end, |offset| start + offset);
    start..end
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn unescape_text(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(ampersand) = rest.find('&') {
        output.push_str(&rest[..ampersand]);
        rest = &rest[ampersand..];
        let entity_end = match rest.find(';') {
            Some(end) => end,
            None => break,
        };
        let entity = &rest[1..entity_end];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                .and_then(char::from_u32),
        };
        match decoded {
            Some(char) => {
                output.push(char);
                rest = &rest[entity_end + 1..];
            }
            None => {
                output.push('&');
                rest = &rest[1..];
            }
        }
    }
    output.push_str(rest);
    output
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::{element_spans, text_of, DOCUMENT_PART};
    use std::{fs::File, io::Write, path::Path};
    use zip::{write::SimpleFileOptions, ZipWriter};

    pub const BODY_START: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>"#;
    pub const BODY_END: &str = "<w:sectPr/></w:body></w:document>";

    pub fn cell(text: &str) -> String {
        format!(
            r#"<w:tc><w:tcPr><w:tcW w:w="3000" w:type="dxa"/></w:tcPr><w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:rPr><w:b/></w:rPr><w:t>{text}</w:t></w:r></w:p></w:tc>"#
        )
    }

    pub fn row(texts: &[&str]) -> String {
        format!(
            "<w:tr>{}</w:tr>",
            texts.iter().map(|text| cell(text)).collect::<String>()
        )
    }

    pub fn template_xml() -> String {
        format!(
            "{BODY_START}{}{}<w:tbl><w:tblPr/>{}</w:tbl><w:tbl><w:tblPr/>{}{}{}</w:tbl>{BODY_END}",
            r#"<w:p><w:r><w:t>{{ titulo_</w:t></w:r><w:r><w:rPr><w:i/></w:rPr><w:t>documento }}</w:t></w:r></w:p>"#,
            r#"<w:p><w:r><w:t xml:space="preserve">Descrição: {{ descricao_base }}</w:t></w:r></w:p>"#,
            row(&["Outra", "Tabela"]),
            row(&[" campo/coluna ", "Tipo", "Descrição"]),
            row(&["exemplo", "TEXTO", "EXEMPLO"]),
            row(&["exemplo 2", "TEXTO", "EXEMPLO 2"]),
        )
    }

    pub fn table_texts(xml: &str) -> Vec<Vec<Vec<String>>> {
        element_spans(xml, "w:tbl", 0..xml.len())
            .into_iter()
            .map(|table| {
                element_spans(xml, "w:tr", table)
                    .into_iter()
                    .map(|row| {
                        element_spans(xml, "w:tc", row)
                            .into_iter()
                            .map(|cell| text_of(xml, cell))
                            .collect()
                    })
                    .collect()
            })
            .collect()
    }

    pub fn write_docx(path: &Path, document_xml: &str) {
        let mut writer = ZipWriter::new(File::create(path).unwrap());
        let options = SimpleFileOptions::default();
        writer.start_file("[Content_Types].xml", options).unwrap();
        writer.write_all(b"<Types/>").unwrap();
        writer.add_directory("word/", options).unwrap();
        writer.start_file(DOCUMENT_PART, options).unwrap();
        writer.write_all(document_xml.as_bytes()).unwrap();
        writer.finish().unwrap();
    }
}
