use once_cell::sync::Lazy;
use regex::Regex;

pub const TITLE_PREFIX: &str = "DICIONÁRIO DE DADOS";

static DATE_TOKENS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(\d{4}|\d{1,2}|janeiro|fevereiro|março|marco|abril|maio|junho|julho|agosto|setembro|outubro|novembro|dezembro)\b",
    )
    .expect("regex is well-formed")
});

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("regex is well-formed"));

fn normalize_once(title: &str) -> String {
    let without_dates = DATE_TOKENS.replace_all(title, "");
    let letters: String = without_dates
        .chars()
        .filter(|char| char.is_alphabetic() || char.is_whitespace())
        .collect();
    WHITESPACE
        .replace_all(letters.trim(), " ")
        .to_uppercase()
}

/// Dataset title without years, day numbers, month names or any character
/// that is not a letter, in upper case.
///
/// Removing digits can glue a month name back together (`"MAR2ÇO"`), so the
/// normalisation runs until it reaches a fixed point.
pub fn title_label(title: &str) -> String {
    let mut label = normalize_once(title);
    loop {
        let next = normalize_once(&label);
        if next == label {
            return label;
        }
        label = next;
    }
}

pub fn document_title(label: &str) -> String {
    if label.is_empty() {
        TITLE_PREFIX.to_owned()
    } else {
        format!("{TITLE_PREFIX} {label}")
    }
}

pub fn output_file_name(document_title: &str) -> String {
    format!("{}.docx", document_title.replace(' ', "_"))
}
