use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};

const DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Timestamp {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Timestamp {
    fn date(&self) -> NaiveDate {
        match self {
            Timestamp::Date(date) => *date,
            Timestamp::DateTime(date_time) => date_time.date(),
        }
    }
}

fn parse_timestamp(value: &str) -> Option<Timestamp> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(date_time) = DateTime::parse_from_rfc3339(value) {
        return Some(Timestamp::DateTime(date_time.naive_local()));
    }
    DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(Timestamp::DateTime)
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
                .map(Timestamp::Date)
        })
}

/// `dd/mm/YYYY`, or an empty string when `value` is not a recognised date.
pub fn format_date(value: &str) -> String {
    match parse_timestamp(value) {
        Some(Timestamp::Date(date)) => date.format("%d/%m/%Y").to_string(),
        Some(Timestamp::DateTime(date_time)) => date_time.format("%d/%m/%Y").to_string(),
        None => String::new(),
    }
}

/// `dd/mm/YYYY HH:MM`, dropping the time when the source has none.
pub fn format_date_time(value: &str) -> String {
    match parse_timestamp(value) {
        Some(Timestamp::Date(date)) => date.format("%d/%m/%Y").to_string(),
        Some(Timestamp::DateTime(date_time)) => date_time.format("%d/%m/%Y %H:%M").to_string(),
        None => String::new(),
    }
}

/// Datasets modified more than `stale_after_days` days before `today` are
/// outdated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    pub today: NaiveDate,
    pub stale_after_days: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Freshness {
    /// `None` when the dataset has no readable modification date.
    pub days_since_update: Option<i64>,
    pub up_to_date: bool,
}

impl Freshness {
    pub fn label(&self) -> &'static str {
        if self.up_to_date {
            "Atualizado"
        } else {
            "Desatualizado"
        }
    }
}

impl FreshnessPolicy {
    pub fn as_of_today(stale_after_days: u32) -> Self {
        FreshnessPolicy {
            today: Local::now().date_naive(),
            stale_after_days,
        }
    }

    pub fn assess(&self, modified: &str) -> Freshness {
        let days_since_update = parse_timestamp(modified)
            .map(|timestamp| (self.today - timestamp.date()).num_days().max(0));
        Freshness {
            days_since_update,
            up_to_date: days_since_update
                .is_some_and(|days| days <= i64::from(self.stale_after_days)),
        }
    }
}
