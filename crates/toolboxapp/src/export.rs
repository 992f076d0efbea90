//! # Export
//!
//! Records leave the app as either a pretty JSON array or CSV. The CSV dialect
//! is fixed: a header row, every field double-quoted with inner quotes
//! doubled, `\n` between rows.

use crate::error::Result;
use crate::records::academic::AcademicResource;
use crate::records::identity::IdentityProfile;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    /// Picks the format from a file extension; anything but `.csv` is JSON.
    pub fn from_filename(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => ExportFormat::Csv,
            _ => ExportFormat::Json,
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(format!("unknown export format '{other}'")),
        }
    }
}

/// A record with a fixed CSV column layout.
pub trait CsvRecord {
    const HEADERS: &'static [&'static str];

    fn fields(&self) -> Vec<String>;
}

impl CsvRecord for IdentityProfile {
    const HEADERS: &'static [&'static str] = &[
        "ID",
        "First Name",
        "Last Name",
        "Gender",
        "Birthday",
        "SSN",
        "Phone",
        "Email",
        "Street",
        "City",
        "State",
        "ZIP",
    ];

    fn fields(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.first_name.clone(),
            self.last_name.clone(),
            self.gender.clone(),
            self.birthday.clone(),
            self.ssn.clone(),
            self.phone.clone(),
            self.email.clone(),
            self.address.street.clone(),
            self.address.city.clone(),
            self.address.state_abbreviation.clone(),
            self.address.zip_code.clone(),
        ]
    }
}

impl CsvRecord for AcademicResource {
    const HEADERS: &'static [&'static str] =
        &["ID", "Name", "URL", "Description", "Category", "Tags"];

    fn fields(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.url.clone(),
            self.description.clone(),
            self.category.clone(),
            self.tags.join(", "),
        ]
    }
}

pub fn to_json<T: Serialize>(records: &[T]) -> Result<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn csv_row<S: AsRef<str>>(fields: &[S]) -> String {
    fields
        .iter()
        .map(|f| quote(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn to_csv<T: CsvRecord>(records: &[T]) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(csv_row(T::HEADERS));
    lines.extend(records.iter().map(|r| csv_row(&r.fields())));
    lines.join("\n")
}

pub fn render<T: Serialize + CsvRecord>(records: &[T], format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Json => to_json(records),
        ExportFormat::Csv => Ok(to_csv(records)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::identity::Address;

    fn sample_identity() -> IdentityProfile {
        IdentityProfile {
            id: "identity-1-abc".to_string(),
            first_name: "Ann".to_string(),
            last_name: "O\"Neil".to_string(),
            address: Address {
                city: "Portland, OR".to_string(),
                state_abbreviation: "OR".to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn csv_quotes_every_field_and_doubles_quotes() {
        let csv = to_csv(&[sample_identity()]);
        let lines: Vec<&str> = csv.split('\n').collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("\"ID\",\"First Name\""));
        assert!(lines[1].contains("\"O\"\"Neil\""));
        assert!(lines[1].contains("\"Portland, OR\""));
        assert_eq!(lines[1].matches("\",\"").count(), IdentityProfile::HEADERS.len() - 1);
    }

    #[test]
    fn empty_export_is_header_only() {
        let csv = to_csv::<AcademicResource>(&[]);
        assert_eq!(csv, "\"ID\",\"Name\",\"URL\",\"Description\",\"Category\",\"Tags\"");
    }

    #[test]
    fn resource_tags_join_into_one_column() {
        let resource = AcademicResource {
            name: "arXiv".to_string(),
            tags: vec!["physics".to_string(), "math".to_string()],
            ..Default::default()
        };
        assert!(to_csv(&[resource]).ends_with("\"physics, math\""));
    }

    #[test]
    fn json_is_a_pretty_array() {
        let json = to_json(&[sample_identity()]).unwrap();
        assert!(json.starts_with("[\n"));
        let parsed: Vec<IdentityProfile> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0].last_name, "O\"Neil");
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(ExportFormat::from_filename(Path::new("out.CSV")), ExportFormat::Csv);
        assert_eq!(ExportFormat::from_filename(Path::new("out.json")), ExportFormat::Json);
        assert_eq!(ExportFormat::from_filename(Path::new("out")), ExportFormat::Json);
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
    }
}
