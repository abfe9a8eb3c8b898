//! Local CSV phonebook with fuzzy substring lookup.
//!
//! Cells and search needles are both normalized the same way (lowercased,
//! with separators and punctuation stripped) before matching, so
//! `jane.doe@acme.com` finds a row whose EMAIL cell differs only in case or
//! punctuation.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use super::{PersonDetails, PhonebookError};

const FIRST_NAME_COLUMN: &str = "FIRST_NAME";
const LAST_NAME_COLUMN: &str = "LAST_NAME";
const COMPANY_COLUMN: &str = "COMPANY";

/// Separators stripped before matching.
fn strip_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"_|\s+|-|:|/|\.|@").expect("static pattern"))
}

fn normalize(value: &str) -> String {
    strip_pattern().replace_all(value, "").to_lowercase()
}

/// A row-oriented phonebook loaded from CSV.
pub struct LocalPhonebook {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl LocalPhonebook {
    pub fn load(path: &Path) -> Result<Self, PhonebookError> {
        let mut reader = csv::Reader::from_path(path)?;
        let columns = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(|cell| cell.to_string()).collect());
        }

        Ok(Self { columns, rows })
    }

    /// First row with any cell containing the normalized needle.
    pub fn find(&self, needle: &str) -> Option<PersonDetails> {
        let needle = normalize(needle);
        if needle.is_empty() {
            return None;
        }
        self.rows
            .iter()
            .find(|row| row.iter().any(|cell| normalize(cell).contains(&needle)))
            .map(|row| self.details_from_row(row))
    }

    fn details_from_row(&self, row: &[String]) -> PersonDetails {
        let field = |name: &str| -> Option<String> {
            self.columns
                .iter()
                .position(|c| c == name)
                .and_then(|i| row.get(i))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        PersonDetails {
            first_name: field(FIRST_NAME_COLUMN),
            last_name: field(LAST_NAME_COLUMN),
            company: field(COMPANY_COLUMN),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_phonebook(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn normalization_strips_separators_and_case() {
        assert_eq!(normalize("Jane.Doe@Acme.com"), "janedoeacmecom");
        assert_eq!(normalize("first_name - last"), "firstnamelast");
    }

    #[test]
    fn find_matches_despite_punctuation_differences() {
        let file = write_phonebook(
            "FIRST_NAME,LAST_NAME,COMPANY,EMAIL\n\
             Jane,Doe,Acme,jane.doe@acme.com\n\
             Bob,Kim,Globex,bob@globex.io\n",
        );
        let phonebook = LocalPhonebook::load(file.path()).unwrap();

        let details = phonebook.find("Jane-Doe@ACME.com").unwrap();
        assert_eq!(details.first_name.as_deref(), Some("Jane"));
        assert_eq!(details.last_name.as_deref(), Some("Doe"));
        assert_eq!(details.company.as_deref(), Some("Acme"));
    }

    #[test]
    fn find_returns_none_for_unknown_email() {
        let file = write_phonebook("FIRST_NAME,LAST_NAME,COMPANY,EMAIL\nJane,Doe,Acme,jane@acme.com\n");
        let phonebook = LocalPhonebook::load(file.path()).unwrap();
        assert!(phonebook.find("nobody@nowhere.dev").is_none());
    }

    #[test]
    fn empty_cells_become_absent_fields() {
        let file = write_phonebook("FIRST_NAME,LAST_NAME,COMPANY,EMAIL\nJane,,,jane@acme.com\n");
        let phonebook = LocalPhonebook::load(file.path()).unwrap();
        let details = phonebook.find("jane@acme.com").unwrap();
        assert_eq!(details.first_name.as_deref(), Some("Jane"));
        assert!(details.last_name.is_none());
        assert!(details.company.is_none());
    }
}
