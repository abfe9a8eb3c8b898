//! "Who is this person" lookups.
//!
//! Three sources produce the same `PersonDetails` shape: the Clearbit
//! combined endpoint, the People Data Labs enrich endpoint, and a local CSV
//! phonebook searched by normalized substring match. Lookups are tolerant
//! per entry: a failed recipient is logged and skipped, never fatal for the
//! batch.

pub mod clearbit;
pub mod local;
pub mod pdl;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Per-recipient enrichment result. Absent fields stay `None`; the record
/// normalizer defaults them to empty strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonDetails {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
}

/// Errors from phonebook lookups.
#[derive(Debug, thiserror::Error)]
pub enum PhonebookError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Phonebook file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Phonebook CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Lookup failed for {email}: {reason}")]
    Lookup { email: String, reason: String },

    #[error("No enrichment source configured: pass a local phonebook or an API key")]
    NoSource,
}

/// Which enrichment source a run uses.
#[derive(Debug, Clone)]
pub enum Source {
    /// Local CSV phonebook.
    Local(PathBuf),
    /// People Data Labs person enrich API.
    PeopleDataLabs { api_key: String },
    /// Clearbit combined person+company API.
    Clearbit { api_key: String },
}

impl Source {
    /// Pick the source for a run: an explicit local phonebook wins, then
    /// People Data Labs, then Clearbit.
    pub fn resolve(
        local_path: Option<PathBuf>,
        pdl_api_key: Option<String>,
        clearbit_api_key: Option<String>,
    ) -> Result<Source, PhonebookError> {
        if let Some(path) = local_path {
            return Ok(Source::Local(path));
        }
        if let Some(api_key) = pdl_api_key {
            return Ok(Source::PeopleDataLabs { api_key });
        }
        if let Some(api_key) = clearbit_api_key {
            return Ok(Source::Clearbit { api_key });
        }
        Err(PhonebookError::NoSource)
    }
}

/// Look up details for every recipient, in order.
///
/// Per-entry failures are logged with the offending email and skipped; the
/// returned list holds the successes only.
pub async fn lookup_all(
    source: &Source,
    emails: &[String],
) -> Result<Vec<(String, PersonDetails)>, PhonebookError> {
    let mut details = Vec::with_capacity(emails.len());

    match source {
        Source::Local(path) => {
            let phonebook = local::LocalPhonebook::load(path)?;
            for email in emails {
                match phonebook.find(email) {
                    Some(found) => details.push((email.clone(), found)),
                    None => log::warn!("No phonebook entry for {}, skipping", email),
                }
            }
        }
        Source::PeopleDataLabs { api_key } => {
            let client = reqwest::Client::new();
            for email in emails {
                match pdl::lookup(&client, api_key, email).await {
                    Ok(found) => details.push((email.clone(), found)),
                    Err(e) => log::warn!("Detail fetch failed for {}: {}. Skipping", email, e),
                }
            }
        }
        Source::Clearbit { api_key } => {
            let client = reqwest::Client::new();
            for email in emails {
                match clearbit::lookup(&client, api_key, email).await {
                    Ok(found) => details.push((email.clone(), found)),
                    Err(e) => log::warn!("Detail fetch failed for {}: {}. Skipping", email, e),
                }
            }
        }
    }

    Ok(details)
}

/// Tidy a fetched name: trim, then capitalize the first letter of every
/// alphanumeric run ("mary-jane  o'neil" becomes "Mary-Jane  O'Neil").
pub fn format_name(name: &str) -> String {
    let trimmed = name.trim();
    let mut formatted = String::with_capacity(trimmed.len());
    let mut at_boundary = true;
    for ch in trimmed.chars() {
        if ch.is_alphanumeric() {
            if at_boundary {
                formatted.extend(ch.to_uppercase());
            } else {
                formatted.push(ch);
            }
            at_boundary = false;
        } else {
            formatted.push(ch);
            at_boundary = true;
        }
    }
    formatted
}
