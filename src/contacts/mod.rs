//! The contacts "database": a spreadsheet-backed table of everyone ever
//! contacted, updated by three-way reconciliation after each send.
//!
//! The stored schema is fixed; `EMAIL` is the natural key. The table is
//! read fresh at the start of an update, merged in memory, and written back
//! wholesale — no locking, last writer wins.

pub mod normalize;
pub mod reconcile;
pub mod table;

use self::reconcile::MergeConfig;
use self::table::Table;

use crate::google_api::{self, sheets};
use crate::phonebook::PersonDetails;

/// Stored column order. The write-back emits columns exactly in this order.
pub const CONTACT_COLUMNS: [&str; 7] = [
    "CREATEDATETIME",
    "FIRST_NAME",
    "LAST_NAME",
    "EMAIL",
    "COMPANY",
    "LAST_OUTREACH",
    "FIRST_OUTREACH",
];

/// The natural key column.
pub const EMAIL_COLUMN: &str = "EMAIL";

pub fn contact_columns() -> Vec<String> {
    CONTACT_COLUMNS.iter().map(|c| c.to_string()).collect()
}

#[derive(Debug, thiserror::Error)]
pub enum ContactsError {
    #[error("Contacts table: {0}")]
    Table(#[from] table::TableError),

    #[error("Contacts sink: {0}")]
    Sink(#[from] google_api::GoogleApiError),
}

/// What an update run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Nothing normalized from the batch; the sink was never touched.
    SkippedNoData,
    /// The reconciled table was written back.
    Written { rows: usize },
}

/// Update the contacts table from this run's enriched recipient details.
///
/// Normalize the batch (skipping the write-back entirely on the no-data
/// sentinel), read the stored table, reconcile, write back from A1.
pub async fn update_contacts(
    access_token: &str,
    spreadsheet_id: &str,
    worksheet: &str,
    details: &[(String, PersonDetails)],
    config: &MergeConfig,
) -> Result<UpdateOutcome, ContactsError> {
    let new_rows = match normalize::records_from_details(details) {
        Some(table) => table,
        None => {
            log::info!("No contact records in this batch, database untouched");
            return Ok(UpdateOutcome::SkippedNoData);
        }
    };

    let client = reqwest::Client::new();
    let stored = sheets::read_all_rows(&client, access_token, spreadsheet_id, worksheet).await?;

    // A never-written worksheet has no header row; seed the schema.
    let original = if stored.columns().is_empty() {
        Table::new(contact_columns())
    } else {
        stored
    };

    let updated = reconcile::reconcile(&new_rows, &original, config)?;
    sheets::write_rows(&client, access_token, spreadsheet_id, worksheet, &updated, 1).await?;

    log::info!(
        "Pushed {} contact rows to worksheet {} of {}",
        updated.len(),
        worksheet,
        spreadsheet_id
    );
    Ok(UpdateOutcome::Written {
        rows: updated.len(),
    })
}

/// Split recipients into (not yet contacted, already contacted) by
/// membership of the stored EMAIL column.
pub fn split_contacted(recipients: &[String], stored: &Table) -> (Vec<String>, Vec<String>) {
    let known: Vec<String> = match stored.column_values(EMAIL_COLUMN) {
        Ok(values) => values.into_iter().flatten().collect(),
        // Fresh sheet with no schema yet: nobody has been contacted.
        Err(_) => Vec::new(),
    };

    let mut fresh = Vec::new();
    let mut repeated = Vec::new();
    for recipient in recipients {
        if known.iter().any(|k| k == recipient) {
            repeated.push(recipient.clone());
        } else {
            fresh.push(recipient.clone());
        }
    }
    (fresh, repeated)
}

/// Read the stored table and cross-check a recipient list against it.
pub async fn cross_check(
    access_token: &str,
    spreadsheet_id: &str,
    worksheet: &str,
    recipients: &[String],
) -> Result<(Vec<String>, Vec<String>), ContactsError> {
    let client = reqwest::Client::new();
    let stored = sheets::read_all_rows(&client, access_token, spreadsheet_id, worksheet).await?;
    Ok(split_contacted(recipients, &stored))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_contacted_partitions_by_stored_email() {
        let stored = Table::with_rows(
            contact_columns(),
            vec![vec![
                Some("2024-01-01".to_string()),
                Some("Ann".to_string()),
                Some("Lee".to_string()),
                Some("a@x.com".to_string()),
                Some("Acme".to_string()),
                Some("2024-01-01".to_string()),
                Some("2024-01-01".to_string()),
            ]],
        )
        .unwrap();

        let recipients = vec!["a@x.com".to_string(), "b@y.com".to_string()];
        let (fresh, repeated) = split_contacted(&recipients, &stored);
        assert_eq!(fresh, vec!["b@y.com".to_string()]);
        assert_eq!(repeated, vec!["a@x.com".to_string()]);
    }

    #[test]
    fn split_contacted_with_empty_sheet_keeps_everyone() {
        let stored = Table::new(Vec::new());
        let recipients = vec!["a@x.com".to_string()];
        let (fresh, repeated) = split_contacted(&recipients, &stored);
        assert_eq!(fresh.len(), 1);
        assert!(repeated.is_empty());
    }
}
