//! Record normalizer: enrichment details to contact rows.

use chrono::NaiveDate;

use super::table::Table;
use super::contact_columns;
use crate::phonebook::PersonDetails;

/// Build the new-batch table from enriched recipient details.
///
/// One row per entry, dated today. Entries whose key is not an email
/// address are logged and skipped; they never abort the batch. Returns
/// `None` when nothing normalized — the no-data sentinel that tells the
/// caller to skip the write-back entirely.
pub fn records_from_details(details: &[(String, PersonDetails)]) -> Option<Table> {
    records_with_date(details, chrono::Local::now().date_naive())
}

/// As `records_from_details`, with an injected stamp date.
pub fn records_with_date(details: &[(String, PersonDetails)], today: NaiveDate) -> Option<Table> {
    let stamp = today.format("%Y-%m-%d").to_string();
    let mut table = Table::new(contact_columns());

    for (email, detail) in details {
        if !looks_like_email(email) {
            log::warn!("Malformed recipient key {:?}, skipping", email);
            continue;
        }
        let field = |value: &Option<String>| Some(value.clone().unwrap_or_default());
        let row = vec![
            Some(stamp.clone()),
            field(&detail.first_name),
            field(&detail.last_name),
            Some(email.clone()),
            field(&detail.company),
            Some(stamp.clone()),
            Some(stamp.clone()),
        ];
        // Row shape is fixed above; a width error here is a programming bug.
        if let Err(e) = table.push_row(row) {
            log::error!("Dropping row for {}: {}", email, e);
        }
    }

    if table.is_empty() {
        None
    } else {
        Some(table)
    }
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn details(first: Option<&str>, last: Option<&str>, company: Option<&str>) -> PersonDetails {
        PersonDetails {
            first_name: first.map(str::to_string),
            last_name: last.map(str::to_string),
            company: company.map(str::to_string),
        }
    }

    #[test]
    fn builds_one_dated_row_per_entry() {
        let batch = vec![
            ("a@x.com".to_string(), details(Some("Ann"), Some("Lee"), Some("Acme"))),
            ("b@y.com".to_string(), details(Some("Bea"), None, None)),
        ];

        let table = records_with_date(&batch, date()).unwrap();
        assert_eq!(table.columns(), contact_columns());
        assert_eq!(table.len(), 2);

        let col = |name: &str| table.column_index(name).unwrap();
        let row = &table.rows()[0];
        assert_eq!(row[col("CREATEDATETIME")].as_deref(), Some("2024-06-01"));
        assert_eq!(row[col("EMAIL")].as_deref(), Some("a@x.com"));
        assert_eq!(row[col("FIRST_OUTREACH")].as_deref(), Some("2024-06-01"));
        assert_eq!(row[col("LAST_OUTREACH")].as_deref(), Some("2024-06-01"));

        // Missing fields default to empty strings, not nulls.
        let row = &table.rows()[1];
        assert_eq!(row[col("LAST_NAME")].as_deref(), Some(""));
        assert_eq!(row[col("COMPANY")].as_deref(), Some(""));
    }

    #[test]
    fn malformed_keys_are_skipped_not_fatal() {
        let batch = vec![
            ("not-an-email".to_string(), details(Some("X"), None, None)),
            ("b@y.com".to_string(), details(Some("Bea"), None, None)),
        ];

        let table = records_with_date(&batch, date()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.rows()[0][table.column_index("EMAIL").unwrap()].as_deref(),
            Some("b@y.com")
        );
    }

    #[test]
    fn empty_batch_yields_the_no_data_sentinel() {
        assert!(records_with_date(&[], date()).is_none());

        // All entries skipped is also no data — distinct from an empty table.
        let batch = vec![("bogus".to_string(), PersonDetails::default())];
        assert!(records_with_date(&batch, date()).is_none());
    }
}
