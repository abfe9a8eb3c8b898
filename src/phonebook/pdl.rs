//! People Data Labs person enrichment.

use serde::Deserialize;

use super::{format_name, PersonDetails, PhonebookError};

const ENRICH_URL: &str = "https://api.peopledatalabs.com/v5/person/enrich";

#[derive(Debug, Default, Deserialize)]
struct EnrichResponse {
    #[serde(default)]
    data: Option<EnrichData>,
}

#[derive(Debug, Default, Deserialize)]
struct EnrichData {
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    job_company_name: Option<String>,
}

/// Fetch person details for one email. PDL returns names lowercased, so
/// every field passes through the name formatter.
pub async fn lookup(
    client: &reqwest::Client,
    api_key: &str,
    email: &str,
) -> Result<PersonDetails, PhonebookError> {
    let resp = client
        .get(ENRICH_URL)
        .query(&[("api_key", api_key), ("email", email)])
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        return Err(PhonebookError::Lookup {
            email: email.to_string(),
            reason: format!("HTTP {}", status.as_u16()),
        });
    }

    let body: EnrichResponse = resp.json().await?;
    let data = body.data.ok_or_else(|| PhonebookError::Lookup {
        email: email.to_string(),
        reason: "no data in response".to_string(),
    })?;

    Ok(PersonDetails {
        first_name: data.first_name.as_deref().map(format_name),
        last_name: data.last_name.as_deref().map(format_name),
        company: data.job_company_name.as_deref().map(format_name),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enrich_response_formats_lowercased_fields() {
        let json = r#"{
            "status": 200,
            "data": {
                "first_name": "jane",
                "last_name": "doe",
                "job_company_name": "acme corp"
            }
        }"#;
        let body: EnrichResponse = serde_json::from_str(json).unwrap();
        let data = body.data.unwrap();
        assert_eq!(data.first_name.as_deref().map(format_name).as_deref(), Some("Jane"));
        assert_eq!(
            data.job_company_name.as_deref().map(format_name).as_deref(),
            Some("Acme Corp")
        );
    }

    #[test]
    fn enrich_response_without_data_is_detectable() {
        let body: EnrichResponse = serde_json::from_str(r#"{"status": 404}"#).unwrap();
        assert!(body.data.is_none());
    }
}
