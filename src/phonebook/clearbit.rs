//! Clearbit combined person+company lookup.

use serde::Deserialize;

use super::{PersonDetails, PhonebookError};

const COMBINED_FIND_URL: &str = "https://person.clearbit.com/v2/combined/find";

#[derive(Debug, Default, Deserialize)]
struct CombinedResponse {
    #[serde(default)]
    person: Option<Person>,
    #[serde(default)]
    company: Option<Company>,
}

#[derive(Debug, Default, Deserialize)]
struct Person {
    #[serde(default)]
    name: PersonName,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersonName {
    #[serde(default)]
    given_name: Option<String>,
    #[serde(default)]
    family_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Company {
    #[serde(default)]
    name: Option<String>,
}

/// Fetch person + company details for one email. The API key is the HTTP
/// basic-auth username, no password.
pub async fn lookup(
    client: &reqwest::Client,
    api_key: &str,
    email: &str,
) -> Result<PersonDetails, PhonebookError> {
    let resp = client
        .get(COMBINED_FIND_URL)
        .query(&[("email", email)])
        .basic_auth(api_key, Option::<&str>::None)
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        return Err(PhonebookError::Lookup {
            email: email.to_string(),
            reason: format!("HTTP {}", status.as_u16()),
        });
    }

    let body: CombinedResponse = resp.json().await?;
    let name = body.person.map(|p| p.name).unwrap_or_default();

    Ok(PersonDetails {
        first_name: name.given_name,
        last_name: name.family_name,
        company: body.company.and_then(|c| c.name),
    })
}
