//! Body templating: `{variable}` placeholders filled from a variable map.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::phonebook::PersonDetails;

/// The per-recipient variable holding the recipient's first name.
pub const ADDRESSEE_VAR: &str = "addressee";

fn placeholder() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{([^{}]+)\}").expect("static pattern"))
}

/// Fill `{variable}` placeholders from the map. Lookup ignores case;
/// unknown variables fill with the empty string. With no variables at all
/// the text passes through unchanged.
pub fn fill(text: &str, vars: &BTreeMap<String, String>) -> String {
    if vars.is_empty() {
        return text.to_string();
    }

    let lowered: BTreeMap<String, &str> = vars
        .iter()
        .map(|(key, value)| (key.to_lowercase(), value.as_str()))
        .collect();

    placeholder()
        .replace_all(text, |caps: &regex::Captures| {
            lowered
                .get(&caps[1].to_lowercase())
                .copied()
                .unwrap_or("")
                .to_string()
        })
        .into_owned()
}

/// Build one body per enriched recipient: the template filled with the
/// shared variables plus `addressee` set to the recipient's first name.
pub fn build_bodies(
    details: &[(String, PersonDetails)],
    template: &str,
    vars: &BTreeMap<String, String>,
) -> Vec<(String, String)> {
    details
        .iter()
        .map(|(email, detail)| {
            let mut vars = vars.clone();
            vars.insert(
                ADDRESSEE_VAR.to_string(),
                detail.first_name.clone().unwrap_or_default(),
            );
            (email.clone(), fill(template, &vars))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn fill_replaces_known_variables() {
        let out = fill("Hi {addressee}, greetings from {signature}.", &vars(&[
            ("addressee", "Jane"),
            ("signature", "Bob"),
        ]));
        assert_eq!(out, "Hi Jane, greetings from Bob.");
    }

    #[test]
    fn fill_is_case_insensitive_and_defaults_to_empty() {
        let out = fill("Hi {Addressee}, re {UNKNOWN}.", &vars(&[("addressee", "Jane")]));
        assert_eq!(out, "Hi Jane, re .");
    }

    #[test]
    fn fill_without_vars_passes_through() {
        let text = "Hi {addressee}";
        assert_eq!(fill(text, &BTreeMap::new()), text);
    }

    #[test]
    fn build_bodies_personalizes_the_addressee() {
        let details = vec![
            (
                "jane@acme.com".to_string(),
                PersonDetails {
                    first_name: Some("Jane".to_string()),
                    last_name: Some("Doe".to_string()),
                    company: Some("Acme".to_string()),
                },
            ),
            ("bob@globex.io".to_string(), PersonDetails::default()),
        ];

        let bodies = build_bodies(&details, "<p>Hi {addressee},</p>", &vars(&[]));
        assert_eq!(bodies[0].1, "<p>Hi Jane,</p>");
        // Missing first name fills with nothing rather than failing.
        assert_eq!(bodies[1].1, "<p>Hi ,</p>");
    }
}
