//! The mail-merge run: configs, recipients, enrichment, preview, send,
//! contacts update. Strictly sequential; each step logs its completion.

use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::{bail, Context};

use crate::cli::{Cli, Command, SendArgs};
use crate::config;
use crate::contacts;
use crate::google_api;
use crate::mailer;
use crate::phonebook::{self, Source};
use crate::template;

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Auth { credentials } => {
            let email = google_api::auth::run_consent_flow(credentials.as_deref())
                .await
                .context("Google authentication failed")?;
            log::info!("Authenticated as {}", email);
            Ok(())
        }
        Command::Send(args) => send(args).await,
    }
}

async fn send(args: SendArgs) -> anyhow::Result<()> {
    let config = config::load(&args.config)
        .with_context(|| format!("loading config {}", args.config.display()))?;
    log::info!("Loaded credentials flow complete");

    let mut recipients = args.recipients.clone();
    if recipients.is_empty() {
        if let Some(ref path) = args.recipients_path {
            recipients = read_recipients(path)?;
        }
    }
    if recipients.is_empty() {
        bail!("No recipients: pass --recipient or --recipients-path");
    }
    if args.test_mode {
        log::info!(
            "Running in test mode. Emails will be sent to {}",
            args.sender
        );
    }

    let email_config = match args.email_config {
        Some(ref path) => config::load_email(path)
            .with_context(|| format!("loading email config {}", path.display()))?,
        None => config::EmailConfig::default(),
    };

    let subject = args
        .subject
        .clone()
        .or_else(|| email_config.subject.clone())
        .context("No subject: pass --subject or set one in the email config")?;

    let transport = mailer::connect(&args.sender, &config.credentials.gmail.app_password)?;
    log::info!("SMTP connection flow complete");

    // Enrich every recipient; failures are per-entry and logged.
    let source = Source::resolve(
        args.local_phonebook.clone(),
        config
            .credentials
            .peopledatalabs
            .as_ref()
            .map(|c| c.api_key.clone()),
        config
            .credentials
            .clearbit
            .as_ref()
            .map(|c| c.api_key.clone()),
    )?;
    let details = phonebook::lookup_all(&source, &recipients).await?;
    log::info!(
        "Recipient details fetched for {} of {} recipients",
        details.len(),
        recipients.len()
    );

    let bodies: HashMap<String, String> = match args.body {
        Some(ref body) => recipients
            .iter()
            .map(|r| (r.clone(), body.clone()))
            .collect(),
        None => {
            let path = args
                .body_path
                .as_ref()
                .context("No body: pass --body or --body-path")?;
            let body_template = std::fs::read_to_string(path)
                .with_context(|| format!("reading body template {}", path.display()))?;
            template::build_bodies(&details, &body_template, &email_config.string_vars())
                .into_iter()
                .collect()
        }
    };

    // Warn about recipients already in the contacts database.
    let access_token = google_api::get_valid_access_token()
        .await
        .context("Google access token")?;
    let (fresh, repeated) = contacts::cross_check(
        &access_token,
        &args.spreadsheet_id,
        &args.worksheet,
        &recipients,
    )
    .await
    .context("cross-checking recipients against the contacts database")?;

    if !repeated.is_empty() {
        log::warn!(
            "Found {} recipients already in the database: {:?}",
            repeated.len(),
            repeated
        );
        if !args.yes && confirm("Exclude these recipients from the send?")? {
            recipients = fresh;
            if recipients.is_empty() {
                log::warn!("Everyone was excluded; nothing to send");
                return Ok(());
            }
        }
    }

    // Preview the first body before committing to the send.
    let _preview = match recipients.first().map(|r| body_for(&bodies, r)) {
        Some(body) if !body.is_empty() => Some(mailer::preview_in_browser(body)?),
        _ => {
            log::warn!("No body to preview");
            None
        }
    };

    let proceed =
        args.yes || confirm(&format!("Send emails to {:?}?", recipients))?;
    if !proceed {
        log::warn!("Messages not sent");
        return Ok(());
    }

    for recipient in &recipients {
        mailer::send_message(
            &transport,
            &args.sender,
            recipient,
            &subject,
            body_for(&bodies, recipient),
            &args.attachments,
            args.test_mode,
        )
        .with_context(|| format!("sending to {}", recipient))?;
    }
    log::info!("Sent {} messages", recipients.len());

    // Update the contacts database for the recipients actually sent to.
    // Failures here are logged and reported, never fatal for the run.
    if args.test_mode {
        log::info!("Test mode: contacts database not updated");
        return Ok(());
    }
    let sent: Vec<(String, phonebook::PersonDetails)> = details
        .into_iter()
        .filter(|(email, _)| recipients.iter().any(|r| r == email))
        .collect();
    let update = async {
        let access_token = google_api::get_valid_access_token().await?;
        contacts::update_contacts(
            &access_token,
            &args.spreadsheet_id,
            &args.worksheet,
            &sent,
            &config.columns,
        )
        .await
        .map_err(anyhow::Error::from)
    };
    match update.await {
        Ok(contacts::UpdateOutcome::Written { rows }) => {
            log::info!("Contacts database updated ({} rows)", rows)
        }
        Ok(contacts::UpdateOutcome::SkippedNoData) => {
            log::info!("No enriched records this run; contacts database untouched")
        }
        Err(e) => log::error!("Something went wrong writing to the contacts database: {:#}", e),
    }

    Ok(())
}

fn body_for<'m>(bodies: &'m HashMap<String, String>, recipient: &str) -> &'m str {
    bodies.get(recipient).map(String::as_str).unwrap_or("")
}

/// One-column CSV of recipient addresses, no header.
fn read_recipients(path: &Path) -> anyhow::Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("reading recipients {}", path.display()))?;

    let mut recipients = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(first) = record.get(0) {
            let trimmed = first.trim();
            if !trimmed.is_empty() {
                recipients.push(trimmed.to_string());
            }
        }
    }
    Ok(recipients)
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    print!("{} (y to confirm) ", prompt);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim() == "y")
}
