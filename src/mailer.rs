//! Gmail SMTP submission and message preview.
//!
//! One message per recipient, HTML body, optional attachments. Test mode
//! reroutes everything to the sender's own inbox so a dry run exercises the
//! full path without emailing anyone else.

use std::io::Write;
use std::path::{Path, PathBuf};

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

const SMTP_HOST: &str = "smtp.gmail.com";

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("SMTP: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Bad address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Message build: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("Attachment type: {0}")]
    ContentType(#[from] lettre::message::header::ContentTypeErr),

    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
}

/// Open an authenticated TLS transport to Gmail. The password is a Gmail
/// app password, not the account password.
pub fn connect(sender: &str, app_password: &str) -> Result<SmtpTransport, MailError> {
    let creds = Credentials::new(sender.to_string(), app_password.to_string());
    Ok(SmtpTransport::relay(SMTP_HOST)?.credentials(creds).build())
}

/// Build one HTML message with optional attachments.
pub fn build_message(
    sender: &str,
    recipient: &str,
    subject: &str,
    html_body: &str,
    attachments: &[PathBuf],
) -> Result<Message, MailError> {
    let from: Mailbox = sender.parse()?;
    let to: Mailbox = recipient.parse()?;

    let mut parts = MultiPart::mixed().singlepart(SinglePart::html(html_body.to_string()));
    for path in attachments {
        let data = std::fs::read(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "attachment".to_string());
        let content_type = ContentType::parse(guess_content_type(path))?;
        parts = parts.singlepart(Attachment::new(filename).body(data, content_type));
        log::info!("Attached {}", path.display());
    }

    Ok(Message::builder()
        .from(from)
        .to(to)
        .subject(subject)
        .multipart(parts)?)
}

/// Send one message. In test mode the recipient is replaced by the sender.
pub fn send_message(
    transport: &SmtpTransport,
    sender: &str,
    recipient: &str,
    subject: &str,
    html_body: &str,
    attachments: &[PathBuf],
    test_mode: bool,
) -> Result<(), MailError> {
    let actual_recipient = if test_mode {
        log::info!("Test mode: rerouting message for {} to {}", recipient, sender);
        sender
    } else {
        recipient
    };

    let message = build_message(sender, actual_recipient, subject, html_body, attachments)?;
    transport.send(&message)?;
    log::info!("Message sent to {}", actual_recipient);
    Ok(())
}

/// Write the body to a temp HTML file and open it in the default browser.
/// The returned handle deletes the file when dropped.
pub fn preview_in_browser(html_body: &str) -> Result<tempfile::TempPath, MailError> {
    let mut file = tempfile::Builder::new()
        .prefix("outreach-preview-")
        .suffix(".html")
        .tempfile()?;
    file.write_all(html_body.as_bytes())?;
    let path = file.into_temp_path();
    open::that(&*path)?;
    Ok(path)
}

/// Content type from the file extension, octet-stream when unknown.
fn guess_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html",
        "txt" | "md" => "text/plain",
        "csv" => "text/csv",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_guessing_by_extension() {
        assert_eq!(guess_content_type(Path::new("report.pdf")), "application/pdf");
        assert_eq!(guess_content_type(Path::new("photo.JPG")), "image/jpeg");
        assert_eq!(guess_content_type(Path::new("notes.txt")), "text/plain");
        assert_eq!(
            guess_content_type(Path::new("mystery.bin")),
            "application/octet-stream"
        );
        assert_eq!(
            guess_content_type(Path::new("no-extension")),
            "application/octet-stream"
        );
    }

    #[test]
    fn message_carries_subject_and_recipient() {
        let message = build_message(
            "me@example.com",
            "you@example.com",
            "Hello there",
            "<p>Hi</p>",
            &[],
        )
        .unwrap();

        let rendered = String::from_utf8(message.formatted()).unwrap();
        assert!(rendered.contains("Subject: Hello there"));
        assert!(rendered.contains("To: you@example.com"));
        assert!(rendered.contains("From: me@example.com"));
    }

    #[test]
    fn attachment_is_embedded() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        file.write_all(b"attachment body").unwrap();
        file.flush().unwrap();

        let message = build_message(
            "me@example.com",
            "you@example.com",
            "With attachment",
            "<p>See attached</p>",
            &[file.path().to_path_buf()],
        )
        .unwrap();

        let rendered = String::from_utf8(message.formatted()).unwrap();
        assert!(rendered.contains("Content-Disposition: attachment"));
    }

    #[test]
    fn bad_recipient_address_is_an_error() {
        let result = build_message("me@example.com", "not an address", "s", "b", &[]);
        assert!(matches!(result, Err(MailError::Address(_))));
    }
}
