//! Command-line surface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "outreach")]
#[command(about = "Personal mail merge backed by a spreadsheet contacts database", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the Google OAuth consent flow and store the token.
    Auth {
        /// OAuth client credentials JSON (defaults to ~/.outreach/google/credentials.json).
        #[arg(long)]
        credentials: Option<PathBuf>,
    },

    /// Send a mail-merge batch and update the contacts database.
    Send(SendArgs),
}

#[derive(Debug, Args)]
pub struct SendArgs {
    /// Tool config YAML: credentials and column roles.
    #[arg(short, long)]
    pub config: PathBuf,

    /// Spreadsheet key of the contacts database.
    #[arg(long = "db")]
    pub spreadsheet_id: String,

    /// Worksheet title inside the contacts spreadsheet.
    #[arg(long = "table", default_value = "Contacts")]
    pub worksheet: String,

    /// Sender address (the authenticated Gmail account).
    #[arg(short, long)]
    pub sender: String,

    /// Recipient email (repeatable).
    #[arg(short = 'r', long = "recipient")]
    pub recipients: Vec<String>,

    /// One-column CSV of recipient emails.
    #[arg(long)]
    pub recipients_path: Option<PathBuf>,

    /// Subject line; falls back to the email config's subject.
    #[arg(long)]
    pub subject: Option<String>,

    /// Inline HTML body, the same for every recipient.
    #[arg(long, conflicts_with_all = ["body_path", "email_config"])]
    pub body: Option<String>,

    /// HTML body template with {variable} placeholders.
    #[arg(long)]
    pub body_path: Option<PathBuf>,

    /// Email config YAML: subject and template variables.
    #[arg(long)]
    pub email_config: Option<PathBuf>,

    /// Attachment path (repeatable).
    #[arg(short = 'a', long = "attachment")]
    pub attachments: Vec<PathBuf>,

    /// Local phonebook CSV; wins over the remote enrichment APIs.
    #[arg(long)]
    pub local_phonebook: Option<PathBuf>,

    /// Send every message to the sender's own inbox instead.
    #[arg(short, long)]
    pub test_mode: bool,

    /// Skip interactive confirmations.
    #[arg(short = 'y', long)]
    pub yes: bool,
}
