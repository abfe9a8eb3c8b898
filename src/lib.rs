pub mod app;
pub mod cli;
pub mod config;
pub mod contacts;
pub mod google_api;
pub mod mailer;
pub mod phonebook;
pub mod template;
