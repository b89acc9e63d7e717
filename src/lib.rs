//! SASL negotiation for IRC services.
//!
//! The [`sasl::Engine`] turns `AUTHENTICATE` traffic relayed by the uplink into
//! mechanism steps and login decisions. Accounts and their password hashes live behind the
//! [`account::AccountDirectory`] and [`credential::CredentialStore`] traits.
#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]
#![deny(clippy::redundant_else)]
#![deny(clippy::semicolon_if_nothing_returned)]
#![deny(rustdoc::bare_urls)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::invalid_codeblock_attributes)]
#![deny(rustdoc::invalid_html_tags)]
#![deny(rustdoc::invalid_rust_codeblocks)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod account;
pub mod config;
pub mod consts;
pub mod credential;
pub mod digest;
pub mod error;
pub mod sasl;
pub mod string;
