//! # proplugin (Gist-backed data & OTP service)
//!
//! `proplugin` serves the data of the ProPricing application out of a single JSON file
//! stored in a GitHub Gist. There is no database: every request loads the whole
//! document, mutates it in memory and writes it back.
//!
//! ## Document
//!
//! The persisted document evolves over time. Older snapshots are upgraded on every read
//! by [`document::normalize`], which fills absent fields with their defaults and leaves
//! everything else untouched. Unknown fields survive a read-modify-write cycle.
//!
//! ## Store
//!
//! [`store::DocumentStore`] is the seam between handlers and persistence.
//! [`store::GistStore`] talks to the Gist REST API (including files the API reports as
//! truncated); [`store::MemoryStore`] keeps the document in memory for tests and local
//! runs. Writes are last-writer-wins across processes; within one process
//! [`store::DocumentRepository`] serializes read-modify-write cycles.
//!
//! ## Password reset (OTP)
//!
//! [`otp::OtpManager`] issues six digit codes, stores only their SHA-256 digest with a
//! ten minute expiry, mails the plaintext code and consumes the entry on a successful
//! reset. Digests are compared in constant time.

pub mod api;
pub mod cli;
pub mod document;
pub mod mail;
pub mod otp;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
