//! Google Sheets backend implementation.
//!
//! Stores patients and evolutions as rows of two sheets inside a single
//! spreadsheet, accessed through the Sheets REST API (v4). The first row of
//! each sheet holds the column names; rows are decoded by header name, so
//! columns may be reordered by hand without breaking reads.
//!
//! Missing sheets are created with their header row by
//! [`initialize`](crate::core::Backend::initialize).
//!
//! # Authentication
//!
//! Either a service-account key (the JSON file downloaded from the Google
//! Cloud console, shared with the spreadsheet as an editor) or a pre-minted
//! bearer token. See [`SheetsAuth`].
//!
//! # Duplicate detection
//!
//! Sheets has no unique constraint. Inserts scan the `record_id` column
//! first, then re-read it after appending; if an earlier row with the same
//! id appeared in between, the new row is cleared and the insert reports a
//! duplicate.

mod auth;
mod backend;
mod storage;

pub use auth::{SHEETS_SCOPE, ServiceAccountKey, SheetsAuth};
pub use backend::{SheetsBackend, SheetsConfig, column_letter};
