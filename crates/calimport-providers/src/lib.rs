//! Calendar provider access.
//!
//! This crate covers everything between the import pipeline and the calendar
//! backend:
//!
//! - [`TokenCache`] - per-account credential cache with single-flight refresh
//! - [`CalendarClient`] - the events API client (list/get/create/update)
//! - [`CalendarSource`] - per-calendar fetch wrapper that never fails the run
//! - [`ProviderError`] - error types for provider operations
//!
//! # Example
//!
//! ```ignore
//! use calimport_providers::{CalendarClient, CalendarSource, SourceSpec, TokenCache};
//!
//! let source = CalendarSource::new(tokens, CalendarClient::default());
//! let result = source.fetch(&SourceSpec::new("primary"), &window).await;
//! ```

pub mod client;
pub mod error;
pub mod source;
pub mod tokens;

// Re-export main types at crate root
pub use client::{CalendarClient, EventDraft, CALENDAR_API_BASE, DEFAULT_TIMEOUT};
pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use source::{CalendarSource, SourceFetch, SourceSpec, DEFAULT_ACCOUNT_LABEL};
pub use tokens::{
    Credential, CredentialStore, FileCredentialStore, MemoryCredentialStore, TokenCache,
};
