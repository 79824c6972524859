//! Per-calendar fetch wrapper.
//!
//! A [`CalendarSource`] binds the token cache and the API client together for
//! one (account, calendar) pair and converts every failure into a
//! human-readable per-source error string. Nothing escapes
//! [`CalendarSource::fetch`] as an `Err`: a broken calendar must not take the
//! other calendars down with it.

use std::sync::Arc;

use calimport_core::{Event, TimeWindow};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::client::CalendarClient;
use crate::error::ProviderErrorCode;
use crate::tokens::TokenCache;

/// The account label used when configuration does not name one.
pub const DEFAULT_ACCOUNT_LABEL: &str = "default";

/// Identifies one calendar to query: a calendar id plus the account whose
/// credential is used to read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    /// The calendar identifier (e.g. an email address or "primary").
    pub calendar_id: String,
    /// The credential account label; `None` means the single implicit account.
    #[serde(default)]
    pub account_label: Option<String>,
}

impl SourceSpec {
    /// Creates a spec for the implicit default account.
    pub fn new(calendar_id: impl Into<String>) -> Self {
        Self {
            calendar_id: calendar_id.into(),
            account_label: None,
        }
    }

    /// Builder method to set the account label.
    pub fn with_account_label(mut self, label: impl Into<String>) -> Self {
        self.account_label = Some(label.into());
        self
    }

    /// The effective account label.
    pub fn account_label(&self) -> &str {
        self.account_label.as_deref().unwrap_or(DEFAULT_ACCOUNT_LABEL)
    }
}

/// The outcome of fetching one source.
///
/// `events` and `error` are not mutually exclusive in type, but a fetch
/// produces either events (possibly zero, meaning an empty day) or an error
/// string, never both.
#[derive(Debug, Clone)]
pub struct SourceFetch {
    /// The spec this result belongs to.
    pub spec: SourceSpec,
    /// Events fetched from the calendar, in API order.
    pub events: Vec<Event>,
    /// A human-readable error when the fetch failed.
    pub error: Option<String>,
}

impl SourceFetch {
    fn ok(spec: SourceSpec, events: Vec<Event>) -> Self {
        Self {
            spec,
            events,
            error: None,
        }
    }

    fn failed(spec: SourceSpec, error: impl Into<String>) -> Self {
        Self {
            spec,
            events: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Fetches one calendar's events using a cached token.
#[derive(Clone)]
pub struct CalendarSource {
    tokens: Arc<TokenCache>,
    client: CalendarClient,
}

impl CalendarSource {
    /// Creates a source backed by the given token cache and client.
    pub fn new(tokens: Arc<TokenCache>, client: CalendarClient) -> Self {
        Self { tokens, client }
    }

    /// Fetches one source's events for the window.
    ///
    /// Never returns `Err`: a missing credential, a missing calendar, and
    /// every transport failure all resolve into [`SourceFetch::error`].
    pub async fn fetch(&self, spec: &SourceSpec, window: &TimeWindow) -> SourceFetch {
        let label = spec.account_label();

        let token = match self.tokens.get_access_token(label).await {
            Ok(token) => token,
            Err(e) => {
                warn!("token lookup failed for account {}: {}", label, e);
                return SourceFetch::failed(spec.clone(), auth_message(label));
            }
        };
        if token.is_empty() {
            debug!("account {} has no credential, skipping fetch", label);
            return SourceFetch::failed(spec.clone(), auth_message(label));
        }

        match self
            .client
            .list_events(&token, &spec.calendar_id, window)
            .await
        {
            Ok(events) => SourceFetch::ok(spec.clone(), events),
            Err(e) if e.code() == ProviderErrorCode::NotFound => SourceFetch::failed(
                spec.clone(),
                format!(
                    "Error for calendar {}: Could not find calendar or it's not public.",
                    spec.calendar_id
                ),
            ),
            Err(e) => SourceFetch::failed(
                spec.clone(),
                format!("Error for calendar {}: {}", spec.calendar_id, e.message()),
            ),
        }
    }
}

fn auth_message(label: &str) -> String {
    format!("Must authenticate for {}", label)
}
