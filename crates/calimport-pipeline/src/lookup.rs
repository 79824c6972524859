//! Multi-source event lookup for the edit flow.
//!
//! Editing an imported event means finding which configured calendar it
//! lives in. The lookup probes each (account, calendar) pair in
//! configuration order and the first successful fetch wins; calendars that
//! error or lack credentials are simply skipped.

use std::sync::Arc;

use calimport_core::Event;
use calimport_providers::{CalendarClient, SourceSpec, TokenCache};
use tracing::debug;

/// An event together with the source it was found in.
#[derive(Debug, Clone)]
pub struct LocatedEvent {
    /// The source spec the event belongs to.
    pub spec: SourceSpec,
    /// The event, tagged with its calendar id.
    pub event: Event,
}

/// Probes configured sources for an event by id.
#[derive(Clone)]
pub struct EventLookup {
    tokens: Arc<TokenCache>,
    client: CalendarClient,
}

impl EventLookup {
    /// Creates a lookup over the given token cache and client.
    pub fn new(tokens: Arc<TokenCache>, client: CalendarClient) -> Self {
        Self { tokens, client }
    }

    /// Finds an event by probing specs in order; first success wins.
    ///
    /// Returns `None` when no configured calendar knows the event. Probe
    /// failures (missing credentials, 404s, transport errors) skip to the
    /// next spec rather than aborting.
    pub async fn find(&self, specs: &[SourceSpec], event_id: &str) -> Option<LocatedEvent> {
        for spec in specs {
            let label = spec.account_label();
            let token = match self.tokens.get_access_token(label).await {
                Ok(token) if !token.is_empty() => token,
                Ok(_) => {
                    debug!("account {} has no credential, skipping lookup", label);
                    continue;
                }
                Err(e) => {
                    debug!("token lookup failed for account {}: {}", label, e);
                    continue;
                }
            };

            match self
                .client
                .get_event(&token, &spec.calendar_id, event_id)
                .await
            {
                Ok(event) => {
                    return Some(LocatedEvent {
                        event: event.with_calendar_id(spec.calendar_id.clone()),
                        spec: spec.clone(),
                    });
                }
                Err(e) => {
                    debug!(
                        "event {} not found in calendar {}: {}",
                        event_id, spec.calendar_id, e
                    );
                }
            }
        }
        None
    }
}
