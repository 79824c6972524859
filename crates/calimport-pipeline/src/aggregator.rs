//! Multi-source fan-out, merge, sort, and filtering.
//!
//! The aggregator fetches every configured source concurrently, tags each
//! event with its calendar id, imposes one deterministic total order on the
//! merged list, and applies the global filters. Per-source errors ride along
//! with the surviving events; a failed calendar never hides a healthy one.

use std::cmp::Ordering;

use calimport_core::{Event, TimeWindow};
use calimport_providers::{CalendarSource, SourceFetch, SourceSpec};
use futures_util::future::join_all;
use regex::Regex;
use tracing::debug;

/// Global filters applied after the merge.
#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    /// Drop events with transparency "transparent".
    pub skip_free: bool,
    /// Keep only events whose summary or description matches.
    pub filter: Option<Regex>,
}

/// The merged result of one fan-out.
#[derive(Debug, Clone, Default)]
pub struct Aggregated {
    /// Surviving events in final order.
    pub events: Vec<Event>,
    /// Per-source error messages, in source order.
    pub errors: Vec<String>,
}

/// Fans out fetches and merges the results.
#[derive(Clone)]
pub struct Aggregator {
    source: CalendarSource,
}

impl Aggregator {
    /// Creates an aggregator over the given source.
    pub fn new(source: CalendarSource) -> Self {
        Self { source }
    }

    /// Fetches all specs concurrently and merges the results.
    ///
    /// An empty spec list short-circuits: no fetches, empty result. All
    /// fetches settle before merging, so partial failure is ordinary.
    pub async fn run(
        &self,
        specs: &[SourceSpec],
        window: &TimeWindow,
        options: &FilterOptions,
    ) -> Aggregated {
        if specs.is_empty() {
            return Aggregated::default();
        }

        let fetches = join_all(specs.iter().map(|spec| self.source.fetch(spec, window))).await;

        let mut aggregated = merge(fetches);
        aggregated.events.sort_by(compare_events);
        aggregated.events.retain(|event| keep(event, options));

        debug!(
            "aggregated {} events and {} errors from {} sources",
            aggregated.events.len(),
            aggregated.errors.len(),
            specs.len()
        );
        aggregated
    }
}

/// Collects events (tagged with their calendar id) and errors from settled
/// fetches, preserving source order.
fn merge(fetches: Vec<SourceFetch>) -> Aggregated {
    let mut aggregated = Aggregated::default();
    for fetch in fetches {
        if let Some(error) = fetch.error {
            aggregated.errors.push(error);
            continue;
        }
        let calendar_id = fetch.spec.calendar_id;
        aggregated.events.extend(
            fetch
                .events
                .into_iter()
                .map(|event| event.with_calendar_id(calendar_id.clone())),
        );
    }
    aggregated
}

/// The total event order: all-day events first (ties by summary), then by
/// start instant, ties by byte-wise summary comparison.
fn compare_events(a: &Event, b: &Event) -> Ordering {
    a.start
        .cmp(&b.start)
        .then_with(|| a.summary.cmp(&b.summary))
}

/// Applies the filters in their fixed order: skip-free, self-declined,
/// then the optional regex on summary or description.
fn keep(event: &Event, options: &FilterOptions) -> bool {
    if options.skip_free && event.transparency == calimport_core::Transparency::Transparent {
        return false;
    }
    if event.declined_by_self() {
        return false;
    }
    if let Some(regex) = &options.filter {
        let matches = regex.is_match(&event.summary)
            || event
                .description
                .as_deref()
                .is_some_and(|d| regex.is_match(d));
        if !matches {
            return false;
        }
    }
    true
}
