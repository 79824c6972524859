//! The day-import entry point.
//!
//! [`ImportPipeline::import_day`] ties the whole run together: compute the
//! day's fetch window, aggregate every configured source, format surviving
//! events through the template, and append per-source error leaves. The
//! output list is final; the caller hands it straight to a document writer.

use calimport_core::{CustomFormatter, OutputNode, TemplateEngine, TemplateNode, TimeWindow};
use calimport_providers::{CalendarSource, ProviderResult};
use chrono::{Local, NaiveDate, TimeZone};
use tracing::info;

use crate::aggregator::{Aggregator, FilterOptions};
use crate::config::ImportConfig;

/// The sentinel rendered when a day has no events and no errors.
pub const EMPTY_DAY_MESSAGE: &str = "No Events Scheduled for Today!";

/// Marker prepended to the template root when `add_todo_prefix` is set.
pub const TODO_PREFIX: &str = "TODO ";

/// Orchestrates one day's import.
///
/// Holds no cross-run state of its own; the token cache inside the source is
/// the only thing that persists between runs.
pub struct ImportPipeline {
    config: ImportConfig,
    engine: TemplateEngine,
    aggregator: Aggregator,
    options: FilterOptions,
}

impl ImportPipeline {
    /// Creates a pipeline from validated configuration.
    ///
    /// Fails only on configuration problems (a bad filter regex); once
    /// constructed, imports cannot fail, they can only report.
    pub fn new(config: ImportConfig, source: CalendarSource) -> ProviderResult<Self> {
        let options = FilterOptions {
            skip_free: config.skip_free,
            filter: config.compile_filter()?,
        };
        Ok(Self {
            engine: TemplateEngine::new(config.include_link),
            aggregator: Aggregator::new(source),
            options,
            config,
        })
    }

    /// Imports one calendar day in the local timezone.
    pub async fn import_day(
        &self,
        day: NaiveDate,
        custom: Option<&dyn CustomFormatter>,
    ) -> Vec<OutputNode> {
        self.import_day_in(day, &Local, custom).await
    }

    /// Imports one calendar day with an explicit timezone.
    ///
    /// Output invariant: one node per surviving event followed by one leaf
    /// per error, or exactly one sentinel leaf when both are empty. Never
    /// zero nodes.
    pub async fn import_day_in<Tz: TimeZone>(
        &self,
        day: NaiveDate,
        tz: &Tz,
        custom: Option<&dyn CustomFormatter>,
    ) -> Vec<OutputNode> {
        let window = TimeWindow::for_date(day, tz);
        let aggregated = self
            .aggregator
            .run(&self.config.sources, &window, &self.options)
            .await;

        info!(
            "import for {}: {} events, {} errors",
            day,
            aggregated.events.len(),
            aggregated.errors.len()
        );

        if aggregated.events.is_empty() && aggregated.errors.is_empty() {
            return vec![OutputNode::leaf(EMPTY_DAY_MESSAGE)];
        }

        let template = self.effective_template();
        let mut nodes: Vec<OutputNode> = aggregated
            .events
            .iter()
            .map(|event| self.engine.format(event, &template, custom))
            .collect();
        nodes.extend(aggregated.errors.into_iter().map(OutputNode::leaf));
        nodes
    }

    fn effective_template(&self) -> TemplateNode {
        let mut template = self.config.template.clone();
        if self.config.add_todo_prefix {
            template.text = format!("{}{}", TODO_PREFIX, template.text);
        }
        template
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calimport_core::{build_subscriber, Event, TracingConfig};
    use calimport_providers::{
        CalendarClient, Credential, MemoryCredentialStore, SourceSpec, TokenCache,
    };
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    /// Serves canned responses keyed by the calendar id in the request path.
    async fn spawn_calendar_api(
        routes: HashMap<&'static str, (&'static str, &'static str)>,
    ) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let routes = Arc::new(routes);

        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                let routes = routes.clone();
                tokio::spawn(async move {
                    let mut buf = [0u8; 8192];
                    let Ok(n) = stream.read(&mut buf).await else {
                        return;
                    };
                    let request = String::from_utf8_lossy(&buf[..n]).to_string();
                    let calendar_id = request
                        .split_whitespace()
                        .nth(1)
                        .and_then(|path| path.strip_prefix("/calendars/"))
                        .and_then(|rest| rest.split(['/', '?']).next())
                        .unwrap_or_default()
                        .to_string();

                    let (status_line, body) = routes
                        .get(calendar_id.as_str())
                        .copied()
                        .unwrap_or(("HTTP/1.1 404 Not Found", "{}"));
                    let response = format!(
                        "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status_line,
                        body.len(),
                        body
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                });
            }
        });

        format!("http://{}", addr)
    }

    fn source_for(api_url: &str) -> CalendarSource {
        let store = MemoryCredentialStore::with_credential(
            "default",
            Credential::new("live-token", None, Some(3600)),
        );
        let tokens = Arc::new(TokenCache::new(
            Arc::new(store),
            reqwest::Client::new(),
            "http://127.0.0.1:1/token",
        ));
        CalendarSource::new(tokens, CalendarClient::default().with_base_url(api_url))
    }

    fn pipeline_with(config: ImportConfig, api_url: &str) -> ImportPipeline {
        ImportPipeline::new(config, source_for(api_url)).unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    const ONE_EVENT: &str = r#"{"items":[{"summary":"Standup","hangoutLink":"https://meet.example/abc","start":{"dateTime":"2024-03-15T10:00:00Z"},"end":{"dateTime":"2024-03-15T10:15:00Z"}}]}"#;
    const NO_EVENTS: &str = r#"{"items":[]}"#;

    #[tokio::test]
    async fn zero_sources_yield_single_sentinel() {
        let pipeline = pipeline_with(ImportConfig::default(), "http://127.0.0.1:1");
        let nodes = pipeline.import_day_in(day(), &Utc, None).await;

        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0], OutputNode::leaf(EMPTY_DAY_MESSAGE));
    }

    #[tokio::test]
    async fn empty_day_yields_sentinel() {
        // Run under the workspace subscriber so import logging stays wired
        // end to end.
        let _tracing = tracing::subscriber::set_default(
            build_subscriber(&TracingConfig::interactive().with_env_filter("calimport=debug"))
                .unwrap(),
        );

        let api = spawn_calendar_api(HashMap::from([("quiet", ("HTTP/1.1 200 OK", NO_EVENTS))])).await;
        let config = ImportConfig {
            sources: vec![SourceSpec::new("quiet")],
            ..Default::default()
        };
        let nodes = pipeline_with(config, &api).import_day_in(day(), &Utc, None).await;

        assert_eq!(nodes, vec![OutputNode::leaf(EMPTY_DAY_MESSAGE)]);
    }

    #[tokio::test]
    async fn events_precede_errors() {
        let api = spawn_calendar_api(HashMap::from([
            ("good", ("HTTP/1.1 200 OK", ONE_EVENT)),
            ("missing", ("HTTP/1.1 404 Not Found", "{}")),
        ]))
        .await;
        let config = ImportConfig {
            sources: vec![SourceSpec::new("missing"), SourceSpec::new("good")],
            ..Default::default()
        };
        let nodes = pipeline_with(config, &api).import_day_in(day(), &Utc, None).await;

        assert_eq!(nodes.len(), 2);
        assert_eq!(
            nodes[0].text,
            "Standup (10:00 AM - 10:15 AM) - [Meet](https://meet.example/abc)"
        );
        assert_eq!(
            nodes[1].text,
            "Error for calendar missing: Could not find calendar or it's not public."
        );
    }

    #[tokio::test]
    async fn todo_prefix_applies_to_root_only() {
        let api = spawn_calendar_api(HashMap::from([("good", ("HTTP/1.1 200 OK", ONE_EVENT))])).await;
        let config = ImportConfig {
            sources: vec![SourceSpec::new("good")],
            template: TemplateNode::with_children(
                "{summary}",
                vec![TemplateNode::leaf("{start} - {end}")],
            ),
            add_todo_prefix: true,
            ..Default::default()
        };
        let nodes = pipeline_with(config, &api).import_day_in(day(), &Utc, None).await;

        assert_eq!(nodes[0].text, "TODO Standup");
        assert_eq!(nodes[0].children[0].text, "10:00 AM - 10:15 AM");
    }

    #[tokio::test]
    async fn custom_formatter_reaches_the_template() {
        let api = spawn_calendar_api(HashMap::from([("good", ("HTTP/1.1 200 OK", ONE_EVENT))])).await;
        let config = ImportConfig {
            sources: vec![SourceSpec::new("good")],
            template: TemplateNode::leaf("{custom}"),
            ..Default::default()
        };
        let formatter = |event: &Event| event.summary.to_uppercase();
        let nodes = pipeline_with(config, &api)
            .import_day_in(day(), &Utc, Some(&formatter))
            .await;

        assert_eq!(nodes[0].text, "STANDUP");
    }

    #[tokio::test]
    async fn all_sources_failing_still_produces_output() {
        let api = spawn_calendar_api(HashMap::new()).await;
        let config = ImportConfig {
            sources: vec![SourceSpec::new("a"), SourceSpec::new("b")],
            ..Default::default()
        };
        let nodes = pipeline_with(config, &api).import_day_in(day(), &Utc, None).await;

        assert_eq!(nodes.len(), 2);
        assert!(nodes.iter().all(|n| n.text.starts_with("Error for calendar")));
    }
}
