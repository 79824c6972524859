//! Import configuration.

use calimport_core::TemplateNode;
use calimport_providers::{ProviderError, ProviderResult, SourceSpec};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Template used when configuration supplies none.
pub const DEFAULT_TEMPLATE: &str = "{summary} ({start:hh:mm a} - {end:hh:mm a}){confLink}";

/// Configuration for an import run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// The calendars to import, in configuration order.
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
    /// Wrap event summaries as markdown links to the calendar entry.
    #[serde(default)]
    pub include_link: bool,
    /// Drop events that do not block time (transparency "transparent").
    #[serde(default)]
    pub skip_free: bool,
    /// The template tree applied to each event.
    #[serde(default = "default_template")]
    pub template: TemplateNode,
    /// Optional regex; only events whose summary or description matches are kept.
    #[serde(default)]
    pub filter: Option<String>,
    /// Prepend the task marker to the template's root text.
    #[serde(default)]
    pub add_todo_prefix: bool,
}

fn default_template() -> TemplateNode {
    TemplateNode::leaf(DEFAULT_TEMPLATE)
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            include_link: false,
            skip_free: false,
            template: default_template(),
            filter: None,
            add_todo_prefix: false,
        }
    }
}

impl ImportConfig {
    /// Compiles the filter regex, if one is configured.
    ///
    /// A bad pattern is a configuration error; catch it at load time, not in
    /// the middle of an import run.
    pub fn compile_filter(&self) -> ProviderResult<Option<Regex>> {
        match &self.filter {
            Some(pattern) => Regex::new(pattern).map(Some).map_err(|e| {
                ProviderError::configuration(format!("invalid filter regex {:?}: {}", pattern, e))
            }),
            None => Ok(None),
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ProviderResult<()> {
        self.compile_filter().map(|_| ())
    }
}
