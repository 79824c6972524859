//! Core types: time, events, template trees, formatting

pub mod event;
pub mod node;
pub mod template;
pub mod time;
pub mod tracing;

pub use event::{
    Attendee, Event, ResponseStatus, Transparency, Visibility, ALL_DAY_DURATION_MINUTES,
};
pub use node::{OutputNode, TemplateNode};
pub use template::{CustomFormatter, TemplateEngine, DEFAULT_DATE_FORMAT};
pub use time::{EventTime, TimeWindow};
pub use tracing::{
    build_subscriber, init_tracing, TracingConfig, TracingError, TracingOutputFormat,
};
