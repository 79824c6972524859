//! Import orchestration.
//!
//! This crate turns configuration plus a calendar day into a final, ordered
//! list of output nodes:
//!
//! - [`ImportConfig`] - the configuration surface
//! - [`Aggregator`] - concurrent fan-out, merge, sort, filtering
//! - [`ImportPipeline`] - the `import_day` entry point
//! - [`DocumentWriter`] - the seam to the host document
//! - [`EventLookup`] - multi-source probe used by the edit flow
//!
//! # Example
//!
//! ```ignore
//! use calimport_pipeline::{ImportConfig, ImportPipeline};
//! use calimport_providers::{CalendarClient, CalendarSource};
//!
//! let pipeline = ImportPipeline::new(config, source)?;
//! let nodes = pipeline.import_day(today, None).await;
//! write_nodes(&mut writer, &parent, &nodes)?;
//! ```

pub mod aggregator;
pub mod config;
pub mod lookup;
pub mod pipeline;
pub mod writer;

// Re-export main types at crate root
pub use aggregator::{Aggregated, Aggregator, FilterOptions};
pub use config::{ImportConfig, DEFAULT_TEMPLATE};
pub use lookup::{EventLookup, LocatedEvent};
pub use pipeline::{ImportPipeline, EMPTY_DAY_MESSAGE, TODO_PREFIX};
pub use writer::{write_nodes, DocumentWriter, NodeRef};
