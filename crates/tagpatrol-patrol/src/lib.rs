//! # Tag Patrol Scanner
//!
//! Concurrent tag compliance scanning.
//!
//! # Overview
//!
//! The scanner handles:
//! - **Discovery**: fetches the resources of each definition through a
//!   pluggable [`ResourceFinder`]
//! - **Evaluation**: runs every resource through a [`tagpatrol_ruler::Ruler`]
//! - **Bounded concurrency**: at most `concurrent_workers` definitions are in
//!   flight at once
//! - **Cancellation**: cooperative, via [`tokio_util::sync::CancellationToken`]
//! - **Reporting**: [`Summary`] counts and [`ScanReport`]s rendered by a
//!   [`Reporter`]
//!
//! # Architecture
//!
//! ```text
//!  policy.yaml ──► PolicyParser ──► [ResourceDefinition]
//!                                          │
//!                                     job queue
//!                       ┌──────────────────┼──────────────────┐
//!                       ▼                  ▼                  ▼
//!                   worker 1           worker 2           worker N
//!                 find + rule          find + rule        find + rule
//!                       └──────────────────┼──────────────────┘
//!                                          ▼
//!                                 [ScanResult] ──► Summary / ScanReport
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod finder;
pub mod patrol;
pub mod report;
pub mod scan;

// Re-export main types at crate root
pub use config::{PatrolConfig, PatrolConfigBuilder};
pub use error::{FetchError, FinderError, PatrolError, Result};
pub use finder::{Inventory, ResourceFinder, StaticFinder};
pub use patrol::Patrol;
pub use report::{
    ConsoleReporter, DefinitionReport, JsonReporter, Reporter, ResourceReport, ScanOutcome,
    ScanReport,
};
pub use scan::{ScanResult, Summary};
