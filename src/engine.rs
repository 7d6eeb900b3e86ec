//! Slot configuration and runtime engine.
//!
//! ## How the parts work together
//!
//! ```text
//! model source ── parse_directives ──> [Directive]        (directive.rs)
//!                                          │
//!                     SlotTable::resolve   │               (resolve.rs)
//!                     + attach_files       │
//!                     + validate           v
//!                                      SlotTable
//!                                          │
//!                     SlotRegistry::open   v               (registry.rs)
//!                                   input / output bindings
//!                                          │
//!                     bind_actions         │  ScoringModule (adapter.rs)
//!                                          v
//!                     Dispatcher::drain ── read_batch ──── (reader.rs)
//!                                      └── write_record ── (writer.rs)
//! ```
//!
//! ## Responsibilities by module
//!
//! - `directive.rs`: recognizes smart comments and splits them into
//!   `(item, scope, value)`.
//! - `resolve.rs`: folds directives into per-slot configuration and checks the
//!   table's invariants.
//! - `registry.rs`: opens and owns every connection.
//! - `reader.rs`: batched reads with sequencing and end-of-stream handling.
//! - `adapter.rs`: wraps 1/2/3-argument callbacks into one calling convention.
//! - `dispatch.rs`: the scheduler loop and its selection strategies.
//! - `writer.rs`: one JSON line per emitted value.
//! - `metrics.rs`: per-slot counters.
//!
//! The table is resolved completely before anything is opened, so a bad
//! directive never leaves a half-written output file behind.

#[path = "engine/adapter.rs"]
mod adapter;
#[path = "engine/directive.rs"]
mod directive;
#[path = "engine/dispatch.rs"]
mod dispatch;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/reader.rs"]
mod reader;
#[path = "engine/registry.rs"]
pub(crate) mod registry;
#[path = "engine/resolve.rs"]
mod resolve;
#[path = "engine/writer.rs"]
mod writer;

pub use adapter::Action;
pub use directive::{Directive, Item, Scope, parse_directives};
pub use dispatch::{DEFAULT_BATCH_SIZE, Dispatcher, OutputRoute, RandomSelection, RoundRobin, SelectionStrategy};
pub use metrics::SlotMetrics;
pub use reader::Batch;
pub use registry::{SlotRegistry, StdStreams};
pub use resolve::{SlotConfig, SlotTable};
