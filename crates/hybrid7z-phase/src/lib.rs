#![forbid(unsafe_code)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(missing_docs, unreachable_pub, unused)]
#![allow(clippy::module_name_repetitions)]

//! Filter partitioning and phase scheduling for Hybrid7z.
//!
//! Layout: `catalog.rs` (filter pattern files), `partition.rs` (claims and filter
//! lists), `scheduler.rs` (lanes), `invocation.rs` (argument vectors), `archiver.rs`
//! (process execution), `summary.rs` (aggregation), `pipeline.rs` (one run).

pub mod archiver;
pub mod catalog;
pub mod error;
pub mod invocation;
pub mod partition;
pub mod phase;
pub mod pipeline;
pub mod scheduler;
pub mod summary;
pub mod target;

pub use archiver::{
    Archiver, ArchiverInvoker, ExitCodeMeaning, InvocationOutcome, InvocationStatus, LogStream,
    log_file_name,
};
pub use catalog::{FilterCatalog, PhaseFilters, parse_patterns};
pub use error::{PhaseError, PhaseResult};
pub use invocation::{CASE_INSENSITIVE_SWITCH, Invocation, InvocationContext, split_arguments};
pub use partition::{
    AvailableFileSet, FILTER_LIST_SUFFIX, FilterListEntry, FilterPartitioner, PartitionTable,
};
pub use phase::{Lane, Phase, PhaseList};
pub use pipeline::{Hybrid7zPipeline, RunReport};
pub use scheduler::PhaseScheduler;
pub use summary::{CompressionRatio, ResultAggregator, RunSummary, SUMMARY_FILE_NAME};
pub use target::{Target, TargetSpec, resolve_targets};
