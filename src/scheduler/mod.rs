//! Collection scheduling.
//!
//! - [`registry`]: the ordered table of sources
//! - [`orchestrator`]: per-session lifecycle, fast/slow split, event delivery
//! - [`pool`]: bounded background workers
//! - [`timeout`]: collection time ceiling

pub mod orchestrator;
pub mod pool;
pub mod registry;
pub mod snapshot;
pub mod state;
pub mod timeout;

pub use orchestrator::{
    CollectionEvent, EntriesView, Orchestrator, RefreshTarget, SchedulerOptions,
};
pub use registry::{SourceDescriptor, SourceRegistry};
pub use snapshot::{Snapshot, SourceSnapshot};
pub use state::SourceState;
