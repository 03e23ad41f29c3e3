//! Serializable point-in-time view of a session.

use serde::Serialize;

use crate::entry::{Entry, Status};
use crate::sources::{SourceId, SourceSpeed};

use super::state::SourceState;

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub sources: Vec<SourceSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceSnapshot {
    pub id: SourceId,
    pub category: String,
    pub speed: SourceSpeed,
    pub state: SourceState,
    /// `None` until the source has loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<Vec<Entry>>,
}

impl SourceSnapshot {
    /// Worst status among this source's entries, if any loaded.
    pub fn worst_status(&self) -> Option<Status> {
        self.entries
            .as_ref()
            .map(|entries| Status::worst(entries.iter().map(Entry::status)))
    }
}

impl Snapshot {
    pub fn get(&self, id: &SourceId) -> Option<&SourceSnapshot> {
        self.sources.iter().find(|s| &s.id == id)
    }

    /// Worst status across every loaded source; healthy when nothing loaded.
    pub fn worst_status(&self) -> Status {
        Status::worst(self.sources.iter().filter_map(SourceSnapshot::worst_status))
    }

    /// Keep only the listed sources, in snapshot order.
    pub fn retain(&mut self, ids: &[SourceId]) {
        self.sources.retain(|s| ids.contains(&s.id));
    }
}
