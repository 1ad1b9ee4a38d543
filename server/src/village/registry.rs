//! Process-wide village registry: lookup-or-create by village id.
//!
//! Villages are created lazily on first reference and live for the rest of
//! the process; there is no eviction. Each village sits behind its own
//! `tokio::sync::Mutex`, which is the single-writer serialization point for
//! all waitlist/room mutation in that tenant.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::Village;

pub type VillageHandle = Arc<Mutex<Village>>;

/// Constructor-injected store; built once at startup and carried in
/// `AppState` rather than living in a static.
#[derive(Debug, Default)]
pub struct VillageRegistry {
    villages: DashMap<String, VillageHandle>,
}

impl VillageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent lookup-or-create.
    pub fn get_or_create(&self, village_id: &str, display_name: &str) -> VillageHandle {
        self.villages
            .entry(village_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Village::new(village_id, display_name))))
            .value()
            .clone()
    }

    pub fn get(&self, village_id: &str) -> Option<VillageHandle> {
        self.villages.get(village_id).map(|entry| entry.value().clone())
    }

    /// Snapshot of every village handle, for the disconnect sweep.
    pub fn handles(&self) -> Vec<VillageHandle> {
        self.villages
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.villages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.villages.is_empty()
    }
}
