use std::collections::HashMap;

use crate::prelude::*;
use crate::region::{Corner, Region};

/// What happens to an actor's selection once they disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpiryPolicy {
    /// Keep it until the process exits, so a reconnect picks up where it left off.
    #[default]
    KeepForSession,
    ClearOnDisconnect,
}

/// Each actor's current selection.
#[derive(Debug, Default)]
pub struct Sessions {
    policy: ExpiryPolicy,
    regions: HashMap<Name, Region>,
}
impl Sessions {
    pub fn new(policy: ExpiryPolicy) -> Self {
        Self {
            policy,
            regions: HashMap::new(),
        }
    }
    pub fn policy(&self) -> ExpiryPolicy {
        self.policy
    }
    /// Overwrites whatever was in that corner before.
    pub fn select(&mut self, name: Name, corner: Corner, pos: ChunkPos) -> &Region {
        let region = self.regions.entry(name).or_default();
        region.set(corner, pos);
        region
    }
    pub fn region(&self, name: Name) -> Option<&Region> {
        self.regions.get(&name)
    }
    pub fn disconnect(&mut self, name: Name) {
        if self.policy == ExpiryPolicy::ClearOnDisconnect && self.regions.remove(&name).is_some() {
            log::debug!("forgot selection of {name}");
        }
    }
}
