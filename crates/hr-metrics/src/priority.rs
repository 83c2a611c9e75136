//! Device priority table used to settle minute buckets reported by several devices

use std::collections::HashMap;

/// Rank given to any device missing from the table
pub const UNRANKED: u32 = 999;

/// Static device -> rank table, lower rank wins
#[derive(Debug, Clone, Default)]
pub struct PriorityResolver {
    ranks: HashMap<String, u32>,
}

impl PriorityResolver {
    pub fn new(ranks: HashMap<String, u32>) -> Self {
        Self { ranks }
    }

    pub fn rank(&self, device_id: &str) -> u32 {
        self.ranks.get(device_id).copied().unwrap_or(UNRANKED)
    }
}
