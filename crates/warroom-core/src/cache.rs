use std::collections::BTreeMap;
use std::sync::Arc;

use crate::state::GameState;

#[derive(Debug)]
struct Entry {
    state: Arc<GameState>,
    last_used: u64,
}

/// Sparse turn-start snapshots. Only a speed-up: anything evicted can be
/// recomputed from an earlier entry.
#[derive(Debug)]
pub struct SnapshotCache {
    density: u32,
    capacity: usize,
    entries: BTreeMap<u32, Entry>,
    clock: u64,
}

impl SnapshotCache {
    pub fn new(density: u32, capacity: usize) -> Self {
        Self {
            density: density.max(1),
            capacity: capacity.max(1),
            entries: BTreeMap::new(),
            clock: 0,
        }
    }

    pub fn should_store(&self, turn: u32) -> bool {
        turn % self.density == 0
    }

    /// Store a turn-start snapshot if the density keeps it, evicting the least
    /// recently used entry when full.
    pub fn insert(&mut self, turn: u32, state: Arc<GameState>) {
        if !self.should_store(turn) {
            return;
        }
        self.clock += 1;
        self.entries.insert(
            turn,
            Entry {
                state,
                last_used: self.clock,
            },
        );
        while self.entries.len() > self.capacity {
            let Some(victim) = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(t, _)| *t)
            else {
                break;
            };
            self.entries.remove(&victim);
            tracing::trace!(turn = victim, "Evicted snapshot");
        }
    }

    pub fn get(&mut self, turn: u32) -> Option<Arc<GameState>> {
        self.clock += 1;
        let clock = self.clock;
        self.entries.get_mut(&turn).map(|e| {
            e.last_used = clock;
            Arc::clone(&e.state)
        })
    }

    /// The latest cached snapshot at or before `turn`.
    pub fn nearest_at_or_before(&mut self, turn: u32) -> Option<(u32, Arc<GameState>)> {
        self.clock += 1;
        let clock = self.clock;
        self.entries.range_mut(..=turn).next_back().map(|(t, e)| {
            e.last_used = clock;
            (*t, Arc::clone(&e.state))
        })
    }

    pub fn contains(&self, turn: u32) -> bool {
        self.entries.contains_key(&turn)
    }

    pub fn turns(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
