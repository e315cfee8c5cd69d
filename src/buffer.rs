//! Bounded, strictly append-only store of authoritative snapshots.

use std::collections::{HashMap, VecDeque};

use crate::config::SNAPSHOT_BUFFER_SIZE;
use crate::protocol::{GameSnapshot, Tick};

/// One buffered authoritative state, plus bookkeeping built at insert time.
#[derive(Debug, Clone)]
pub struct BufferEntry {
    pub tick: Tick,
    pub arrival_time: u64,
    pub snapshot: GameSnapshot,
    /// Gravity well id -> index into `snapshot.gravity_wells`, precomputed
    /// once at insertion for O(1) interpolator lookup.
    pub well_index: HashMap<u64, usize>,
}

impl BufferEntry {
    fn new(tick: Tick, arrival_time: u64, snapshot: GameSnapshot) -> Self {
        let well_index = snapshot
            .gravity_wells
            .iter()
            .enumerate()
            .map(|(idx, well)| (well.id, idx))
            .collect();

        Self {
            tick,
            arrival_time,
            snapshot,
            well_index,
        }
    }
}

/// Bounded FIFO of [`BufferEntry`], capacity `SNAPSHOT_BUFFER_SIZE`.
///
/// Arrival order equals tick order for well-behaved input, but the buffer
/// never rewrites history: a late arrival (tick <= current max) is simply
/// appended at the end, in arrival order, same as anything else. The
/// oldest entry is evicted on overflow.
#[derive(Debug, Default)]
pub struct SnapshotBuffer {
    entries: VecDeque<BufferEntry>,
    capacity: usize,
}

impl SnapshotBuffer {
    pub fn new() -> Self {
        Self::with_capacity(SNAPSHOT_BUFFER_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a snapshot, timestamped at `arrival_time`. Evicts the oldest
    /// entry if the buffer is at capacity.
    pub fn append(&mut self, snapshot: GameSnapshot, arrival_time: u64) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        let tick = snapshot.tick;
        self.entries
            .push_back(BufferEntry::new(tick, arrival_time, snapshot));
    }

    /// Linear scan for the entry whose tick equals `tick`. The buffer is
    /// small (`SNAPSHOT_BUFFER_SIZE` entries), so this is acceptable.
    pub fn find_by_tick(&self, tick: Tick) -> Option<&BufferEntry> {
        self.entries.iter().find(|e| e.tick == tick)
    }

    pub fn most_recent(&self) -> Option<&BufferEntry> {
        self.entries.back()
    }

    pub fn second_most_recent(&self) -> Option<&BufferEntry> {
        let len = self.entries.len();
        if len < 2 {
            None
        } else {
            self.entries.get(len - 2)
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BufferEntry> {
        self.entries.iter()
    }

    /// Empty the buffer. Used on local respawn to avoid interpolating
    /// across the death -> spawn boundary.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ArenaState, MatchPhase, Vector};

    fn snapshot(tick: Tick) -> GameSnapshot {
        GameSnapshot {
            tick,
            phase: MatchPhase::Playing,
            match_time: 0.0,
            countdown: 0.0,
            players: Vec::new(),
            projectiles: Vec::new(),
            debris: Vec::new(),
            gravity_wells: Vec::new(),
            notable_players: Vec::new(),
            arena: ArenaState {
                collapse_phase: 0,
                safe_radius: 0.0,
                scale: 1.0,
            },
            density_grid: Vec::new(),
            echo_client_time: 0,
        }
    }

    #[test]
    fn append_and_lookup() {
        let mut buf = SnapshotBuffer::new();
        buf.append(snapshot(1), 1000);
        buf.append(snapshot(2), 1033);

        assert_eq!(buf.len(), 2);
        assert_eq!(buf.find_by_tick(1).unwrap().arrival_time, 1000);
        assert_eq!(buf.most_recent().unwrap().tick, 2);
        assert_eq!(buf.second_most_recent().unwrap().tick, 1);
    }

    #[test]
    fn overflow_discards_oldest() {
        let mut buf = SnapshotBuffer::with_capacity(3);
        for tick in 1..=4 {
            buf.append(snapshot(tick), tick * 33);
        }
        assert_eq!(buf.len(), 3);
        assert!(buf.find_by_tick(1).is_none());
        assert!(buf.find_by_tick(2).is_some());
        assert_eq!(buf.most_recent().unwrap().tick, 4);
    }

    #[test]
    fn late_arrival_is_appended_not_rewritten() {
        let mut buf = SnapshotBuffer::new();
        buf.append(snapshot(5), 1000);
        buf.append(snapshot(3), 1010); // late, tick < current max
        buf.append(snapshot(6), 1020);

        assert_eq!(buf.len(), 3);
        // Arrival order is preserved: 5, 3, 6
        let ticks: Vec<Tick> = buf.iter().map(|e| e.tick).collect();
        assert_eq!(ticks, vec![5, 3, 6]);
    }

    #[test]
    fn well_index_maps_id_to_position() {
        let mut snap = snapshot(1);
        snap.gravity_wells.push(crate::protocol::GravityWellSnapshot {
            id: 42,
            position: Vector::ZERO,
            mass: 10.0,
            core_radius: 5.0,
        });
        let mut buf = SnapshotBuffer::new();
        buf.append(snap, 0);
        let entry = buf.most_recent().unwrap();
        assert_eq!(entry.well_index.get(&42), Some(&0));
    }
}
