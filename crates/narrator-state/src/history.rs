//! Bounded snapshot history.

use std::collections::VecDeque;

use narrator_core::snapshot::StateSnapshot;

/// Snapshots in capture order, capped at a fixed capacity. Entries are only
/// appended, evicted from the front, or truncated from the back by a
/// rollback; existing entries are never modified.
#[derive(Debug, Clone)]
pub struct SnapshotHistory {
    capacity: usize,
    snapshots: VecDeque<StateSnapshot>,
}

impl SnapshotHistory {
    /// Creates an empty history holding at most `capacity` snapshots
    /// (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            snapshots: VecDeque::with_capacity(capacity),
        }
    }

    /// Maximum number of retained snapshots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of retained snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether nothing is retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Appends a snapshot, returning the evicted oldest one on overflow.
    pub fn push(&mut self, snapshot: StateSnapshot) -> Option<StateSnapshot> {
        let evicted = if self.snapshots.len() == self.capacity {
            self.snapshots.pop_front()
        } else {
            None
        };
        self.snapshots.push_back(snapshot);
        evicted
    }

    /// Snapshots, oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &StateSnapshot> {
        self.snapshots.iter()
    }

    /// The most recent snapshot.
    #[must_use]
    pub fn newest(&self) -> Option<&StateSnapshot> {
        self.snapshots.back()
    }

    /// Up to `count` newest snapshots, oldest first.
    #[must_use]
    pub fn newest_n(&self, count: usize) -> Vec<StateSnapshot> {
        let skip = self.snapshots.len().saturating_sub(count);
        self.snapshots.iter().skip(skip).cloned().collect()
    }

    /// Newest snapshot matching `predicate`.
    pub fn find_newest(&self, predicate: impl Fn(&StateSnapshot) -> bool) -> Option<&StateSnapshot> {
        self.snapshots.iter().rev().find(|snapshot| predicate(snapshot))
    }

    /// Removes and returns the newest snapshot matching `predicate`,
    /// discarding every newer one. Leaves the history untouched when
    /// nothing matches.
    pub fn take_newest(&mut self, predicate: impl Fn(&StateSnapshot) -> bool) -> Option<StateSnapshot> {
        let index = self.snapshots.iter().rposition(predicate)?;
        let mut discarded = self.snapshots.split_off(index);
        discarded.pop_front()
    }

    /// Removes and returns the first snapshot of the newest unbroken run of
    /// `script_name` snapshots, discarding every newer one. That snapshot
    /// holds the state from when the script was last entered.
    pub fn take_script_entry(&mut self, script_name: &str) -> Option<StateSnapshot> {
        let run_start = self
            .snapshots
            .iter()
            .rposition(|snapshot| snapshot.spot.script_name != script_name)
            .map_or(0, |index| index + 1);
        if run_start == self.snapshots.len() {
            return None;
        }
        let mut discarded = self.snapshots.split_off(run_start);
        discarded.pop_front()
    }

    /// Removes everything.
    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    /// Replaces the contents, keeping only the newest `capacity` entries.
    pub fn replace(&mut self, snapshots: impl IntoIterator<Item = StateSnapshot>) {
        self.snapshots.clear();
        for snapshot in snapshots {
            self.push(snapshot);
        }
    }
}
