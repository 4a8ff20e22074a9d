//! Distance annotations keyed by program point.

use ahash::AHashMap;
use waypoint_program::{BlockId, FunctionId, InstId, Module};

/// Distance of a program point no path reaches the target from.
pub const INFINITY: u64 = u64::MAX;

/// Map from instruction to its current distance bound. Absent entries
/// read as [`INFINITY`]; recorded values only ever decrease. Built once
/// by a scan, then read-only.
#[derive(Debug, Default)]
pub struct AnnotationStore {
    distances: AHashMap<InstId, u64>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, point: InstId) -> u64 {
        self.distances.get(&point).copied().unwrap_or(INFINITY)
    }

    /// Lower the bound for `point` to `distance` if it is an
    /// improvement. Returns whether anything changed.
    pub fn record(&mut self, point: InstId, distance: u64) -> bool {
        if distance >= self.get(point) {
            return false;
        }
        self.distances.insert(point, distance);
        true
    }

    /// Distance at a block's entry (its first instruction).
    pub fn at_block_entry(&self, module: &Module, block: BlockId) -> u64 {
        match module.block_entry(block) {
            Some(point) => self.get(point),
            None => INFINITY,
        }
    }

    /// Distance at a function's entry. [`INFINITY`] for declaration-only
    /// functions.
    pub fn at_function_entry(&self, module: &Module, function: FunctionId) -> u64 {
        match module.entry_point(function) {
            Some(point) => self.get(point),
            None => INFINITY,
        }
    }

    /// Number of points with a finite distance.
    pub fn len(&self) -> usize {
        self.distances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(inst: u32) -> InstId {
        InstId {
            function: 0,
            block: 0,
            inst,
        }
    }

    #[test]
    fn test_absent_reads_as_infinity() {
        let store = AnnotationStore::new();
        assert_eq!(store.get(point(0)), INFINITY);
        assert!(store.is_empty());
    }

    #[test]
    fn test_record_is_monotone() {
        let mut store = AnnotationStore::new();
        assert!(store.record(point(0), 7));
        assert!(!store.record(point(0), 7));
        assert!(!store.record(point(0), 9));
        assert!(store.record(point(0), 3));
        assert_eq!(store.get(point(0)), 3);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_recording_infinity_is_a_no_op() {
        let mut store = AnnotationStore::new();
        assert!(!store.record(point(1), INFINITY));
        assert!(store.is_empty());
    }
}
