//! The running-process table.
//!
//! The only shared mutable state in the engine: a concurrent map from node
//! identifier to its live process, owned by the supervisor. Mutation goes
//! through `register`/`unregister`/`drain`; `snapshot` hands out clones, so
//! no process I/O ever happens under a map lock.

use std::path::PathBuf;
use std::time::Instant;

use dashmap::DashMap;

/// One tracked child process. A node identifier maps to at most one of these
/// at any instant.
#[derive(Debug, Clone)]
pub struct RunningProcess {
    pub pid: u32,
    pub started_at: Instant,
    pub script_path: PathBuf,
    pub unit_path: PathBuf,
}

#[derive(Debug, Default)]
pub struct ProcessTable {
    inner: DashMap<String, RunningProcess>,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    pub fn register(&self, node_id: &str, entry: RunningProcess) {
        self.inner.insert(node_id.to_string(), entry);
    }

    pub fn unregister(&self, node_id: &str) -> Option<RunningProcess> {
        self.inner.remove(node_id).map(|(_, entry)| entry)
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.inner.contains_key(node_id)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Clone of every entry, for inspection.
    pub fn snapshot(&self) -> Vec<(String, RunningProcess)> {
        self.inner
            .iter()
            .map(|item| (item.key().clone(), item.value().clone()))
            .collect()
    }

    /// Remove and return every entry (the cancellation path).
    pub fn drain(&self) -> Vec<(String, RunningProcess)> {
        let keys: Vec<String> = self.inner.iter().map(|item| item.key().clone()).collect();
        keys.into_iter()
            .filter_map(|key| self.inner.remove(&key))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(pid: u32) -> RunningProcess {
        RunningProcess {
            pid,
            started_at: Instant::now(),
            script_path: PathBuf::from("node.py"),
            unit_path: PathBuf::from("/tmp/unit.py"),
        }
    }

    #[test]
    fn register_replaces_existing_entry() {
        let table = ProcessTable::new();
        table.register("n1", entry(10));
        table.register("n1", entry(20));
        assert_eq!(table.len(), 1);
        assert_eq!(table.snapshot()[0].1.pid, 20);
    }

    #[test]
    fn drain_empties_the_table() {
        let table = ProcessTable::new();
        table.register("n1", entry(1));
        table.register("n2", entry(2));
        let drained = table.drain();
        assert_eq!(drained.len(), 2);
        assert!(table.is_empty());
    }

    #[test]
    fn unregister_missing_is_none() {
        let table = ProcessTable::new();
        assert!(table.unregister("ghost").is_none());
    }
}
