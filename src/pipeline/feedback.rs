use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::alignment::lexical::clean_text;

/// A confirmed source/target pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    /// Cleaned and lowercased.
    pub source_text: String,
    /// Cleaned, case preserved.
    pub target_text: String,
    pub boost: f32,
}

impl FeedbackEntry {
    fn matches(&self, source_lower: &str, target: &str) -> bool {
        source_lower.contains(self.source_text.as_str()) && target.contains(self.target_text.as_str())
    }
}

/// Read-only view of the store taken at one instant.
#[derive(Debug, Clone, Default)]
pub struct FeedbackSnapshot {
    entries: Arc<VecDeque<FeedbackEntry>>,
}

impl FeedbackSnapshot {
    /// Boost of the most recent entry contained in the pair, or 0.
    ///
    /// `source_lower` is the lowercased cleaned source text; `target` is the
    /// cleaned target text.
    pub fn lookup(&self, source_lower: &str, target: &str) -> f32 {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.matches(source_lower, target))
            .map_or(0.0, |entry| entry.boost)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &FeedbackEntry> {
        self.entries.iter()
    }
}

/// Bounded FIFO of confirmed pairings shared by every alignment request.
///
/// Appends swap in a new entry list under a short write lock; readers clone
/// the current list pointer and never block appends while they search.
#[derive(Debug)]
pub struct FeedbackStore {
    capacity: usize,
    boost: f32,
    entries: RwLock<Arc<VecDeque<FeedbackEntry>>>,
}

impl FeedbackStore {
    pub fn new(capacity: usize, boost: f32) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            boost: boost.clamp(0.0, 1.0),
            entries: RwLock::new(Arc::new(VecDeque::with_capacity(capacity))),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Records a confirmed pairing and returns the number of stored entries.
    ///
    /// Rejected pairings and pairings with no text left after cleaning are
    /// not stored.
    pub fn record(&self, source_text: &str, target_text: &str, was_correct: bool) -> usize {
        if !was_correct {
            return self.len();
        }
        let source = clean_text(source_text).to_lowercase();
        let target = clean_text(target_text);
        if source.is_empty() || target.is_empty() {
            tracing::warn!(
                source_text,
                target_text,
                "ignoring feedback pair with no usable text"
            );
            return self.len();
        }

        let entry = FeedbackEntry {
            source_text: source,
            target_text: target,
            boost: self.boost,
        };
        let mut guard = self.entries.write();
        let entries = Arc::make_mut(&mut *guard);
        entries.push_back(entry);
        while entries.len() > self.capacity {
            entries.pop_front();
        }
        let len = entries.len();
        drop(guard);
        tracing::debug!(stored = len, capacity = self.capacity, "feedback recorded");
        len
    }

    pub fn snapshot(&self) -> FeedbackSnapshot {
        FeedbackSnapshot {
            entries: Arc::clone(&self.entries.read()),
        }
    }

    pub fn lookup(&self, source_text: &str, target_text: &str) -> f32 {
        let source = clean_text(source_text).to_lowercase();
        let target = clean_text(target_text);
        self.snapshot().lookup(&source, &target)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        *self.entries.write() = Arc::new(VecDeque::with_capacity(self.capacity));
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn only_correct_pairs_are_stored() {
        let store = FeedbackStore::new(10, 0.3);
        assert_eq!(store.record("Look!", "看!", false), 0);
        assert_eq!(store.record("Look!", "看!", true), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn overflow_evicts_oldest_first() {
        let store = FeedbackStore::new(3, 0.3);
        for i in 0..7 {
            store.record(&format!("line {i}"), &format!("行 {i}"), true);
        }
        assert_eq!(store.len(), 3);
        let kept: Vec<String> = store
            .snapshot()
            .entries()
            .map(|e| e.source_text.clone())
            .collect();
        assert_eq!(kept, ["line 4", "line 5", "line 6"]);
    }

    #[test]
    fn lookup_is_case_insensitive_on_source_only() {
        let store = FeedbackStore::new(10, 0.3);
        store.record("Wish ours was that fancy", "船如果那麼漂亮就好了", true);
        assert!((store.lookup("I WISH OURS WAS THAT FANCY!", "唉，船如果那麼漂亮就好了") - 0.3).abs() < 1e-6);
        assert_eq!(store.lookup("wish ours was that fancy", "船"), 0.0);

        let latin = FeedbackStore::new(10, 0.3);
        latin.record("hello", "Bonjour", true);
        assert_eq!(latin.lookup("hello", "bonjour"), 0.0);
        assert!(latin.lookup("hello", "Bonjour") > 0.0);
    }

    #[test]
    fn blank_pairs_are_ignored() {
        let store = FeedbackStore::new(10, 0.3);
        assert_eq!(store.record("(music)", "你好", true), 0);
        assert_eq!(store.record("hello", "   ", true), 0);
    }

    #[test]
    fn snapshot_is_stable_while_store_changes() {
        let store = FeedbackStore::new(10, 0.3);
        store.record("hello", "你好", true);
        let snapshot = store.snapshot();
        store.clear();
        assert_eq!(snapshot.len(), 1);
        assert!(store.is_empty());
        assert!(snapshot.lookup("hello there", "你好啊") > 0.0);
    }

    #[test]
    fn concurrent_appends_respect_capacity() {
        let store = Arc::new(FeedbackStore::new(50, 0.3));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..100 {
                        store.record(&format!("t{t} line {i}"), "好", true);
                        let _ = store.snapshot().lookup("t0 line 1", "好");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("writer thread");
        }
        assert_eq!(store.len(), 50);
    }
}
