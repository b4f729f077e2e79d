use super::transaction::TransactionTimer;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::time::Instant;

/// Deadline-ordered transaction timers.
///
/// Each (owner, timer) pair has at most one deadline; scheduling it again
/// replaces the old one. The endpoint sleeps until `next_deadline` and then
/// collects whatever `pop_expired` returns.
#[derive(Debug)]
pub struct TimerQueue<K> {
    deadlines: BTreeMap<(Instant, u64), (K, TransactionTimer)>,
    index: HashMap<(K, TransactionTimer), (Instant, u64)>,
    next_id: u64,
}

impl<K: Clone + Eq + Hash> Default for TimerQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone + Eq + Hash> TimerQueue<K> {
    pub fn new() -> Self {
        Self {
            deadlines: BTreeMap::new(),
            index: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn schedule(&mut self, owner: K, timer: TransactionTimer, at: Instant) {
        self.cancel(&owner, timer);
        // The id keeps equal deadlines distinct and in scheduling order
        let slot = (at, self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.deadlines.insert(slot, (owner.clone(), timer));
        self.index.insert((owner, timer), slot);
    }

    pub fn cancel(&mut self, owner: &K, timer: TransactionTimer) {
        if let Some(slot) = self.index.remove(&(owner.clone(), timer)) {
            self.deadlines.remove(&slot);
        }
    }

    pub fn cancel_all(&mut self, owner: &K) {
        for timer in TransactionTimer::ALL {
            self.cancel(owner, timer);
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.keys().next().map(|(at, _)| *at)
    }

    /// Removes and returns every timer due at or before `now`, earliest first.
    pub fn pop_expired(&mut self, now: Instant) -> Vec<(K, TransactionTimer)> {
        let mut expired = Vec::new();
        while let Some(entry) = self.deadlines.first_entry() {
            if entry.key().0 > now {
                break;
            }
            let (owner, timer) = entry.remove();
            self.index.remove(&(owner.clone(), timer));
            expired.push((owner, timer));
        }
        expired
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.deadlines.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }
}
