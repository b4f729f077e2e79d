// ABOUTME: Sequence number allocation and the table of SMPP requests awaiting a response
// ABOUTME: Owned by the session task; entries leave on their response, on timeout, or on close

use crate::datatypes::CommandId;
use crate::sip::TransactionKey;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A request written to the SMSC whose response has not arrived yet
#[derive(Debug, Clone)]
pub struct PendingSmppRequest {
    pub sequence_number: u32,
    pub sent_at: Instant,
    pub command_id: CommandId,
    /// The SIP transaction that caused a submit_sm, if any
    pub origin: Option<TransactionKey>,
}

/// Pending requests keyed by sequence number, plus the allocator.
///
/// Sequence numbers run 1..=u32::MAX, wrap back to 1 and skip any value
/// still pending. The allocator is not reset across reconnects.
#[derive(Debug)]
pub struct PendingTable {
    next: u32,
    entries: HashMap<u32, PendingSmppRequest>,
}

impl Default for PendingTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingTable {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Table whose first allocated number is `next` (0 is treated as 1)
    pub fn starting_at(next: u32) -> Self {
        Self {
            next: next.max(1),
            entries: HashMap::new(),
        }
    }

    /// Allocates the next sequence number not currently pending
    pub fn next_sequence(&mut self) -> u32 {
        loop {
            let candidate = self.next;
            self.next = if candidate == u32::MAX { 1 } else { candidate + 1 };
            if !self.entries.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    /// Allocates a sequence number and records the request under it
    pub fn track(
        &mut self,
        command_id: CommandId,
        origin: Option<TransactionKey>,
        now: Instant,
    ) -> u32 {
        let sequence_number = self.next_sequence();
        self.entries.insert(
            sequence_number,
            PendingSmppRequest {
                sequence_number,
                sent_at: now,
                command_id,
                origin,
            },
        );
        sequence_number
    }

    /// Removes and returns the request answered by `sequence_number`
    pub fn resolve(&mut self, sequence_number: u32) -> Option<PendingSmppRequest> {
        self.entries.remove(&sequence_number)
    }

    pub fn contains(&self, sequence_number: u32) -> bool {
        self.entries.contains_key(&sequence_number)
    }

    /// Removes every request older than `timeout`, oldest first
    pub fn sweep(&mut self, now: Instant, timeout: Duration) -> Vec<PendingSmppRequest> {
        let expired: Vec<u32> = self
            .entries
            .values()
            .filter(|req| now.saturating_duration_since(req.sent_at) >= timeout)
            .map(|req| req.sequence_number)
            .collect();

        let mut swept: Vec<PendingSmppRequest> = expired
            .into_iter()
            .filter_map(|seq| self.entries.remove(&seq))
            .collect();
        swept.sort_by_key(|req| req.sent_at);
        swept
    }

    /// Removes everything, oldest first
    pub fn drain(&mut self) -> Vec<PendingSmppRequest> {
        let mut all: Vec<PendingSmppRequest> = self.entries.drain().map(|(_, req)| req).collect();
        all.sort_by_key(|req| req.sent_at);
        all
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_start_at_one_and_increase() {
        let mut table = PendingTable::new();
        assert_eq!(table.next_sequence(), 1);
        assert_eq!(table.next_sequence(), 2);
    }

    #[test]
    fn allocation_wraps_and_skips_pending_values() {
        let now = Instant::now();
        let mut table = PendingTable::starting_at(1);
        let one = table.track(CommandId::SubmitSm, None, now);
        assert_eq!(one, 1);

        let mut table2 = PendingTable::starting_at(u32::MAX);
        table2.entries.insert(
            1,
            PendingSmppRequest {
                sequence_number: 1,
                sent_at: now,
                command_id: CommandId::SubmitSm,
                origin: None,
            },
        );
        assert_eq!(table2.next_sequence(), u32::MAX);
        // 0 is never issued and 1 is still pending
        assert_eq!(table2.next_sequence(), 2);
    }

    #[test]
    fn resolve_removes_exactly_once() {
        let now = Instant::now();
        let mut table = PendingTable::new();
        let seq = table.track(CommandId::SubmitSm, None, now);
        assert!(table.contains(seq));
        assert!(table.resolve(seq).is_some());
        assert!(table.resolve(seq).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn sweep_takes_only_expired_entries() {
        let t0 = Instant::now();
        let mut table = PendingTable::new();
        let old = table.track(CommandId::SubmitSm, None, t0);
        let fresh = table.track(CommandId::SubmitSm, None, t0 + Duration::from_secs(8));

        let swept = table.sweep(t0 + Duration::from_secs(10), Duration::from_secs(10));
        assert_eq!(swept.len(), 1);
        assert_eq!(swept[0].sequence_number, old);
        assert!(table.contains(fresh));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn drain_empties_table() {
        let now = Instant::now();
        let mut table = PendingTable::new();
        table.track(CommandId::SubmitSm, None, now);
        table.track(CommandId::EnquireLink, None, now);
        assert_eq!(table.drain().len(), 2);
        assert!(table.is_empty());
    }
}
