use crate::sip::TransactionKey;
use std::collections::{HashMap, HashSet};

/// Where the deliver_sm_resp for an outbound MESSAGE must go
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeliveryRef {
    pub sequence_number: u32,
    pub generation: u64,
}

/// Cross-protocol identity for messages in flight.
///
/// SIP→SMPP: an inbound MESSAGE is first `awaiting` a sequence number, then
/// mapped `by_sequence` once its submit_sm is on the wire. SMPP→SIP: the
/// branch of each outbound MESSAGE maps to the deliver_sm it carries.
///
/// Every entry maps to exactly one counterpart; inserts that would alias an
/// existing entry are refused.
#[derive(Debug, Default)]
pub struct CorrelationTable {
    awaiting: HashSet<TransactionKey>,
    by_sequence: HashMap<u32, TransactionKey>,
    by_branch: HashMap<String, DeliveryRef>,
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an inbound MESSAGE handed to the SMPP session. Returns false
    /// if the transaction is already being bridged.
    pub fn expect_submit(&mut self, key: TransactionKey) -> bool {
        if self.by_sequence.values().any(|k| *k == key) {
            return false;
        }
        self.awaiting.insert(key)
    }

    /// The session assigned `sequence_number` to `key`'s submit_sm.
    pub fn bind_sequence(&mut self, key: &TransactionKey, sequence_number: u32) -> bool {
        if self.by_sequence.contains_key(&sequence_number) || !self.awaiting.remove(key) {
            return false;
        }
        self.by_sequence.insert(sequence_number, key.clone());
        true
    }

    /// Removes the transaction waiting on submit_sm `sequence_number`.
    pub fn take_submit(&mut self, sequence_number: u32) -> Option<TransactionKey> {
        self.by_sequence.remove(&sequence_number)
    }

    /// Drops a transaction whose submit_sm was never sent.
    pub fn abandon_submit(&mut self, key: &TransactionKey) -> bool {
        self.awaiting.remove(key)
    }

    pub fn track_delivery(&mut self, branch: String, delivery: DeliveryRef) -> bool {
        if self.by_branch.values().any(|d| *d == delivery) || self.by_branch.contains_key(&branch) {
            return false;
        }
        self.by_branch.insert(branch, delivery);
        true
    }

    pub fn take_delivery(&mut self, branch: &str) -> Option<DeliveryRef> {
        self.by_branch.remove(branch)
    }

    /// Whether the deliver_sm is already being carried by some MESSAGE
    pub fn is_delivering(&self, delivery: &DeliveryRef) -> bool {
        self.by_branch.values().any(|d| d == delivery)
    }

    /// Empties the table, returning every SIP transaction still owed a
    /// response and every deliver_sm still owed a deliver_sm_resp.
    pub fn drain(&mut self) -> (Vec<TransactionKey>, Vec<DeliveryRef>) {
        let mut transactions: Vec<TransactionKey> = self.awaiting.drain().collect();
        transactions.extend(self.by_sequence.drain().map(|(_, key)| key));
        let deliveries = self.by_branch.drain().map(|(_, d)| d).collect();
        (transactions, deliveries)
    }

    pub fn pending_submits(&self) -> usize {
        self.awaiting.len() + self.by_sequence.len()
    }

    pub fn pending_deliveries(&self) -> usize {
        self.by_branch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending_submits() == 0 && self.pending_deliveries() == 0
    }
}
