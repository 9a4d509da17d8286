use std::collections::{BTreeMap, HashSet};

use crate::record::IndexRecord;

/// Where the next page starts.
///
/// `since` is inclusive, so a page repeats every record at the cursor
/// timestamp that the previous page already returned. Those are remembered
/// and filtered out.
#[derive(Debug, Default)]
pub struct ReadCursor {
    since: String,
    seen_at_since: HashSet<(String, String)>,
}

impl ReadCursor {
    pub fn new(since: impl Into<String>) -> Self {
        Self {
            since: since.into(),
            seen_at_since: HashSet::new(),
        }
    }

    pub fn since(&self) -> &str {
        &self.since
    }

    /// Advance over `record`. Returns false when it was already consumed.
    pub fn observe(&mut self, record: &IndexRecord) -> bool {
        let key = (record.path.clone(), record.version.clone());
        if record.timestamp != self.since {
            self.since = record.timestamp.clone();
            self.seen_at_since.clear();
        }
        self.seen_at_since.insert(key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Running,
    Done,
    Abandoned,
}

/// Highest cursor that can be persisted while records finish out of order.
///
/// Every dispatched record gets a sequence number from [`begin`]. The
/// committed cursor moves to a record's timestamp only once that record and
/// everything dispatched before it have completed. An abandoned record holds
/// the cursor back for the rest of the session.
///
/// [`begin`]: Watermark::begin
#[derive(Debug, Default)]
pub struct Watermark {
    next_seq: u64,
    slots: BTreeMap<u64, (String, Slot)>,
    committed: String,
}

impl Watermark {
    pub fn new(committed: impl Into<String>) -> Self {
        Self {
            committed: committed.into(),
            ..Self::default()
        }
    }

    pub fn begin(&mut self, timestamp: impl Into<String>) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.slots.insert(seq, (timestamp.into(), Slot::Running));
        seq
    }

    /// Mark `seq` finished. Returns the new committed cursor when it moved.
    pub fn complete(&mut self, seq: u64) -> Option<&str> {
        if let Some((_, slot)) = self.slots.get_mut(&seq) {
            if *slot == Slot::Running {
                *slot = Slot::Done;
            }
        }

        let mut advanced = None;
        while let Some(entry) = self.slots.first_entry() {
            if entry.get().1 != Slot::Done {
                break;
            }
            advanced = Some(entry.remove().0);
        }
        match advanced {
            Some(timestamp) if timestamp != self.committed => {
                self.committed = timestamp;
                Some(self.committed.as_str())
            }
            _ => None,
        }
    }

    /// Mark `seq` as never finishing in this session.
    pub fn abandon(&mut self, seq: u64) {
        if let Some((_, slot)) = self.slots.get_mut(&seq) {
            *slot = Slot::Abandoned;
        }
    }

    pub fn committed(&self) -> &str {
        &self.committed
    }

    /// Records begun but not yet completed or abandoned.
    pub fn in_flight(&self) -> usize {
        self.slots.values().filter(|(_, slot)| *slot == Slot::Running).count()
    }

    pub fn abandoned(&self) -> usize {
        self.slots.values().filter(|(_, slot)| *slot == Slot::Abandoned).count()
    }
}
