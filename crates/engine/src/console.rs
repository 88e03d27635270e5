use std::collections::VecDeque;

use crate::log::LogRecord;

pub const MAX_CONSOLE_RECORDS: usize = 512;

/// Presentation sink for scheduler output.
pub trait Console {
    /// Replaces everything shown.
    fn set(&mut self, records: &[LogRecord]);
    /// Appends after what is already shown.
    fn add(&mut self, records: &[LogRecord]);

    /// Most recent record, when the sink keeps history.
    fn latest(&self) -> Option<&LogRecord> {
        None
    }
}

/// Bounded in-memory console. Oldest records are dropped first.
#[derive(Debug, Default, Clone)]
pub struct ConsoleBuffer {
    records: VecDeque<LogRecord>,
    revision: u64,
}

impl ConsoleBuffer {
    pub fn records(&self) -> impl Iterator<Item = &LogRecord> {
        self.records.iter()
    }

    pub fn last(&self) -> Option<&LogRecord> {
        self.records.back()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Bumped on every `set` or `add`, so callers can skip redraws when nothing changed.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn messages(&self) -> Vec<&str> {
        self.records
            .iter()
            .map(|record| record.message.as_str())
            .collect()
    }
}

impl Console for ConsoleBuffer {
    fn set(&mut self, records: &[LogRecord]) {
        self.records.clear();
        self.add(records);
    }

    fn add(&mut self, records: &[LogRecord]) {
        for record in records {
            push_bounded(&mut self.records, record.clone(), MAX_CONSOLE_RECORDS);
        }
        self.revision = self.revision.saturating_add(1);
    }

    fn latest(&self) -> Option<&LogRecord> {
        self.last()
    }
}

fn push_bounded(queue: &mut VecDeque<LogRecord>, value: LogRecord, max_len: usize) {
    if queue.len() == max_len {
        queue.pop_front();
    }
    queue.push_back(value);
}
