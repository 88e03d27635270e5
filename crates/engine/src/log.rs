use std::fmt;
use std::mem;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogState {
    Valid,
    Info,
    Error,
}

impl LogState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Info => "info",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub state: LogState,
    pub message: String,
}

impl LogRecord {
    pub fn new(state: LogState, message: impl Into<String>) -> Self {
        Self {
            state,
            message: message.into(),
        }
    }

    pub fn valid(message: impl Into<String>) -> Self {
        Self::new(LogState::Valid, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogState::Info, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogState::Error, message)
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.state.as_str(), self.message)
    }
}

/// Records produced during one tick, in actor update order. Taken once per tick by the scheduler.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LogBatch {
    records: Vec<LogRecord>,
}

impl LogBatch {
    pub fn push(&mut self, record: LogRecord) {
        self.records.push(record);
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn take(&mut self) -> Vec<LogRecord> {
        mem::take(&mut self.records)
    }
}
