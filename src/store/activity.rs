//! Append-only audit trail of access attempts.

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use super::{slot, Slot};
use crate::types::{Key, Result};

/// Default number of records the audit log holds.
pub const MAX_LOG: usize = 5;

/// Verdict recorded for an access attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessStatus {
    Denied,
    Granted,
}

impl AccessStatus {
    pub fn is_granted(self) -> bool {
        matches!(self, AccessStatus::Granted)
    }

    /// Numeric form used by the admin console ("0" denied, "1" granted).
    pub fn as_flag(self) -> u8 {
        match self {
            AccessStatus::Denied => 0,
            AccessStatus::Granted => 1,
        }
    }
}

impl From<bool> for AccessStatus {
    fn from(granted: bool) -> Self {
        if granted {
            AccessStatus::Granted
        } else {
            AccessStatus::Denied
        }
    }
}

/// One audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub code: Key,
    pub status: AccessStatus,
}

impl ActivityEntry {
    /// Record stamped with the server's local clock.
    pub fn now(code: Key, status: AccessStatus) -> Self {
        Self::at(Local::now().naive_local(), code, status)
    }

    pub fn at(timestamp: NaiveDateTime, code: Key, status: AccessStatus) -> Self {
        Self {
            date: timestamp.date(),
            time: timestamp.time(),
            code,
            status,
        }
    }
}

/// Fixed-capacity audit buffer. Full means full: nothing is evicted.
#[derive(Debug)]
pub struct ActivityLog {
    entries: Mutex<Vec<ActivityEntry>>,
    capacity: usize,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::with_capacity(MAX_LOG)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append a record. Returns its 1-based slot, or `None` if the log is full.
    pub fn append(&self, entry: ActivityEntry) -> Result<Option<Slot>> {
        let mut entries = self.entries.lock()?;
        if entries.len() >= self.capacity {
            return Ok(None);
        }
        entries.push(entry);
        Ok(Some(slot(entries.len() - 1)))
    }

    /// Records in append order.
    pub fn snapshot(&self) -> Result<Vec<ActivityEntry>> {
        Ok(self.entries.lock()?.clone())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.entries.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn is_full(&self) -> Result<bool> {
        Ok(self.len()? >= self.capacity)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}
