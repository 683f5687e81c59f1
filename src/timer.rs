//! Lightweight interval timers
//!
//! Every timer gets a fresh integer id; a named timer is additionally
//! reachable by its name. Elapsed time is measured with
//! `std::time::Instant`, which is monotonic, so reported intervals are
//! never negative and never shrink between lookups.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::error::{Result, TraceError};
use crate::event::Frame;
use crate::format::{self, LineBlock};
use crate::sink::SinkCell;

/// A timer is addressable by its id, or by name if it has one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerKey {
    Id(u64),
    Name(String),
}

impl From<u64> for TimerKey {
    fn from(id: u64) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for TimerKey {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for TimerKey {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl fmt::Display for TimerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "#{id}"),
            Self::Name(name) => write!(f, "{name}"),
        }
    }
}

#[derive(Debug)]
struct TimerRecord {
    id: u64,
    name: Option<String>,
    started: Instant,
}

impl TimerRecord {
    fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("timer #{} ({})", self.id, name),
            None => format!("timer #{}", self.id),
        }
    }

    fn report_line(&self) -> String {
        format!("  {}: {:.6} s", self.label(), self.started.elapsed().as_secs_f64())
    }
}

#[derive(Debug, Default)]
struct TimerTable {
    next_id: u64,
    by_id: BTreeMap<u64, TimerRecord>,
    by_name: HashMap<String, u64>,
}

/// Store of live timers, reporting through the shared output sink.
pub struct TimerStore {
    sink: SinkCell,
    table: Mutex<TimerTable>,
}

impl TimerStore {
    pub(crate) fn new(sink: SinkCell) -> Self {
        Self {
            sink,
            table: Mutex::new(TimerTable::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TimerTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a timer. A name makes the timer additionally addressable by
    /// that string; a name already in use moves to the new timer while
    /// the older timer stays reachable by id. Emits a creation report
    /// with the call site and returns the fresh id.
    #[track_caller]
    pub fn create(&self, name: Option<&str>) -> Result<u64> {
        let caller = Frame::caller();
        let (id, label) = {
            let mut table = self.lock();
            table.next_id += 1;
            let id = table.next_id;
            if let Some(name) = name {
                if let Some(previous) = table.by_name.insert(name.to_string(), id) {
                    if let Some(old) = table.by_id.get_mut(&previous) {
                        old.name = None;
                    }
                }
            }
            let record = TimerRecord {
                id,
                name: name.map(str::to_string),
                started: Instant::now(),
            };
            let label = record.label();
            table.by_id.insert(id, record);
            (id, label)
        };
        tracing::debug!(id, name, "timer created");

        let mut block = LineBlock::new();
        block.push(format::marker_line(&caller));
        block.push(format!("  {label} created"));
        self.sink.write_block(&block)?;
        Ok(id)
    }

    /// Report the elapsed time of one timer without touching it, and
    /// return its id so lookups chain. Unknown keys fail with
    /// [`TraceError::TimerNotFound`].
    #[track_caller]
    pub fn lookup(&self, key: impl Into<TimerKey>) -> Result<u64> {
        let caller = Frame::caller();
        let key = key.into();
        let (id, line) = {
            let table = self.lock();
            let id = resolve(&table, &key).ok_or_else(|| TraceError::TimerNotFound {
                key: key.to_string(),
            })?;
            let record = table.by_id.get(&id).ok_or_else(|| TraceError::TimerNotFound {
                key: key.to_string(),
            })?;
            (id, record.report_line())
        };

        let mut block = LineBlock::new();
        block.push(format::marker_line(&caller));
        block.push(line);
        self.sink.write_block(&block)?;
        Ok(id)
    }

    /// Remove one timer by id or name. Either key removes both mappings.
    /// Unknown keys are ignored.
    pub fn delete(&self, key: impl Into<TimerKey>) {
        let key = key.into();
        let mut table = self.lock();
        let Some(id) = resolve(&table, &key) else {
            return;
        };
        if let Some(record) = table.by_id.remove(&id) {
            if let Some(name) = record.name {
                table.by_name.remove(&name);
            }
            tracing::debug!(id, "timer deleted");
        }
    }

    /// Remove several timers at once; unknown keys are ignored.
    pub fn delete_many<I, K>(&self, keys: I)
    where
        I: IntoIterator<Item = K>,
        K: Into<TimerKey>,
    {
        for key in keys {
            self.delete(key);
        }
    }

    /// Report every live timer, most recently created first, without
    /// mutating anything.
    #[track_caller]
    pub fn report_all(&self) -> Result<()> {
        let caller = Frame::caller();
        let mut block = LineBlock::new();
        block.push(format::marker_line(&caller));
        {
            let table = self.lock();
            for record in table.by_id.values().rev() {
                block.push(record.report_line());
            }
        }
        self.sink.write_block(&block)
    }

    pub fn count(&self) -> usize {
        self.lock().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// All live timer ids, in creation order.
    pub fn ids(&self) -> Vec<u64> {
        self.lock().by_id.keys().copied().collect()
    }

    /// All live timer names.
    pub fn names(&self) -> Vec<String> {
        let table = self.lock();
        table
            .by_id
            .values()
            .filter_map(|r| r.name.clone())
            .collect()
    }
}

fn resolve(table: &TimerTable, key: &TimerKey) -> Option<u64> {
    match key {
        TimerKey::Id(id) => table.by_id.contains_key(id).then_some(*id),
        TimerKey::Name(name) => table.by_name.get(name).copied(),
    }
}
