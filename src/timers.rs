// Instance-scoped timer registry.
//
// Pending work is stored as plain event values keyed by due time. The
// owner pops due events and applies them against its current state, so a
// timer never holds a snapshot of the collection it will update.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use crate::clock::to_chrono;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug)]
pub struct Fired<E> {
    pub due: DateTime<Utc>,
    pub event: E,
}

#[derive(Debug)]
pub struct TimerQueue<E> {
    next_seq: u64,
    entries: BTreeMap<(DateTime<Utc>, u64), E>,
    due_by_id: HashMap<u64, DateTime<Utc>>,
}

impl<E> Default for TimerQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> TimerQueue<E> {
    pub fn new() -> Self {
        TimerQueue {
            next_seq: 0,
            entries: BTreeMap::new(),
            due_by_id: HashMap::new(),
        }
    }

    pub fn schedule_at(&mut self, due: DateTime<Utc>, event: E) -> TimerId {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert((due, seq), event);
        self.due_by_id.insert(seq, due);
        TimerId(seq)
    }

    pub fn schedule_after(&mut self, now: DateTime<Utc>, delay: Duration, event: E) -> TimerId {
        self.schedule_at(now + to_chrono(delay), event)
    }

    /// Returns false if the timer already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.due_by_id.remove(&id.0) {
            Some(due) => self.entries.remove(&(due, id.0)).is_some(),
            None => false,
        }
    }

    /// Cancel every pending event matching `pred`. Returns how many were dropped.
    pub fn cancel_where(&mut self, mut pred: impl FnMut(&E) -> bool) -> usize {
        let doomed: Vec<(DateTime<Utc>, u64)> = self
            .entries
            .iter()
            .filter(|(_, event)| pred(event))
            .map(|(key, _)| *key)
            .collect();
        for key in &doomed {
            self.entries.remove(key);
            self.due_by_id.remove(&key.1);
        }
        doomed.len()
    }

    /// Pop the earliest event due at or before `now`, with the instant it was due.
    /// Ties fire in scheduling order.
    pub fn pop_due(&mut self, now: DateTime<Utc>) -> Option<Fired<E>> {
        let key = *self.entries.keys().next()?;
        if key.0 > now {
            return None;
        }
        let event = self.entries.remove(&key)?;
        self.due_by_id.remove(&key.1);
        Some(Fired { due: key.0, event })
    }

    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.entries.keys().next().map(|(due, _)| *due)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.due_by_id.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.entries.values()
    }

    /// Pending events, mutable in place. Due times cannot change this way.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut E> {
        self.entries.values_mut()
    }
}
