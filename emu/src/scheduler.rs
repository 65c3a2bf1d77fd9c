//! # Scheduler
//!
//! Global cycle counter plus a queue of timed events. The CPU feeds it the
//! cost of every step; peripherals schedule events and the host pops the due
//! ones between steps.
//!
//! Events are plain data: `tag` only means something to whoever scheduled
//! it. Events armed with [`Scheduler::schedule_on`] stay parked until the
//! matching [`EventTrigger`] fires and only then start counting their delay.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::InternalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventTrigger {
    VBlank,
    HBlank,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub time: u64,
    pub id: EventId,
    pub tag: u32,
}

// Reversed so that `BinaryHeap` pops the earliest event, oldest id first.
impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.time, other.id).cmp(&(self.time, self.id))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct DeferredEvent {
    trigger: EventTrigger,
    delay: u64,
    id: EventId,
    tag: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scheduler {
    cycles: u64,
    next_id: u64,
    queue: BinaryHeap<Event>,
    cancelled: HashSet<EventId>,
    deferred: Vec<DeferredEvent>,
}

impl Scheduler {
    #[must_use]
    pub const fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn add_cycles(&mut self, cycles: u32) -> Result<(), InternalError> {
        self.cycles = self
            .cycles
            .checked_add(u64::from(cycles))
            .ok_or(InternalError::CycleOverflow)?;
        Ok(())
    }

    fn allocate_id(&mut self) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Schedules `tag` to be due `delay` cycles from now.
    pub fn schedule(&mut self, delay: u64, tag: u32) -> EventId {
        let id = self.allocate_id();
        self.queue.push(Event {
            time: self.cycles.saturating_add(delay),
            id,
            tag,
        });
        id
    }

    /// Schedules `tag` to be due `delay` cycles after the next `trigger`.
    pub fn schedule_on(&mut self, trigger: EventTrigger, delay: u64, tag: u32) -> EventId {
        let id = self.allocate_id();
        self.deferred.push(DeferredEvent {
            trigger,
            delay,
            id,
            tag,
        });
        id
    }

    /// Starts the clock of every event waiting for `trigger`.
    pub fn fire(&mut self, trigger: EventTrigger) {
        let now = self.cycles;
        let (armed, waiting): (Vec<_>, Vec<_>) = self
            .deferred
            .drain(..)
            .partition(|deferred| deferred.trigger == trigger);
        self.deferred = waiting;

        self.queue.extend(armed.into_iter().map(|deferred| Event {
            time: now.saturating_add(deferred.delay),
            id: deferred.id,
            tag: deferred.tag,
        }));
    }

    /// Returns false if the event already fired or never existed.
    pub fn cancel(&mut self, id: EventId) -> bool {
        if let Some(index) = self.deferred.iter().position(|deferred| deferred.id == id) {
            self.deferred.remove(index);
            return true;
        }
        if self.queue.iter().any(|event| event.id == id) {
            return self.cancelled.insert(id);
        }
        false
    }

    fn discard_cancelled(&mut self) {
        while let Some(event) = self.queue.peek() {
            if !self.cancelled.remove(&event.id) {
                break;
            }
            self.queue.pop();
        }
    }

    /// Time of the earliest pending event.
    pub fn next_event_at(&mut self) -> Option<u64> {
        self.discard_cancelled();
        self.queue.peek().map(|event| event.time)
    }

    /// Jumps the counter forward to the next event, by at most `limit`
    /// cycles. Returns the skipped cycles.
    pub fn idle_until_next_event(&mut self, limit: u32) -> u32 {
        match self.next_event_at() {
            Some(time) if time > self.cycles => {
                let skipped =
                    u32::try_from(time - self.cycles).map_or(limit, |gap| gap.min(limit));
                self.cycles += u64::from(skipped);
                skipped
            }
            _ => 0,
        }
    }

    /// Removes and returns the events due by now, earliest first.
    pub fn pop_due(&mut self) -> Vec<Event> {
        let mut due = Vec::new();
        loop {
            self.discard_cancelled();
            match self.queue.peek() {
                Some(event) if event.time <= self.cycles => {
                    due.extend(self.queue.pop());
                }
                _ => return due,
            }
        }
    }
}
