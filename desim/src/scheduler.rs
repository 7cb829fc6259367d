use std::any::Any;
use std::cell::Cell;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::rc::Rc;
use std::time::Duration;

use crate::{Clock, ComponentId, Error};

/// Entry type stored in the scheduler, including the event value, component ID, and the time when
/// it is supposed to occur.
///
/// Entries are ordered so that a max-heap pops the earliest time first, and among entries with
/// equal times, the one scheduled first.
#[derive(Debug)]
pub struct EventEntry {
    time: Reverse<Duration>,
    sequence: Reverse<u64>,
    component: usize,
    event_type: &'static str,
    inner: Box<dyn Any>,
}

impl EventEntry {
    /// The time at which the event occurs.
    #[must_use]
    pub fn time(&self) -> Duration {
        self.time.0
    }

    /// Index of the component the event is addressed to.
    #[must_use]
    pub fn component_idx(&self) -> usize {
        self.component
    }

    /// Name of the event type, for diagnostics.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        self.event_type
    }

    /// Takes the event value out of the entry if it is of type `E`.
    /// If the type does not match, the entry is given back.
    ///
    /// # Errors
    ///
    /// Returns the entry unchanged if it does not hold an event of type `E`.
    pub fn into_event<E: 'static>(self) -> Result<E, Self> {
        if self.inner.is::<E>() {
            match self.inner.downcast::<E>() {
                Ok(event) => Ok(*event),
                Err(_) => unreachable!("type was checked above"),
            }
        } else {
            Err(self)
        }
    }

    pub(crate) fn into_parts(self) -> (usize, Box<dyn Any>) {
        (self.component, self.inner)
    }
}

impl PartialEq for EventEntry {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.sequence == other.sequence
    }
}

impl Eq for EventEntry {}

impl PartialOrd for EventEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .cmp(&other.time)
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

/// This struct has only immutable access to the simulation clock exposed.
#[derive(Debug, Clone)]
pub struct ClockRef {
    clock: Clock,
}

impl From<Clock> for ClockRef {
    fn from(clock: Clock) -> Self {
        Self { clock }
    }
}

impl ClockRef {
    /// Return the current simulation time.
    #[must_use]
    pub fn time(&self) -> Duration {
        self.clock.get()
    }
}

/// Scheduler is used to keep the current time and information about the upcoming events.
#[derive(Debug)]
pub struct Scheduler {
    events: BinaryHeap<EventEntry>,
    clock: Clock,
    next_sequence: u64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            events: BinaryHeap::new(),
            clock: Rc::new(Cell::new(Duration::default())),
            next_sequence: 0,
        }
    }
}

impl Scheduler {
    /// Schedules `event` to be executed for `component` at `self.time() + delay`.
    ///
    /// If the resulting time cannot be represented, the event is scheduled at [`Duration::MAX`],
    /// which no finite run ever reaches.
    pub fn schedule<E: 'static>(&mut self, delay: Duration, component: ComponentId<E>, event: E) {
        let time = self.time().checked_add(delay).unwrap_or(Duration::MAX);
        self.push(time, component, event);
    }

    /// Schedules `event` to be executed for `component` at `self.time()`.
    ///
    /// It will be executed after all other events already scheduled for the current time.
    pub fn schedule_immediately<E: 'static>(&mut self, component: ComponentId<E>, event: E) {
        self.schedule(Duration::ZERO, component, event);
    }

    /// Schedules `event` to be executed for `component` at the absolute `time`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSchedule`] if `time` is earlier than the current time.
    pub fn schedule_at<E: 'static>(
        &mut self,
        time: Duration,
        component: ComponentId<E>,
        event: E,
    ) -> Result<(), Error> {
        let now = self.time();
        if time < now {
            return Err(Error::InvalidSchedule { time, now });
        }
        self.push(time, component, event);
        Ok(())
    }

    fn push<E: 'static>(&mut self, time: Duration, component: ComponentId<E>, event: E) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.events.push(EventEntry {
            time: Reverse(time),
            sequence: Reverse(sequence),
            component: component.id(),
            event_type: std::any::type_name::<E>(),
            inner: Box::new(event),
        });
    }

    /// Returns the current simulation time.
    #[must_use]
    pub fn time(&self) -> Duration {
        self.clock.get()
    }

    /// Returns a structure with immutable access to the simulation time.
    #[must_use]
    pub fn clock(&self) -> ClockRef {
        ClockRef {
            clock: Rc::clone(&self.clock),
        }
    }

    /// Time of the next scheduled event, if any.
    #[must_use]
    pub fn peek_time(&self) -> Option<Duration> {
        self.events.peek().map(EventEntry::time)
    }

    /// Number of events waiting in the queue.
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Removes and returns the next scheduled event, advancing the clock to its time.
    ///
    /// The `horizon` is exclusive: if the earliest event is scheduled at or after it, nothing is
    /// removed, the clock moves to the horizon, and `Ok(None)` is returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueueEmpty`] if there are no events left.
    pub fn advance(&mut self, horizon: Duration) -> Result<Option<EventEntry>, Error> {
        let next = self.peek_time().ok_or(Error::QueueEmpty { now: self.time() })?;
        if next >= horizon {
            self.clock.set(horizon.max(self.time()));
            return Ok(None);
        }
        let entry = self.events.pop();
        if let Some(entry) = &entry {
            debug_assert!(entry.time() >= self.time(), "time must not go backwards");
            self.clock.set(entry.time());
            log::trace!(
                "[{:?}] {} -> component {}",
                entry.time(),
                entry.event_type,
                entry.component
            );
        }
        Ok(entry)
    }
}
