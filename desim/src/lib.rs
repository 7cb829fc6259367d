#![warn(
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::default_trait_access)]

//! General purpose discrete-event simulation engine.
//!
//! The engine provides a virtual clock with an event queue ([`Scheduler`]), a process runtime in
//! which every process is a [`Component`] resumed by its own typed events, and the two contention
//! primitives processes suspend on: a capacity-limited [`Resource`] with FIFO admission, and an
//! unbounded FIFO [`Store`] with pending consumers. Both live in the simulation [`State`].
//!
//! Only one component runs at a time, and each resumption runs to completion before the next
//! event is popped. Events scheduled for the same instant fire in the order they were scheduled.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

/// Simulation clock.
pub type Clock = Rc<Cell<Duration>>;

pub use component::{Component, ComponentId, Components};
pub use error::Error;
pub use resource::{Resource, ResourceId, Slot};
pub use scheduler::{ClockRef, EventEntry, Scheduler};
pub use simulation::Simulation;
pub use state::{Key, State, StoreId};
pub use store::Store;

mod component;
mod error;
mod resource;
mod scheduler;
mod simulation;
mod state;
mod store;

/// Converts a real-valued amount of time units to virtual time.
///
/// One time unit is one virtual second. Values too large to be represented, including
/// infinity, saturate to [`Duration::MAX`], i.e., they never happen. Negative and NaN values
/// are treated as zero.
#[must_use]
pub fn duration_from_units(units: f64) -> Duration {
    if units.is_nan() || units <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(units).unwrap_or(Duration::MAX)
}
