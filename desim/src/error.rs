use std::time::Duration;

/// Errors raised by the simulation engine.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An event was scheduled at an absolute time that has already passed.
    #[error("cannot schedule an event at {time:?}, before the current time {now:?}")]
    InvalidSchedule {
        /// Requested event time.
        time: Duration,
        /// Simulation time at the moment of the request.
        now: Duration,
    },
    /// No events are left in the queue before the run horizon was reached.
    #[error("event queue exhausted at {now:?}")]
    QueueEmpty {
        /// Simulation time of the last processed event.
        now: Duration,
    },
}
