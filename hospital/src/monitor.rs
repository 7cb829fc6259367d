use std::time::Duration;

use desim::{Component, ComponentId, Error, Key, ResourceId, Scheduler, State, StoreId};

use crate::{HospitalLog, Patient};

/// Monitor events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Reports the current state and schedules the next report after the monitor interval.
    Report,
}

/// Periodically reports the waiting-room length and the number of diagnosed patients.
///
/// The monitor only observes: it never takes patients nor doctors.
pub struct Monitor {
    interval: Duration,
    waiting_room: StoreId<Patient>,
    doctors: ResourceId,
    log: Key<HospitalLog>,
}

impl Monitor {
    /// Constructs a new monitor reporting every `interval`.
    ///
    /// # Panics
    ///
    /// Panics if `interval` is zero, as the monitor would never let the time advance.
    #[must_use]
    pub fn new(
        interval: Duration,
        waiting_room: StoreId<Patient>,
        doctors: ResourceId,
        log: Key<HospitalLog>,
    ) -> Self {
        assert!(interval > Duration::ZERO, "Monitor interval must be positive");
        Self {
            interval,
            waiting_room,
            doctors,
            log,
        }
    }
}

impl Component for Monitor {
    type Event = Event;

    fn process_event(
        &mut self,
        self_id: ComponentId<Self::Event>,
        event: Self::Event,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) -> Result<(), Error> {
        match event {
            Event::Report => {
                let waiting = state.store_len(self.waiting_room);
                let busy_doctors = state.resource(self.doctors).in_use();
                let report = state
                    .get_mut(self.log)
                    .expect("Hospital log not found in state")
                    .report(waiting, busy_doctors);
                log::info!(
                    "[{:.2}] waiting: {}, diagnosed: {}, busy doctors: {}",
                    report.time.as_secs_f64(),
                    report.waiting,
                    report.diagnosed,
                    report.busy_doctors
                );
                scheduler.schedule(self.interval, self_id, Event::Report);
            }
        }
        Ok(())
    }
}
