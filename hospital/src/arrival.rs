use desim::{duration_from_units, Component, ComponentId, Error, Key, Scheduler, State, StoreId};
use rand::Rng;
use rand_distr::Distribution;

use crate::{HospitalLog, Patient, PatientNumber, ProfileProvider};

/// Arrival process events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Starts the process: waits the first interarrival time.
    Start,
    /// A new patient arrives and enters the waiting room, and the next arrival is scheduled.
    Arrive,
}

/// Generates patients at random intervals and puts them into the waiting room.
pub struct Arrivals<R, D>
where
    R: Rng,
    D: Distribution<f64>,
{
    rng: Key<R>,
    interarrival: D,
    profiles: Box<dyn ProfileProvider>,
    waiting_room: StoreId<Patient>,
    log: Key<HospitalLog>,
    counter: usize,
}

impl<R, D> Arrivals<R, D>
where
    R: Rng,
    D: Distribution<f64>,
{
    /// Constructs a new arrival process.
    ///
    /// Interarrival times are sampled from `interarrival` with the generator under `rng`, which is
    /// also the source of patient identifiers.
    pub fn new(
        rng: Key<R>,
        interarrival: D,
        profiles: Box<dyn ProfileProvider>,
        waiting_room: StoreId<Patient>,
        log: Key<HospitalLog>,
    ) -> Self {
        Self {
            rng,
            interarrival,
            profiles,
            waiting_room,
            log,
            counter: 0,
        }
    }

    fn schedule_next(&self, self_id: ComponentId<Event>, scheduler: &mut Scheduler, state: &mut State)
    where
        R: 'static,
    {
        let rng = state.get_mut(self.rng).expect("Random generator not found in state");
        let interval = duration_from_units(self.interarrival.sample(rng));
        log::trace!("Next arrival in {:?}", interval);
        scheduler.schedule(interval, self_id, Event::Arrive);
    }
}

impl<R, D> Component for Arrivals<R, D>
where
    R: Rng + 'static,
    D: Distribution<f64>,
{
    type Event = Event;

    fn process_event(
        &mut self,
        self_id: ComponentId<Self::Event>,
        event: Self::Event,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) -> Result<(), Error> {
        match event {
            Event::Start => {}
            Event::Arrive => {
                self.counter += 1;
                let rng = state.get_mut(self.rng).expect("Random generator not found in state");
                let id = uuid::Builder::from_random_bytes(rng.gen()).into_uuid();
                let patient = Patient::new(
                    id,
                    PatientNumber::from(self.counter),
                    scheduler.time(),
                    self.profiles.generate_profile(),
                );
                log::debug!("[{:?}] {} arrives", scheduler.time(), patient);
                state
                    .get_mut(self.log)
                    .expect("Hospital log not found in state")
                    .arrival(&patient);
                state.put_item(self.waiting_room, patient, scheduler);
            }
        }
        self.schedule_next(self_id, scheduler, state);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{Profile, Sex};

    use std::time::Duration;

    use chrono::NaiveDate;
    use desim::Simulation;
    use rand::rngs::mock::StepRng;
    use testing::SequenceDistribution;

    fn profile() -> Profile {
        Profile {
            name: String::from("John Smith"),
            address: String::from("12 Oak Avenue"),
            sex: Sex::Male,
            birthdate: NaiveDate::from_ymd_opt(1975, 8, 14).unwrap(),
        }
    }

    #[test]
    fn test_arrivals() {
        let mut sim = Simulation::default();
        let rng = sim.insert(StepRng::new(1, 1));
        let log = sim.insert(HospitalLog::new(sim.scheduler.clock()));
        let waiting_room = sim.add_store::<Patient>();
        let arrivals = sim.add_component(Arrivals::new(
            rng,
            SequenceDistribution::new(vec![2.0, 3.0, 0.5]),
            Box::new(profile),
            waiting_room,
            log,
        ));
        sim.schedule(Duration::ZERO, arrivals, Event::Start);
        assert_eq!(sim.run_until(Duration::from_secs(7)), Ok(Duration::from_secs(7)));

        let patients: Vec<_> = sim
            .state
            .store(waiting_room)
            .iter()
            .map(|p| (usize::from(p.number()), p.created_at()))
            .collect();
        assert_eq!(
            patients,
            vec![
                (1, Duration::from_secs(2)),
                (2, Duration::from_secs(5)),
                (3, Duration::from_millis(5500)),
                (4, Duration::from_secs(6)),
                (5, Duration::from_millis(6500)),
            ]
        );
        let first = sim.state.store(waiting_room).iter().next().unwrap();
        assert_eq!(first.name(), "John Smith");
        assert_eq!(sim.state.get(log).unwrap().generated(), 5);

        let ids: std::collections::HashSet<_> =
            sim.state.store(waiting_room).iter().map(Patient::id).collect();
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn test_infinite_interarrival_never_arrives() {
        let mut sim = Simulation::default();
        let rng = sim.insert(StepRng::new(0, 1));
        let log = sim.insert(HospitalLog::new(sim.scheduler.clock()));
        let waiting_room = sim.add_store::<Patient>();
        let arrivals = sim.add_component(Arrivals::new(
            rng,
            testing::ConstantDistribution::new(f64::INFINITY),
            Box::new(profile),
            waiting_room,
            log,
        ));
        sim.schedule(Duration::ZERO, arrivals, Event::Start);
        assert_eq!(sim.run_until(Duration::from_secs(1000)), Ok(Duration::from_secs(1000)));
        assert_eq!(sim.state.store_len(waiting_room), 0);
        assert_eq!(sim.state.get(log).unwrap().generated(), 0);
    }
}
