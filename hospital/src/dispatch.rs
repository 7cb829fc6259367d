use desim::{
    duration_from_units, Component, ComponentId, Error, Key, ResourceId, Scheduler, Slot, State,
    StoreId,
};
use rand::Rng;
use rand_distr::Distribution;

use crate::{HospitalLog, Patient};

/// Dispatcher events.
///
/// A single dispatcher drives all diagnoses, one at a time. It takes the earliest waiting
/// patient, then waits for a free doctor. Once both are held, the diagnosis starts, and the next
/// patient is taken only after the doctor is released.
#[derive(Debug)]
pub enum Event {
    /// Starts the dispatch loop by requesting the first patient.
    Start,
    /// A patient was taken out of the waiting room and now waits for a doctor.
    PatientReady(Patient),
    /// A doctor was assigned to the patient; the diagnosis starts.
    DoctorReady {
        /// Diagnosed patient.
        patient: Patient,
        /// Slot of the diagnosing doctor.
        slot: Slot,
    },
    /// The diagnosis is over; the doctor is released.
    DiagnosisFinished {
        /// Diagnosed patient.
        patient: Patient,
        /// Slot of the diagnosing doctor.
        slot: Slot,
    },
}

/// Matches waiting patients with doctors and diagnoses them.
pub struct Dispatcher<R, D>
where
    R: Rng,
    D: Distribution<f64>,
{
    rng: Key<R>,
    diagnosis: D,
    waiting_room: StoreId<Patient>,
    doctors: ResourceId,
    log: Key<HospitalLog>,
}

impl<R, D> Dispatcher<R, D>
where
    R: Rng,
    D: Distribution<f64>,
{
    /// Constructs a new dispatcher. Diagnosis times are sampled from `diagnosis` with the
    /// generator under `rng`.
    pub fn new(
        rng: Key<R>,
        diagnosis: D,
        waiting_room: StoreId<Patient>,
        doctors: ResourceId,
        log: Key<HospitalLog>,
    ) -> Self {
        Self {
            rng,
            diagnosis,
            waiting_room,
            doctors,
            log,
        }
    }

    fn next_patient(&self, self_id: ComponentId<Event>, scheduler: &mut Scheduler, state: &mut State) {
        state.get_item(self.waiting_room, scheduler, self_id, Event::PatientReady);
    }

    fn log_mut<'a>(&self, state: &'a mut State) -> &'a mut HospitalLog {
        state
            .get_mut(self.log)
            .expect("Hospital log not found in state")
    }
}

impl<R, D> Component for Dispatcher<R, D>
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
            Event::Start => self.next_patient(self_id, scheduler, state),
            Event::PatientReady(patient) => {
                log::trace!("[{:?}] {} waits for a doctor", scheduler.time(), patient);
                state.acquire(self.doctors, scheduler, self_id, move |slot| {
                    Event::DoctorReady { patient, slot }
                });
            }
            Event::DoctorReady { patient, slot } => {
                log::debug!(
                    "[{:?}] Doctor {} starts diagnosing {}",
                    scheduler.time(),
                    slot.grant(),
                    patient
                );
                self.log_mut(state).diagnosis_started(&patient);
                let rng = state
                    .get_mut(self.rng)
                    .expect("Random generator not found in state");
                let duration = duration_from_units(self.diagnosis.sample(rng));
                scheduler.schedule(
                    duration,
                    self_id,
                    Event::DiagnosisFinished { patient, slot },
                );
            }
            Event::DiagnosisFinished { patient, slot } => {
                let log_key = self.log;
                state.with_released(slot, scheduler, |state, scheduler| {
                    let log = state
                        .get_mut(log_key)
                        .expect("Hospital log not found in state");
                    log.diagnosis_finished(&patient);
                    log::info!(
                        "[{:.2}] {} is diagnosed; {} diagnosed so far",
                        scheduler.time().as_secs_f64(),
                        patient,
                        log.diagnosed()
                    );
                    Ok::<_, Error>(())
                })?;
                self.next_patient(self_id, scheduler, state);
            }
        }
        Ok(())
    }
}
