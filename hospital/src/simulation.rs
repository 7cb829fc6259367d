use std::sync::mpsc::Sender;
use std::time::Duration;

use desim::{Key, Resource, ResourceId, Simulation, StoreId};
use indicatif::{ProgressBar, ProgressStyle};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Exp};
use serde::Serialize;

use crate::hospital_log::serialize_time;
use crate::{
    ArrivalEvent, Arrivals, ConfigError, DispatchEvent, Dispatcher, Error, HospitalConfig,
    HospitalLog, Monitor, MonitorEvent, MonitorReport, Patient, ProfileProvider, RandomProfiles,
};

/// Exponential distribution parameterized by its mean.
///
/// An infinite mean always yields an infinite sample, i.e., an event that never happens.
#[derive(Debug, Clone, Copy)]
pub struct Exponential(Option<Exp<f64>>);

impl Exponential {
    /// Constructs the distribution of the given `mean`.
    ///
    /// # Errors
    ///
    /// Returns an error if the mean is not positive.
    pub fn new(parameter: &'static str, mean: f64) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidConfiguration {
            parameter,
            expected: "positive",
            value: mean.to_string(),
        };
        if mean.is_nan() || mean <= 0.0 {
            return Err(invalid());
        }
        if mean.is_infinite() {
            return Ok(Self(None));
        }
        Exp::new(mean.recip()).map(|exp| Self(Some(exp))).map_err(|_| invalid())
    }
}

impl Distribution<f64> for Exponential {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.0.map_or(f64::INFINITY, |exp| exp.sample(rng))
    }
}

/// How the run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Termination {
    /// The clock reached the run horizon.
    HorizonReached,
    /// No events were left before the run horizon.
    Exhausted,
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// Time at which the run ended.
    #[serde(serialize_with = "serialize_time")]
    pub time: Duration,
    /// How the run ended.
    pub termination: Termination,
    /// Number of arrived patients.
    pub generated: usize,
    /// Number of started diagnoses.
    pub started: usize,
    /// Number of diagnosed patients.
    pub diagnosed: usize,
    /// Number of patients left in the waiting room.
    pub waiting: usize,
    /// Number of doctors diagnosing when the run ended.
    pub busy_doctors: usize,
    /// Mean time spent waiting by patients whose diagnosis has started.
    pub mean_waiting_time: Option<f64>,
    /// All reports made by the monitor.
    pub reports: Vec<MonitorReport>,
}

/// Hospital simulation: patients arrive, wait in the waiting room, and are diagnosed by a
/// limited number of doctors, while a monitor periodically reports the state.
pub struct HospitalSimulation {
    sim: Simulation,
    horizon: Duration,
    log: Key<HospitalLog>,
    waiting_room: StoreId<Patient>,
    doctors: ResourceId,
}

impl HospitalSimulation {
    /// Builds a simulation from a configuration, with exponentially distributed interarrival and
    /// diagnosis times and random patient profiles, all derived from the configured seed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn new(config: &HospitalConfig) -> Result<Self, Error> {
        config.validate()?;
        let seed = config.seed();
        Self::with_distributions(
            config,
            ChaCha8Rng::seed_from_u64(seed),
            Exponential::new("mean_interarrival_time", config.mean_interarrival_time)?,
            Exponential::new("mean_diagnosis_time", config.mean_diagnosis_time)?,
            Box::new(RandomProfiles::new(ChaCha8Rng::seed_from_u64(
                seed.wrapping_add(1),
            ))),
        )
    }

    /// Builds a simulation with custom random source, interarrival and diagnosis time
    /// distributions, and profiles. The means and the seed in `config` are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn with_distributions<R, I, D>(
        config: &HospitalConfig,
        rng: R,
        interarrival: I,
        diagnosis: D,
        profiles: Box<dyn ProfileProvider>,
    ) -> Result<Self, Error>
    where
        R: Rng + 'static,
        I: Distribution<f64> + 'static,
        D: Distribution<f64> + 'static,
    {
        config.validate()?;
        let mut sim = Simulation::default();
        let log = sim.insert(HospitalLog::new(sim.scheduler.clock()));
        let rng = sim.insert(rng);
        let waiting_room = sim.add_store::<Patient>();
        let doctors = sim.add_resource(config.doctor_capacity);

        let dispatcher =
            sim.add_component(Dispatcher::new(rng, diagnosis, waiting_room, doctors, log));
        let arrivals =
            sim.add_component(Arrivals::new(rng, interarrival, profiles, waiting_room, log));
        let monitor = sim.add_component(Monitor::new(
            config.monitor_interval(),
            waiting_room,
            doctors,
            log,
        ));
        sim.schedule(Duration::ZERO, dispatcher, DispatchEvent::Start);
        sim.schedule(Duration::ZERO, arrivals, ArrivalEvent::Start);
        sim.schedule(Duration::ZERO, monitor, MonitorEvent::Report);

        Ok(Self {
            sim,
            horizon: config.run_horizon(),
            log,
            waiting_room,
            doctors,
        })
    }

    /// Sends every history entry, as a JSON line, to `sender` as soon as it is recorded.
    #[must_use]
    pub fn history_sender(mut self, sender: Sender<String>) -> Self {
        self.log_mut().set_history_sender(sender);
        self
    }

    /// Current simulation time.
    #[must_use]
    pub fn time(&self) -> Duration {
        self.sim.time()
    }

    /// Time at which the run stops.
    #[must_use]
    pub fn horizon(&self) -> Duration {
        self.horizon
    }

    /// Hospital log.
    #[must_use]
    pub fn log(&self) -> &HospitalLog {
        self.sim
            .state
            .get(self.log)
            .expect("Hospital log not found in state")
    }

    fn log_mut(&mut self) -> &mut HospitalLog {
        self.sim
            .state
            .get_mut(self.log)
            .expect("Hospital log not found in state")
    }

    /// The pool of doctors.
    #[must_use]
    pub fn doctors(&self) -> &Resource {
        self.sim.state.resource(self.doctors)
    }

    /// Number of patients in the waiting room.
    #[must_use]
    pub fn waiting_room_len(&self) -> usize {
        self.sim.state.store_len(self.waiting_room)
    }

    /// Runs the simulation until the horizon or until no events are left.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Engine`] if the engine fails for any other reason than running out of
    /// events.
    pub fn run(&mut self) -> Result<RunReport, Error> {
        self.run_with(&ProgressBar::hidden())
    }

    /// Same as [`run`](Self::run) but displays a progress bar.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub fn run_with_progress(&mut self) -> Result<RunReport, Error> {
        let pb = ProgressBar::new(self.horizon.as_secs())
            .with_style(ProgressStyle::default_bar().template("{msg} {wide_bar} {percent}%"));
        self.run_with(&pb)
    }

    fn run_with(&mut self, pb: &ProgressBar) -> Result<RunReport, Error> {
        let termination = loop {
            match self.sim.step(self.horizon) {
                Ok(true) => {
                    let secs = self.time().as_secs();
                    if pb.position() < secs {
                        pb.set_position(secs);
                        pb.set_message(&format!(
                            "[{time}s] [W={waiting}] [B={busy}] [D={diagnosed}]",
                            time = secs,
                            waiting = self.waiting_room_len(),
                            busy = self.doctors().in_use(),
                            diagnosed = self.log().diagnosed(),
                        ));
                    }
                }
                Ok(false) => break Termination::HorizonReached,
                Err(desim::Error::QueueEmpty { now }) => {
                    log::warn!(
                        "No events left at {:?}, before reaching the horizon {:?}",
                        now,
                        self.horizon
                    );
                    break Termination::Exhausted;
                }
                Err(err) => return Err(err.into()),
            }
        };
        pb.finish();
        Ok(self.report(termination))
    }

    fn report(&self, termination: Termination) -> RunReport {
        let log = self.log();
        RunReport {
            time: self.time(),
            termination,
            generated: log.generated(),
            started: log.started(),
            diagnosed: log.diagnosed(),
            waiting: self.waiting_room_len(),
            busy_doctors: self.doctors().in_use(),
            mean_waiting_time: log.mean_waiting_time(),
            reports: log.reports().to_vec(),
        }
    }
}
