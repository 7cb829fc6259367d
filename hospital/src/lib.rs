//! Hospital simulation.
//!
//! Patients arrive at random intervals and wait in an unbounded waiting room. A single dispatcher
//! matches them, in the order of arrival, with a limited pool of doctors, and each diagnosis takes
//! a random amount of time. A monitor periodically reports how many patients are waiting and how
//! many have been diagnosed. Everything runs on the [`desim`] engine.

#![warn(
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::default_trait_access)]

mod arrival;
pub use arrival::{Arrivals, Event as ArrivalEvent};

mod dispatch;
pub use dispatch::{Dispatcher, Event as DispatchEvent};

mod monitor;
pub use monitor::{Event as MonitorEvent, Monitor};

mod config;
pub use config::{ConfigError, HospitalConfig, DEFAULT_SEED};

mod hospital_log;
pub use hospital_log::{write_from_channel, Entry, EntryKind, HospitalLog, MonitorReport};

mod patient;
pub use patient::{Patient, PatientNumber};

mod profile;
pub use profile::{Profile, ProfileProvider, RandomProfiles, Sex};

mod simulation;
pub use simulation::{Exponential, HospitalSimulation, RunReport, Termination};

/// Errors of the hospital simulation.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The configuration was rejected before the simulation started.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The engine failed during the run.
    #[error("simulation failed: {0}")]
    Engine(#[from] desim::Error),
}
