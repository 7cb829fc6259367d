use std::time::Duration;

use desim::duration_from_units;
use serde::{Deserialize, Serialize};

/// Seed used when none is configured.
pub const DEFAULT_SEED: u64 = 17;

/// Invalid parameters supplied at startup.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A parameter has a value outside of its valid range.
    #[error("invalid configuration: `{parameter}` must be {expected}, but is {value}")]
    InvalidConfiguration {
        /// Name of the parameter.
        parameter: &'static str,
        /// Description of the valid values.
        expected: &'static str,
        /// The rejected value.
        value: String,
    },
}

/// Configuration of a hospital simulation. All times are expressed in time units,
/// one time unit corresponding to one second of simulation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HospitalConfig {
    /// Number of doctors diagnosing patients at the same time.
    pub doctor_capacity: usize,
    /// Mean of the exponentially distributed diagnosis time.
    pub mean_diagnosis_time: f64,
    /// Mean of the exponentially distributed time between two consecutive arrivals.
    pub mean_interarrival_time: f64,
    /// Time between two consecutive monitor reports.
    pub monitor_interval: f64,
    /// Time at which the simulation stops.
    pub run_horizon: f64,
    /// Seed of the random number generator.
    pub seed: Option<u64>,
}

impl Default for HospitalConfig {
    fn default() -> Self {
        Self {
            doctor_capacity: 2,
            mean_diagnosis_time: 50.0,
            mean_interarrival_time: 30.0,
            monitor_interval: 5.0,
            run_horizon: 1000.0,
            seed: None,
        }
    }
}

fn check_mean(parameter: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidConfiguration {
            parameter,
            expected: "positive",
            value: value.to_string(),
        })
    }
}

fn check_interval(parameter: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && duration_from_units(value) > Duration::ZERO {
        Ok(())
    } else {
        Err(ConfigError::InvalidConfiguration {
            parameter,
            expected: "positive and finite",
            value: value.to_string(),
        })
    }
}

impl HospitalConfig {
    /// Checks that all parameters are within their valid ranges.
    ///
    /// Means may be infinite, in which case the corresponding event never happens.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidConfiguration`] for the first invalid parameter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.doctor_capacity == 0 {
            return Err(ConfigError::InvalidConfiguration {
                parameter: "doctor_capacity",
                expected: "positive",
                value: self.doctor_capacity.to_string(),
            });
        }
        check_mean("mean_diagnosis_time", self.mean_diagnosis_time)?;
        check_mean("mean_interarrival_time", self.mean_interarrival_time)?;
        check_interval("monitor_interval", self.monitor_interval)?;
        check_interval("run_horizon", self.run_horizon)?;
        Ok(())
    }

    /// The seed of the random number generator, or [`DEFAULT_SEED`] if not set.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed.unwrap_or(DEFAULT_SEED)
    }

    /// Monitor interval as simulation time.
    #[must_use]
    pub fn monitor_interval(&self) -> Duration {
        duration_from_units(self.monitor_interval)
    }

    /// Run horizon as simulation time.
    #[must_use]
    pub fn run_horizon(&self) -> Duration {
        duration_from_units(self.run_horizon)
    }
}
