use std::fmt;
use std::time::Duration;

use chrono::NaiveDate;
use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Profile, Sex};

/// Sequential number of a patient, in the order of arrival, starting from 1.
#[derive(
    From,
    Into,
    Debug,
    PartialEq,
    PartialOrd,
    Eq,
    Ord,
    Serialize,
    Deserialize,
    Copy,
    Clone,
    Hash,
    Display,
)]
pub struct PatientNumber(usize);

/// A patient who arrived at the hospital.
///
/// A patient is immutable. It waits in the waiting room, is then owned by the dispatcher for the
/// time of the diagnosis, and is discarded afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Patient {
    id: Uuid,
    number: PatientNumber,
    created_at: Duration,
    profile: Profile,
}

impl Patient {
    pub(crate) fn new(id: Uuid, number: PatientNumber, created_at: Duration, profile: Profile) -> Self {
        Self {
            id,
            number,
            created_at,
            profile,
        }
    }

    /// Unique identifier of the patient.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Arrival order of the patient.
    #[must_use]
    pub fn number(&self) -> PatientNumber {
        self.number
    }

    /// The time of the simulation when the patient arrived.
    #[must_use]
    pub fn created_at(&self) -> Duration {
        self.created_at
    }

    /// Demographic data.
    #[must_use]
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Full name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.profile.name
    }

    /// Postal address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.profile.address
    }

    /// Sex.
    #[must_use]
    pub fn sex(&self) -> Sex {
        self.profile.sex
    }

    /// Date of birth.
    #[must_use]
    pub fn birthdate(&self) -> NaiveDate {
        self.profile.birthdate
    }
}

impl fmt::Display for Patient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Patient #{} ({})", self.number, self.profile.name)
    }
}
