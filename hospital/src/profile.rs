use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Sex of a patient, as reported in their profile.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
pub enum Sex {
    /// Female.
    #[strum(serialize = "F")]
    #[serde(rename = "F")]
    Female,
    /// Male.
    #[strum(serialize = "M")]
    #[serde(rename = "M")]
    Male,
}

/// Demographic data of a patient. These values mean nothing to the simulation itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Full name.
    pub name: String,
    /// Postal address.
    pub address: String,
    /// Sex.
    pub sex: Sex,
    /// Date of birth.
    pub birthdate: NaiveDate,
}

/// Source of patient profiles, consulted once per arriving patient.
pub trait ProfileProvider {
    /// Returns the profile of a new patient.
    fn generate_profile(&mut self) -> Profile;
}

impl<F> ProfileProvider for F
where
    F: FnMut() -> Profile,
{
    fn generate_profile(&mut self) -> Profile {
        self()
    }
}

const FIRST_NAMES: &[(&str, Sex)] = &[
    ("Alice", Sex::Female),
    ("Barbara", Sex::Female),
    ("Carmen", Sex::Female),
    ("Diana", Sex::Female),
    ("Emily", Sex::Female),
    ("Hanna", Sex::Female),
    ("Maria", Sex::Female),
    ("Olivia", Sex::Female),
    ("Aaron", Sex::Male),
    ("Brian", Sex::Male),
    ("Daniel", Sex::Male),
    ("George", Sex::Male),
    ("Jacob", Sex::Male),
    ("Marek", Sex::Male),
    ("Peter", Sex::Male),
    ("Thomas", Sex::Male),
];

const LAST_NAMES: &[&str] = &[
    "Anderson", "Baker", "Carter", "Dvorak", "Evans", "Fischer", "Garcia", "Hughes", "Kowalski",
    "Lopez", "Miller", "Nowak", "Owens", "Parker", "Reyes", "Smith", "Turner", "Walker",
];

const STREETS: &[&str] = &[
    "Maple Street",
    "Oak Avenue",
    "Cedar Lane",
    "Hillside Road",
    "Park Drive",
    "River Street",
    "Station Road",
    "Willow Court",
];

const CITIES: &[(&str, &str)] = &[
    ("Springfield", "IL"),
    ("Riverton", "WY"),
    ("Fairview", "OR"),
    ("Georgetown", "TX"),
    ("Madison", "WI"),
    ("Salem", "MA"),
];

/// Generates plausible random profiles from built-in tables of names and places.
#[derive(Debug, Clone)]
pub struct RandomProfiles<R> {
    rng: R,
}

impl<R: Rng> RandomProfiles<R> {
    /// Constructs a generator drawing from `rng`.
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    fn pick<'a, T>(&mut self, values: &'a [T]) -> &'a T {
        values
            .choose(&mut self.rng)
            .expect("built-in tables are not empty")
    }
}

impl<R: Rng> ProfileProvider for RandomProfiles<R> {
    fn generate_profile(&mut self) -> Profile {
        let &(first_name, sex) = self.pick(FIRST_NAMES);
        let last_name = self.pick(LAST_NAMES);
        let street = self.pick(STREETS);
        let &(city, state) = self.pick(CITIES);
        let number = self.rng.gen_range(1..2000);
        let zip = self.rng.gen_range(10_000..100_000);
        let birthdate = NaiveDate::from_ymd_opt(
            self.rng.gen_range(1930..2020),
            self.rng.gen_range(1..=12),
            self.rng.gen_range(1..=28),
        )
        .expect("every month has at least 28 days");
        Profile {
            name: format!("{} {}", first_name, last_name),
            address: format!("{} {}\n{}, {} {}", number, street, city, state, zip),
            sex,
            birthdate,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_sex_codes() {
        assert_eq!(Sex::Female.to_string(), "F");
        assert_eq!("M".parse::<Sex>().unwrap(), Sex::Male);
        assert_eq!(serde_json::to_string(&Sex::Male).unwrap(), r#""M""#);
    }

    #[test]
    fn test_random_profiles_are_reproducible() {
        let mut first = RandomProfiles::new(ChaCha8Rng::seed_from_u64(7));
        let mut second = RandomProfiles::new(ChaCha8Rng::seed_from_u64(7));
        for _ in 0..20 {
            let profile = first.generate_profile();
            assert_eq!(profile, second.generate_profile());
            assert!(!profile.name.is_empty());
            assert!(profile.birthdate < NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
            let expected_sex = FIRST_NAMES
                .iter()
                .find(|(name, _)| profile.name.starts_with(name))
                .map(|&(_, sex)| sex);
            assert_eq!(expected_sex, Some(profile.sex));
        }
    }

    #[test]
    fn test_closure_provider() {
        let mut calls = 0;
        let mut provider = || {
            calls += 1;
            Profile {
                name: format!("Patient {}", calls),
                address: String::new(),
                sex: Sex::Female,
                birthdate: NaiveDate::from_ymd_opt(1990, 5, 17).unwrap(),
            }
        };
        assert_eq!(provider.generate_profile().name, "Patient 1");
        assert_eq!(provider.generate_profile().name, "Patient 2");
    }
}
