//! Placeholder patients for imported rows.
//!
//! The import source carries no identity, so each row gets a synthesized
//! patient. Randomness is injected so tests can seed it.

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::config::DateWindow;
use crate::models::{NewPatient, Sex};

const FIRST_NAMES: &[&str] = &[
    "James", "John", "Robert", "Michael", "William", "David", "Richard", "Joseph", "Thomas", "Charles",
    "Mary", "Patricia", "Jennifer", "Linda", "Elizabeth", "Barbara", "Susan", "Jessica", "Sarah", "Karen",
    "Daniel", "Matthew", "Anthony", "Mark", "Donald", "Steven", "Paul", "Andrew", "Joshua", "Kenneth",
    "Nancy", "Betty", "Margaret", "Sandra", "Ashley", "Dorothy", "Kimberly", "Emily", "Donna", "Michelle",
];

const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez", "Martinez",
    "Hernandez", "Lopez", "Gonzalez", "Wilson", "Anderson", "Thomas", "Taylor", "Moore", "Jackson", "Martin",
    "Lee", "Perez", "Thompson", "White", "Harris", "Sanchez", "Clark", "Ramirez", "Lewis", "Robinson",
];

/// Draw a date uniformly from an inclusive window.
pub fn random_date<R: Rng + ?Sized>(rng: &mut R, window: &DateWindow) -> NaiveDate {
    let offset = rng.gen_range(0..=window.span_days());
    window.start() + Duration::days(offset)
}

/// Generates one placeholder patient per call, independent of row content.
pub struct PatientSynthesizer<R> {
    rng: R,
    birth_window: DateWindow,
}

impl PatientSynthesizer<StdRng> {
    /// Non-deterministic synthesizer for real imports.
    pub fn from_entropy(birth_window: DateWindow) -> Self {
        Self::new(StdRng::from_entropy(), birth_window)
    }

    pub fn seeded(seed: u64, birth_window: DateWindow) -> Self {
        Self::new(StdRng::seed_from_u64(seed), birth_window)
    }
}

impl<R: Rng> PatientSynthesizer<R> {
    pub fn new(rng: R, birth_window: DateWindow) -> Self {
        Self { rng, birth_window }
    }

    pub fn next_patient(&mut self) -> NewPatient {
        let first = FIRST_NAMES.choose(&mut self.rng).copied().unwrap_or("Anonymous");
        let last = LAST_NAMES.choose(&mut self.rng).copied().unwrap_or("Patient");
        let sex = if self.rng.gen_bool(0.5) { Sex::Male } else { Sex::Female };
        let birth_date = random_date(&mut self.rng, &self.birth_window);
        let phone = format!(
            "({:03}) {:03}-{:04}",
            self.rng.gen_range(100..1000),
            self.rng.gen_range(100..1000),
            self.rng.gen_range(0..10000),
        );

        NewPatient {
            name: format!("{first} {last}"),
            sex: Some(sex),
            birth_date: Some(birth_date),
            phone: Some(phone),
        }
    }
}
