use std::time::Duration;

use float_cmp::approx_eq;
use hospital::{
    EntryKind, HospitalConfig, HospitalSimulation, PatientNumber, ProfileProvider, RandomProfiles,
    Termination,
};
use quickcheck_macros::quickcheck;
use rand::rngs::mock::StepRng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rstest::{fixture, rstest};
use testing::{ConstantDistribution, SequenceDistribution};

fn profiles() -> Box<dyn ProfileProvider> {
    Box::new(RandomProfiles::new(ChaCha8Rng::seed_from_u64(0)))
}

fn patient_events(sim: &HospitalSimulation) -> Vec<(u64, EntryKind)> {
    sim.log()
        .history()
        .iter()
        .filter(|entry| entry.kind != EntryKind::Monitor)
        .map(|entry| (entry.time.as_secs(), entry.kind))
        .collect()
}

#[fixture]
fn single_patient() -> HospitalSimulation {
    let config = HospitalConfig {
        doctor_capacity: 1,
        mean_diagnosis_time: 10.0,
        mean_interarrival_time: 1000.0,
        run_horizon: 100.0,
        ..HospitalConfig::default()
    };
    HospitalSimulation::with_distributions(
        &config,
        StepRng::new(0, 1),
        SequenceDistribution::new(vec![5.0, 1000.0]),
        ConstantDistribution::new(10.0),
        profiles(),
    )
    .unwrap()
}

#[rstest]
fn test_single_patient_is_diagnosed(mut single_patient: HospitalSimulation) {
    let report = single_patient.run().unwrap();
    assert_eq!(report.termination, Termination::HorizonReached);
    assert_eq!(report.time, Duration::from_secs(100));
    assert_eq!(report.generated, 1);
    assert_eq!(report.started, 1);
    assert_eq!(report.diagnosed, 1);
    assert_eq!(report.waiting, 0);
    assert_eq!(report.busy_doctors, 0);
    assert!(approx_eq!(f64, report.mean_waiting_time.unwrap(), 0.0));
    assert_eq!(single_patient.waiting_room_len(), 0);

    let patient = PatientNumber::from(1);
    assert_eq!(
        patient_events(&single_patient),
        vec![
            (5, EntryKind::Arrival { patient }),
            (5, EntryKind::DiagnosisStarted { patient }),
            (15, EntryKind::DiagnosisFinished { patient }),
        ]
    );
    assert_eq!(single_patient.doctors().total_grants(), 1);
    assert_eq!(single_patient.doctors().in_use(), 0);
}

#[test]
fn test_saturated_doctor() {
    let config = HospitalConfig {
        doctor_capacity: 1,
        mean_diagnosis_time: 100.0,
        mean_interarrival_time: 1.0,
        run_horizon: 50.0,
        ..HospitalConfig::default()
    };
    let mut sim = HospitalSimulation::with_distributions(
        &config,
        StepRng::new(0, 1),
        ConstantDistribution::new(1.0),
        ConstantDistribution::new(100.0),
        profiles(),
    )
    .unwrap();
    let report = sim.run().unwrap();
    assert_eq!(report.generated, 49);
    assert_eq!(report.diagnosed, 0);
    assert_eq!(report.busy_doctors, 1);
    assert_eq!(report.waiting, 48);

    // Reports at the same instant as an arrival are made before the arrival.
    let waiting: Vec<_> = report.reports.iter().map(|r| r.waiting).collect();
    assert_eq!(waiting, vec![0, 3, 8, 13, 18, 23, 28, 33, 38, 43]);
}

#[test]
fn test_idle_doctors_do_not_start_another_diagnosis() {
    let config = HospitalConfig {
        doctor_capacity: 2,
        run_horizon: 12.0,
        ..HospitalConfig::default()
    };
    let mut sim = HospitalSimulation::with_distributions(
        &config,
        StepRng::new(0, 1),
        SequenceDistribution::new(vec![1.0, 1.0, 1.0, 1000.0]),
        ConstantDistribution::new(10.0),
        profiles(),
    )
    .unwrap();
    let report = sim.run().unwrap();
    let starts: Vec<_> = sim
        .log()
        .history()
        .iter()
        .filter(|entry| matches!(entry.kind, EntryKind::DiagnosisStarted { .. }))
        .map(|entry| entry.time)
        .collect();
    assert_eq!(starts, vec![Duration::from_secs(1), Duration::from_secs(11)]);
    assert_eq!(report.generated, 3);
    assert_eq!(report.started, 2);
    assert_eq!(report.diagnosed, 1);
    assert_eq!(report.busy_doctors, 1);
    assert_eq!(report.waiting, 1);
    assert_eq!(sim.waiting_room_len(), 1);
    assert!(approx_eq!(f64, report.mean_waiting_time.unwrap(), 4.5));

    let waiting: Vec<_> = report.reports.iter().map(|r| (r.time.as_secs(), r.waiting)).collect();
    assert_eq!(waiting, vec![(0, 0), (5, 2), (10, 2)]);
    assert!(report.reports.iter().all(|r| r.busy_doctors <= 1));
}

#[test]
fn test_saturated_doctor_with_random_times() {
    let config = HospitalConfig {
        doctor_capacity: 1,
        mean_diagnosis_time: 100.0,
        mean_interarrival_time: 1.0,
        run_horizon: 50.0,
        seed: Some(2),
        ..HospitalConfig::default()
    };
    let mut sim = HospitalSimulation::new(&config).unwrap();
    let report = sim.run().unwrap();
    assert!(report.waiting > 20);
    assert!(report.waiting > report.diagnosed);
    assert_eq!(report.busy_doctors, 1);
}

#[test]
fn test_monitor_reports_from_time_zero() {
    let config = HospitalConfig {
        monitor_interval: 5.0,
        run_horizon: 20.0,
        ..HospitalConfig::default()
    };
    let mut sim = HospitalSimulation::new(&config).unwrap();
    let report = sim.run().unwrap();
    let times: Vec<_> = report.reports.iter().map(|r| r.time).collect();
    assert_eq!(
        times,
        vec![
            Duration::ZERO,
            Duration::from_secs(5),
            Duration::from_secs(10),
            Duration::from_secs(15),
        ]
    );
    assert_eq!(report.reports[0].waiting, 0);
    assert_eq!(report.reports[0].diagnosed, 0);
}

#[test]
fn test_no_arrivals() {
    let config = HospitalConfig {
        mean_interarrival_time: f64::INFINITY,
        ..HospitalConfig::default()
    };
    let mut sim = HospitalSimulation::new(&config).unwrap();
    let report = sim.run().unwrap();
    assert_eq!(report.termination, Termination::HorizonReached);
    assert_eq!(report.generated, 0);
    assert_eq!(report.diagnosed, 0);
    assert_eq!(report.mean_waiting_time, None);
    assert_eq!(sim.doctors().total_grants(), 0);
    assert!(report.reports.iter().all(|r| r.diagnosed == 0));
}

#[test]
fn test_history_is_sent_as_json_lines() {
    let config = HospitalConfig {
        run_horizon: 200.0,
        ..HospitalConfig::default()
    };
    let (sender, receiver) = std::sync::mpsc::channel();
    let mut sim = HospitalSimulation::new(&config)
        .unwrap()
        .history_sender(sender);
    sim.run().unwrap();
    let history_len = sim.log().history().len();
    drop(sim);
    let lines: Vec<String> = receiver.iter().collect();
    assert_eq!(lines.len(), history_len);
    for line in lines {
        let value: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
        assert!(value["time"].is_f64());
        assert!(value["kind"].is_string());
    }
}

fn config(seed: u64, doctors: u8) -> HospitalConfig {
    HospitalConfig {
        doctor_capacity: usize::from(doctors % 4) + 1,
        mean_diagnosis_time: 20.0,
        mean_interarrival_time: 8.0,
        run_horizon: 300.0,
        seed: Some(seed),
        ..HospitalConfig::default()
    }
}

#[quickcheck]
fn prop_runs_are_deterministic(seed: u64, doctors: u8) -> bool {
    let config = config(seed, doctors);
    let mut first = HospitalSimulation::new(&config).unwrap();
    let mut second = HospitalSimulation::new(&config).unwrap();
    first.run().unwrap() == second.run().unwrap()
        && first.log().history() == second.log().history()
}

#[quickcheck]
fn prop_diagnoses_start_in_arrival_order(seed: u64, doctors: u8) -> bool {
    let mut sim = HospitalSimulation::new(&config(seed, doctors)).unwrap();
    sim.run().unwrap();
    let started: Vec<usize> = sim
        .log()
        .history()
        .iter()
        .filter_map(|entry| match entry.kind {
            EntryKind::DiagnosisStarted { patient } => Some(usize::from(patient)),
            _ => None,
        })
        .collect();
    started.iter().enumerate().all(|(idx, &patient)| patient == idx + 1)
}

#[quickcheck]
fn prop_doctors_and_patients_are_accounted_for(seed: u64, doctors: u8) -> bool {
    let config = config(seed, doctors);
    let mut sim = HospitalSimulation::new(&config).unwrap();
    let report = sim.run().unwrap();
    let bounded = report.reports.iter().all(|r| r.busy_doctors <= 1);
    let conserved = report
        .reports
        .iter()
        .all(|r| r.diagnosed + r.waiting <= report.generated);
    let mut arrived = 0;
    let mut finished = 0;
    let mut in_service = 0;
    let history_consistent = sim.log().history().iter().all(|entry| {
        match entry.kind {
            EntryKind::Arrival { .. } => arrived += 1,
            EntryKind::DiagnosisStarted { .. } => in_service += 1,
            EntryKind::DiagnosisFinished { .. } => {
                in_service -= 1;
                finished += 1;
            }
            EntryKind::Monitor => {}
        }
        in_service <= 1 && finished + in_service <= arrived
    });
    bounded
        && conserved
        && history_consistent
        && report.generated == report.diagnosed + report.busy_doctors + report.waiting
}
