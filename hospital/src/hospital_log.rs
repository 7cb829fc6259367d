use std::io;
use std::sync::mpsc::{Receiver, Sender};
use std::time::Duration;

use desim::ClockRef;
use serde::{Serialize, Serializer};

use crate::{Patient, PatientNumber};

/// Serializes simulation time as a real number of time units.
pub(crate) fn serialize_time<S: Serializer>(time: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(time.as_secs_f64())
}

/// Kind of a recorded simulation event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryKind {
    /// A patient entered the waiting room.
    Arrival {
        /// Arriving patient.
        patient: PatientNumber,
    },
    /// A doctor started diagnosing a patient.
    DiagnosisStarted {
        /// Diagnosed patient.
        patient: PatientNumber,
    },
    /// A doctor finished diagnosing a patient.
    DiagnosisFinished {
        /// Diagnosed patient.
        patient: PatientNumber,
    },
    /// The monitor reported the state of the hospital.
    Monitor,
}

/// A single entry of the simulation history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Entry {
    /// Time of the event.
    #[serde(serialize_with = "serialize_time")]
    pub time: Duration,
    /// What happened.
    #[serde(flatten)]
    pub kind: EntryKind,
}

/// A snapshot of the hospital taken by the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonitorReport {
    /// Time of the snapshot.
    #[serde(serialize_with = "serialize_time")]
    pub time: Duration,
    /// Number of patients in the waiting room.
    pub waiting: usize,
    /// Number of patients diagnosed so far.
    pub diagnosed: usize,
    /// Number of doctors currently diagnosing.
    pub busy_doctors: usize,
}

/// Counters and history of the hospital.
///
/// The log is the only place where the number of diagnosed patients is kept. It lives in the
/// simulation state, so processes modify it only while they run.
pub struct HospitalLog {
    clock: ClockRef,
    generated: usize,
    started: usize,
    diagnosed: usize,
    waiting_times: Vec<Duration>,
    history: Vec<Entry>,
    reports: Vec<MonitorReport>,
    history_sender: Option<Sender<String>>,
}

impl HospitalLog {
    /// Constructs an empty log. `clock` is the reference to the simulation clock.
    #[must_use]
    pub fn new(clock: ClockRef) -> Self {
        Self {
            clock,
            generated: 0,
            started: 0,
            diagnosed: 0,
            waiting_times: Vec::new(),
            history: Vec::new(),
            reports: Vec::new(),
            history_sender: None,
        }
    }

    /// Register a sender for flushing every history entry, as a JSON line, right away.
    pub(crate) fn set_history_sender(&mut self, sender: Sender<String>) {
        self.history_sender = Some(sender);
    }

    fn record(&mut self, kind: EntryKind) {
        let entry = Entry {
            time: self.clock.time(),
            kind,
        };
        if let Some(sender) = &self.history_sender {
            let line = serde_json::to_string(&entry).map(|json| json + "\n");
            match line {
                Ok(line) => {
                    if sender.send(line).is_err() {
                        log::warn!("History channel closed; no further entries will be written");
                        self.history_sender = None;
                    }
                }
                Err(err) => log::error!("Unable to serialize history entry: {}", err),
            }
        }
        self.history.push(entry);
    }

    /// Registers a patient who has just arrived.
    pub fn arrival(&mut self, patient: &Patient) {
        self.generated += 1;
        self.record(EntryKind::Arrival {
            patient: patient.number(),
        });
    }

    /// Registers the beginning of the diagnosis of `patient`.
    pub fn diagnosis_started(&mut self, patient: &Patient) {
        self.started += 1;
        let waited = self.clock.time().saturating_sub(patient.created_at());
        self.waiting_times.push(waited);
        self.record(EntryKind::DiagnosisStarted {
            patient: patient.number(),
        });
    }

    /// Registers the end of the diagnosis of `patient`, incrementing the diagnosed counter.
    ///
    /// # Panics
    ///
    /// Panics if more diagnoses finish than have started.
    pub fn diagnosis_finished(&mut self, patient: &Patient) {
        self.diagnosed += 1;
        assert!(
            self.diagnosed <= self.started,
            "Diagnosis of {} finished but never started",
            patient
        );
        self.record(EntryKind::DiagnosisFinished {
            patient: patient.number(),
        });
    }

    /// Stores a monitor report built from the waiting-room length, the diagnosed counter, and
    /// the number of busy doctors.
    pub fn report(&mut self, waiting: usize, busy_doctors: usize) -> MonitorReport {
        let report = MonitorReport {
            time: self.clock.time(),
            waiting,
            diagnosed: self.diagnosed,
            busy_doctors,
        };
        self.reports.push(report);
        self.record(EntryKind::Monitor);
        report
    }

    /// Number of patients that have arrived.
    #[must_use]
    pub fn generated(&self) -> usize {
        self.generated
    }

    /// Number of diagnoses that have started.
    #[must_use]
    pub fn started(&self) -> usize {
        self.started
    }

    /// Number of diagnosed patients.
    #[must_use]
    pub fn diagnosed(&self) -> usize {
        self.diagnosed
    }

    /// Number of patients being diagnosed right now.
    #[must_use]
    pub fn in_service(&self) -> usize {
        self.started - self.diagnosed
    }

    /// Time each patient spent in the waiting room, in the order the diagnoses started.
    #[must_use]
    pub fn waiting_times(&self) -> &[Duration] {
        &self.waiting_times
    }

    /// Mean time spent in the waiting room, in time units, or `None` if no diagnosis started.
    #[must_use]
    pub fn mean_waiting_time(&self) -> Option<f64> {
        if self.waiting_times.is_empty() {
            return None;
        }
        let total: f64 = self.waiting_times.iter().map(Duration::as_secs_f64).sum();
        #[allow(clippy::cast_precision_loss)]
        let count = self.waiting_times.len() as f64;
        Some(total / count)
    }

    /// All recorded events, in the order they happened.
    #[must_use]
    pub fn history(&self) -> &[Entry] {
        &self.history
    }

    /// All monitor reports, in the order they were made.
    #[must_use]
    pub fn reports(&self) -> &[MonitorReport] {
        &self.reports
    }
}

/// Writes messages sent to the receiver until the channel is closed or an error occurred.
pub fn write_from_channel<W, T>(mut writer: W, receiver: Receiver<T>) -> std::thread::JoinHandle<()>
where
    W: io::Write + Send + 'static,
    T: AsRef<[u8]> + Send + 'static,
{
    std::thread::spawn(move || {
        while let Ok(msg) = receiver.recv() {
            if writer.write_all(msg.as_ref()).is_err() {
                eprintln!("error writing to file");
                break;
            }
        }
        if writer.flush().is_err() {
            eprintln!("error writing to file");
        }
    })
}
