//! Hospital simulation application.
#![warn(
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::default_trait_access)]

use std::fs::File;
use std::io;
use std::path::PathBuf;

use clap::Parser;
use eyre::WrapErr;

use hospital::{write_from_channel, HospitalConfig, HospitalSimulation};

/// Runs a simulation of patients diagnosed by a limited number of doctors.
///
/// Parameters are read from the configuration file, if given, and then overridden by the
/// command line options. Missing parameters take their default values.
#[derive(Parser)]
#[clap(version)]
struct Opt {
    /// Path to a JSON file with the simulation configuration.
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Number of doctors.
    #[clap(long)]
    doctors: Option<usize>,

    /// Mean diagnosis time.
    #[clap(long)]
    diagnosis_time: Option<f64>,

    /// Mean time between two consecutive arrivals.
    #[clap(long)]
    interarrival_time: Option<f64>,

    /// Time between two consecutive monitor reports.
    #[clap(long)]
    monitor_interval: Option<f64>,

    /// Time at which the simulation stops.
    #[clap(long)]
    horizon: Option<f64>,

    /// Seed of the random number generator.
    #[clap(long)]
    seed: Option<u64>,

    /// Verbosity.
    #[clap(short, long, parse(from_occurrences))]
    verbose: i32,

    /// Store the logs this file.
    #[clap(long)]
    log_output: Option<PathBuf>,

    /// Do not log to the stderr.
    #[clap(long)]
    no_stderr: bool,

    /// Write the history of the simulation to this file, one JSON object per line.
    #[clap(long)]
    history_output: Option<PathBuf>,

    /// Display a progress bar.
    #[clap(long)]
    progress: bool,
}

impl Opt {
    /// Builds the configuration from the file and the overriding options.
    fn config(&self) -> eyre::Result<HospitalConfig> {
        let mut config = if let Some(path) = &self.config {
            let file = File::open(path)
                .wrap_err_with(|| format!("unable to open config file: {}", path.display()))?;
            serde_json::from_reader(io::BufReader::new(file))
                .wrap_err_with(|| format!("unable to parse config file: {}", path.display()))?
        } else {
            HospitalConfig::default()
        };
        if let Some(doctors) = self.doctors {
            config.doctor_capacity = doctors;
        }
        if let Some(time) = self.diagnosis_time {
            config.mean_diagnosis_time = time;
        }
        if let Some(time) = self.interarrival_time {
            config.mean_interarrival_time = time;
        }
        if let Some(interval) = self.monitor_interval {
            config.monitor_interval = interval;
        }
        if let Some(horizon) = self.horizon {
            config.run_horizon = horizon;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        config.validate()?;
        Ok(config)
    }

    /// Runs the simulation and prints the final report to the standard output.
    fn run(&self) -> eyre::Result<()> {
        let config = self.config()?;
        log::info!("Starting simulation: {:?}", config);
        let mut sim = HospitalSimulation::new(&config)?;
        let writer = if let Some(path) = &self.history_output {
            let (sender, receiver) = std::sync::mpsc::channel();
            let file = File::create(path)
                .wrap_err_with(|| format!("unable to create history file: {}", path.display()))?;
            let writer = write_from_channel(io::BufWriter::new(file), receiver);
            sim = sim.history_sender(sender);
            Some(writer)
        } else {
            None
        };
        let report = if self.progress {
            sim.run_with_progress()?
        } else {
            sim.run()?
        };
        // Dropping the simulation closes the history channel.
        drop(sim);
        if let Some(writer) = writer {
            writer
                .join()
                .map_err(|_| eyre::eyre!("history writer thread panicked"))?;
        }
        log::info!(
            "Finished at {:.2} ({}): {} diagnosed out of {} patients",
            report.time.as_secs_f64(),
            report.termination,
            report.diagnosed,
            report.generated
        );
        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(())
    }
}

/// Set up a logger based on the given user options.
fn set_up_logger(opt: &Opt) -> Result<(), fern::InitError> {
    let log_level = match opt.verbose {
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        3 => log::LevelFilter::Trace,
        _ => log::LevelFilter::Warn,
    };
    let dispatch = fern::Dispatch::new()
        .format(|out, message, record| out.finish(format_args!("[{}] {}", record.level(), message)))
        .level(log_level);
    let dispatch = if let Some(path) = &opt.log_output {
        dispatch.chain(
            std::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)?,
        )
    } else {
        dispatch
    };
    let dispatch = if opt.no_stderr {
        dispatch
    } else {
        dispatch.chain(std::io::stderr())
    };
    dispatch.apply()?;
    Ok(())
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let opt = Opt::parse();
    set_up_logger(&opt)?;
    opt.run()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_overrides() {
        let opt = Opt::parse_from([
            "hospital-sim",
            "--doctors",
            "3",
            "--horizon",
            "20",
            "--seed",
            "11",
            "-vv",
        ]);
        assert_eq!(opt.verbose, 2);
        let config = opt.config().unwrap();
        assert_eq!(
            config,
            HospitalConfig {
                doctor_capacity: 3,
                run_horizon: 20.0,
                seed: Some(11),
                ..HospitalConfig::default()
            }
        );
    }

    #[test]
    fn test_invalid_override() {
        let opt = Opt::parse_from(["hospital-sim", "--doctors", "0"]);
        assert!(opt.config().is_err());
    }

    #[test]
    fn test_missing_config_file() {
        let opt = Opt::parse_from(["hospital-sim", "--config", "/nonexistent/hospital.json"]);
        let err = opt.config().unwrap_err();
        assert!(err.to_string().contains("unable to open config file"));
    }
}
