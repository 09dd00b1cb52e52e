use std::path::{Path, PathBuf};

use crate::clock::{elapsed, Clock, ClockReading};
use crate::display::{Screen, StatusDisplay};
use crate::sensor::Barometer;
use crate::storage::{CsvLog, LogRow};

/// Where the logger is in its run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    AwaitingUsb,
    AwaitingStart,
    Recording,
    Finished,
}

/// The physical button that ends a recording.
pub trait StopButton {
    fn is_pressed(&mut self) -> anyhow::Result<bool>;
}

/// The devices a recording reads from and reports to.
pub struct Instruments<'a> {
    pub clock: &'a mut dyn Clock,
    pub barometers: [&'a mut dyn Barometer; 2],
    pub display: &'a mut dyn StatusDisplay,
    pub stop_button: &'a mut dyn StopButton,
}

/// How a recording ended.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordOutcome {
    /// The stop button was pressed.
    Stopped { rows: u32, path: PathBuf },
    /// A device or the drive failed. Rows written before the failure are kept.
    Fault { rows: u32, description: String },
}

impl RecordOutcome {
    pub fn rows(&self) -> u32 {
        match self {
            RecordOutcome::Stopped { rows, .. } | RecordOutcome::Fault { rows, .. } => *rows,
        }
    }
}

/// Logs a row into a new CSV file in `directory` every `interval` seconds
/// until the stop button is pressed.
///
/// Any failure ends the recording on the spot.
pub fn record(
    instruments: &mut Instruments<'_>,
    directory: &Path,
    interval: u32,
) -> RecordOutcome {
    let mut rows = 0;

    match run(instruments, directory, interval, &mut rows) {
        Ok(path) => {
            log::info!("Data collection complete, {rows} rows in {}", path.display());
            RecordOutcome::Stopped { rows, path }
        }
        Err(e) => {
            let description = format!("{e:#}");
            log::error!("Recording aborted after {rows} rows: {description}");

            if let Err(e) = instruments.display.render(&Screen::Fault) {
                log::warn!("Unable to show the fault on the display: {e:#}");
            }

            RecordOutcome::Fault { rows, description }
        }
    }
}

fn run(
    instruments: &mut Instruments<'_>,
    directory: &Path,
    interval: u32,
    rows: &mut u32,
) -> anyhow::Result<PathBuf> {
    log::info!("Starting data collection");

    let started = instruments.clock.now()?;
    let log = CsvLog::create(directory, &started)?;
    let mut baseline = ClockReading::from(started).seconds_since_midnight();

    instruments.display.render(&Screen::Recording { count: 0 })?;

    loop {
        let now = instruments.clock.now()?;

        if elapsed(baseline, now.into()) >= interval {
            let [first, second] = &mut instruments.barometers;
            let row = LogRow {
                timestamp: now,
                samples: [first.sample()?, second.sample()?],
            };
            log.append(&row)?;
            *rows += 1;

            instruments
                .display
                .render(&Screen::Recording { count: *rows })?;

            for (index, sample) in row.samples.iter().enumerate() {
                log::info!(
                    "Sensor {}: pressure {} hPa, temperature {} °C, altitude {} m",
                    index + 1,
                    sample.pressure,
                    sample.temperature,
                    sample.altitude
                );
            }

            baseline = ClockReading::from(now).seconds_since_midnight();
        }

        if instruments.stop_button.is_pressed()? {
            break;
        }
    }

    instruments.display.render(&Screen::Finished)?;

    Ok(log.path().to_path_buf())
}
