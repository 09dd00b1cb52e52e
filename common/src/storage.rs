use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::sensor::SensorSample;

/// Column names, written once at the top of every log file.
pub const HEADER: [&str; 6] = [
    "Date",
    "Time",
    "Pressure 1",
    "Temperature 1",
    "Pressure 2",
    "Temperature 2",
];

const DELIMITER: &str = ",";
const LINE_TERMINATOR: &str = "\r\n";

/// One line of the log: when it was taken and what both sensors read.
#[derive(Clone, Debug, PartialEq)]
pub struct LogRow {
    pub timestamp: NaiveDateTime,
    pub samples: [SensorSample; 2],
}

impl LogRow {
    /// Date as `M-D-Y`, without zero padding.
    pub fn date(&self) -> String {
        format!(
            "{}-{}-{}",
            self.timestamp.month(),
            self.timestamp.day(),
            self.timestamp.year()
        )
    }

    /// Time as `H:M.S`, without zero padding.
    pub fn time(&self) -> String {
        format!(
            "{}:{}.{}",
            self.timestamp.hour(),
            self.timestamp.minute(),
            self.timestamp.second()
        )
    }

    fn to_line(&self) -> String {
        let [first, second] = &self.samples;
        // `{:?}` keeps the `.0` of whole numbers so every column reads as a float.
        let fields = [
            self.date(),
            self.time(),
            format!("{:?}", first.pressure),
            format!("{:?}", first.temperature),
            format!("{:?}", second.pressure),
            format!("{:?}", second.temperature),
        ];
        fields.join(DELIMITER) + LINE_TERMINATOR
    }
}

/// Name of the log file for a recording started at `started`,
/// e.g. `3-7-2024_9_5.csv`.
pub fn log_file_name(started: &NaiveDateTime) -> String {
    format!(
        "{}-{}-{}_{}_{}.csv",
        started.month(),
        started.day(),
        started.year(),
        started.hour(),
        started.minute()
    )
}

/// An append-only CSV file.
///
/// The file is reopened for every row so that each completed row reaches the
/// drive on its own, even if the drive is pulled later.
#[derive(Debug)]
pub struct CsvLog {
    path: PathBuf,
}

impl CsvLog {
    /// Creates the log file for a recording started at `started` inside
    /// `directory` and writes the header. An existing file of the same name
    /// is truncated.
    pub fn create(directory: &Path, started: &NaiveDateTime) -> anyhow::Result<Self> {
        let path = directory.join(log_file_name(started));

        let mut file = File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        file.write_all((HEADER.join(DELIMITER) + LINE_TERMINATOR).as_bytes())
            .with_context(|| format!("Failed to write header to {}", path.display()))?;
        file.flush()?;

        log::debug!("Created log file {}", path.display());

        Ok(Self { path })
    }

    /// Appends `row` and closes the file again.
    pub fn append(&self, row: &LogRow) -> anyhow::Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        file.write_all(row.to_line().as_bytes())
            .with_context(|| format!("Failed to append to {}", self.path.display()))?;
        file.flush()?;

        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
