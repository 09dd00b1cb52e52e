//! Interactive reprogramming of the real-time clock.
//!
//! The operator types the date on a keyboard attached to the board while the
//! display echoes the input. This blocks until a valid date has been entered.

use chrono::{NaiveDate, NaiveDateTime};

use crate::clock::Clock;
use crate::display::{Screen, StatusDisplay};

/// A key press from the operator console.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Backspace,
    Enter,
}

impl Key {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x7f | 0x08 => Key::Backspace,
            b'\r' | b'\n' => Key::Enter,
            other => Key::Char(other as char),
        }
    }
}

/// Raw keystrokes typed by the operator.
pub trait OperatorInput {
    /// Blocks until the next key press.
    fn read_key(&mut self) -> anyhow::Result<Key>;

    /// Hands the console back once no more keys are needed.
    fn release(&mut self) {}
}

/// The line being typed by the operator.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LineEditor {
    buffer: String,
}

impl LineEditor {
    /// Applies `key`, returning the finished line on Enter.
    pub fn apply(&mut self, key: Key) -> Option<String> {
        match key {
            Key::Char(c) => {
                self.buffer.push(c);
                None
            }
            Key::Backspace => {
                self.buffer.pop();
                None
            }
            Key::Enter => Some(std::mem::take(&mut self.buffer)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }
}

/// Why an entered date was rejected.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum TimestampError {
    #[error("expected 6 fields separated by '/', got {0}")]
    FieldCount(usize),
    #[error("{0:?} is not a number")]
    NotANumber(String),
    #[error("{0} is not a valid date and time")]
    OutOfRange(String),
}

/// Parses `mm/dd/yyyy/hh/mm/ss` into a calendar date and time.
pub fn parse_timestamp(input: &str) -> Result<NaiveDateTime, TimestampError> {
    let fields = input
        .split('/')
        .map(|field| {
            let field = field.trim();
            field
                .parse::<u32>()
                .map_err(|_| TimestampError::NotANumber(field.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let [month, day, year, hour, minute, second] = fields[..] else {
        return Err(TimestampError::FieldCount(fields.len()));
    };

    i32::try_from(year)
        .ok()
        .and_then(|year| NaiveDate::from_ymd_opt(year, month, day))
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .ok_or_else(|| TimestampError::OutOfRange(input.trim().to_string()))
}

/// Reads one line of operator input, showing it on the display after every
/// key press.
pub fn capture_line(
    input: &mut dyn OperatorInput,
    display: &mut dyn StatusDisplay,
) -> anyhow::Result<String> {
    let mut editor = LineEditor::default();
    log::info!("Your current string:");

    loop {
        display.render(&Screen::DateEntry {
            input: editor.as_str(),
        })?;
        log::info!("{}", editor.as_str());

        if let Some(line) = editor.apply(input.read_key()?) {
            return Ok(line);
        }
    }
}

/// Discards key presses up to and including the next Enter.
pub fn wait_for_enter(input: &mut dyn OperatorInput) -> anyhow::Result<()> {
    while input.read_key()? != Key::Enter {}
    Ok(())
}

/// Asks the operator for the current date and time until the clock accepts
/// one, returning the value that was set.
pub fn reprogram_clock(
    clock: &mut dyn Clock,
    display: &mut dyn StatusDisplay,
    input: &mut dyn OperatorInput,
) -> anyhow::Result<NaiveDateTime> {
    let result = prompt_until_set(clock, display, input);
    input.release();
    result
}

fn prompt_until_set(
    clock: &mut dyn Clock,
    display: &mut dyn StatusDisplay,
    input: &mut dyn OperatorInput,
) -> anyhow::Result<NaiveDateTime> {
    display.render(&Screen::ClockLostPower)?;
    log::warn!("Power was lost to the RTC, press enter to reprogram it");
    wait_for_enter(input)?;

    loop {
        let line = capture_line(input, display)?;

        let result = parse_timestamp(&line)
            .map_err(anyhow::Error::from)
            .and_then(|datetime| clock.set(&datetime).map(|_| datetime));

        match result {
            Ok(datetime) => {
                log::info!("RTC set to {datetime}");
                return Ok(datetime);
            }
            Err(e) => {
                log::warn!("Input was invalid: {e:#}");
                display.render(&Screen::InvalidInput)?;
                log::info!("Press enter to start again");
                wait_for_enter(input)?;
            }
        }
    }
}
