use chrono::{NaiveDateTime, NaiveTime, Timelike};

/// Number of seconds in one day.
pub const SECONDS_PER_DAY: u32 = 86_400;

/// Wall-clock time of day as read from the real-time clock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClockReading {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl ClockReading {
    pub fn new(hour: u8, minute: u8, second: u8) -> Self {
        Self {
            hour,
            minute,
            second,
        }
    }

    /// Seconds since midnight, in `0..86400`.
    pub fn seconds_since_midnight(&self) -> u32 {
        self.hour as u32 * 3600 + self.minute as u32 * 60 + self.second as u32
    }
}

impl From<NaiveTime> for ClockReading {
    fn from(time: NaiveTime) -> Self {
        Self {
            hour: time.hour() as u8,
            minute: time.minute() as u8,
            // Leap seconds are reported as second 59 + nanoseconds, never 60.
            second: time.second() as u8,
        }
    }
}

impl From<NaiveDateTime> for ClockReading {
    fn from(datetime: NaiveDateTime) -> Self {
        datetime.time().into()
    }
}

/// Seconds elapsed between `baseline` (seconds since midnight) and `reading`.
///
/// A reading earlier in the day than the baseline means the clock went past
/// midnight, so a full day is added to the difference.
pub fn elapsed(baseline: u32, reading: ClockReading) -> u32 {
    let delta = reading.seconds_since_midnight() as i64 - baseline as i64;

    if delta < 0 {
        (delta + SECONDS_PER_DAY as i64) as u32
    } else {
        delta as u32
    }
}

/// The real-time clock the logger keeps its timestamps with.
pub trait Clock {
    /// Current calendar date and time.
    fn now(&mut self) -> anyhow::Result<NaiveDateTime>;

    /// Reprograms the clock.
    fn set(&mut self, datetime: &NaiveDateTime) -> anyhow::Result<()>;

    /// Whether the clock stopped since it was last set, e.g. after its
    /// backup battery ran flat.
    fn lost_power(&mut self) -> anyhow::Result<bool>;
}

#[test]
fn test_seconds_since_midnight() {
    assert_eq!(ClockReading::new(0, 0, 0).seconds_since_midnight(), 0);
    assert_eq!(ClockReading::new(0, 1, 0).seconds_since_midnight(), 60);
    assert_eq!(ClockReading::new(12, 30, 15).seconds_since_midnight(), 45_015);
    assert_eq!(ClockReading::new(23, 59, 59).seconds_since_midnight(), 86_399);
}

#[test]
fn test_reading_from_datetime() {
    let datetime = chrono::NaiveDate::from_ymd_opt(2024, 3, 7)
        .and_then(|date| date.and_hms_opt(9, 5, 3))
        .unwrap();

    assert_eq!(ClockReading::from(datetime), ClockReading::new(9, 5, 3));
}

#[test]
fn test_elapsed_same_day_is_plain_difference() {
    for baseline in (0..SECONDS_PER_DAY).step_by(3_613) {
        for current in (baseline..SECONDS_PER_DAY).step_by(1_009) {
            let reading = ClockReading::new(
                (current / 3600) as u8,
                (current % 3600 / 60) as u8,
                (current % 60) as u8,
            );
            assert_eq!(elapsed(baseline, reading), current - baseline);
        }
    }
}

#[test]
fn test_elapsed_rolls_over_midnight() {
    // 23:59:55 -> 00:00:10
    assert_eq!(elapsed(86_395, ClockReading::new(0, 0, 10)), 15);
    // 23:59:00 -> 00:00:00
    assert_eq!(elapsed(86_340, ClockReading::new(0, 0, 0)), 60);
    // Almost a full day.
    assert_eq!(elapsed(1, ClockReading::new(0, 0, 0)), 86_399);
}

#[test]
fn test_elapsed_is_never_negative_or_a_full_day() {
    for baseline in (0..SECONDS_PER_DAY).step_by(2_711) {
        for current in (0..SECONDS_PER_DAY).step_by(1_777) {
            let reading = ClockReading::new(
                (current / 3600) as u8,
                (current % 3600 / 60) as u8,
                (current % 60) as u8,
            );
            let e = elapsed(baseline, reading);
            assert!(e < SECONDS_PER_DAY);
            assert_eq!((baseline + e) % SECONDS_PER_DAY, current);
        }
    }
}

#[test]
fn test_elapsed_reaches_threshold_after_one_minute() {
    assert_eq!(elapsed(0, ClockReading::new(0, 1, 0)), 60);
}
