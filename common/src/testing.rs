//! In-memory stand-ins for the logger hardware.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate, NaiveDateTime};

use crate::clock::Clock;
use crate::display::StatusDisplay;
use crate::recorder::StopButton;
use crate::reprogram::{Key, OperatorInput};
use crate::sensor::{Barometer, SensorSample};
use crate::usb::{DriveMounter, UsbDetector};

/// 7 March 2024 at the given time.
pub fn at(hour: u32, minute: u32, second: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 7)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .unwrap()
}

/// A fresh, empty directory for one test.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("usb-logger-{}-{name}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Replays clock readings, then keeps repeating the last one.
pub struct FakeClock {
    readings: VecDeque<NaiveDateTime>,
    last: NaiveDateTime,
    pub lost_power: bool,
    pub reject_years_before: Option<i32>,
    pub set_calls: Vec<NaiveDateTime>,
}

impl FakeClock {
    pub fn new(readings: Vec<NaiveDateTime>) -> Self {
        let last = readings.first().copied().unwrap_or_else(|| at(0, 0, 0));
        Self {
            readings: readings.into(),
            last,
            lost_power: false,
            reject_years_before: None,
            set_calls: Vec::new(),
        }
    }
}

impl Clock for FakeClock {
    fn now(&mut self) -> anyhow::Result<NaiveDateTime> {
        if let Some(reading) = self.readings.pop_front() {
            self.last = reading;
        }
        Ok(self.last)
    }

    fn set(&mut self, datetime: &NaiveDateTime) -> anyhow::Result<()> {
        if let Some(year) = self.reject_years_before {
            anyhow::ensure!(datetime.year() >= year, "year {} out of range", datetime.year());
        }
        self.set_calls.push(*datetime);
        self.last = *datetime;
        self.lost_power = false;
        Ok(())
    }

    fn lost_power(&mut self) -> anyhow::Result<bool> {
        Ok(self.lost_power)
    }
}

/// Always reads the same sample, optionally failing on the n-th read.
pub struct FakeBarometer {
    sample: SensorSample,
    pub reads: usize,
    pub fail_on_read: Option<usize>,
}

impl FakeBarometer {
    pub fn new(pressure: f32, temperature: f32) -> Self {
        Self {
            sample: SensorSample {
                pressure,
                temperature,
                altitude: 100.0,
            },
            reads: 0,
            fail_on_read: None,
        }
    }
}

impl Barometer for FakeBarometer {
    fn sample(&mut self) -> anyhow::Result<SensorSample> {
        self.reads += 1;
        if self.fail_on_read == Some(self.reads) {
            anyhow::bail!("sensor unplugged");
        }
        Ok(self.sample)
    }
}

/// Reads as pressed from the n-th poll on.
pub struct FakeButton {
    press_on_poll: usize,
    pub polls: usize,
}

impl FakeButton {
    pub fn pressed_on_poll(press_on_poll: usize) -> Self {
        Self {
            press_on_poll,
            polls: 0,
        }
    }
}

impl StopButton for FakeButton {
    fn is_pressed(&mut self) -> anyhow::Result<bool> {
        self.polls += 1;
        Ok(self.polls >= self.press_on_poll)
    }
}

/// Remembers what was drawn and every frame that was shown.
#[derive(Default)]
pub struct MemoryDisplay {
    pub drawn: Vec<(String, i32, i32)>,
    pub shown: Vec<Vec<String>>,
}

impl MemoryDisplay {
    /// Lines of the frame currently on screen.
    pub fn current(&self) -> Vec<String> {
        self.shown.last().cloned().unwrap_or_default()
    }
}

impl StatusDisplay for MemoryDisplay {
    fn clear(&mut self) -> anyhow::Result<()> {
        self.drawn.clear();
        Ok(())
    }

    fn text(&mut self, text: &str, x: i32, y: i32) -> anyhow::Result<()> {
        self.drawn.push((text.to_string(), x, y));
        Ok(())
    }

    fn show(&mut self) -> anyhow::Result<()> {
        self.shown
            .push(self.drawn.iter().map(|(text, _, _)| text.clone()).collect());
        Ok(())
    }
}

/// Types a fixed sequence of keys, then reports a closed console.
pub struct ScriptedInput {
    keys: VecDeque<Key>,
    pub released: usize,
}

impl ScriptedInput {
    pub fn typing(keys: &str) -> Self {
        Self {
            keys: keys.bytes().map(Key::from_byte).collect(),
            released: 0,
        }
    }
}

impl OperatorInput for ScriptedInput {
    fn read_key(&mut self) -> anyhow::Result<Key> {
        self.keys
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("operator console closed"))
    }

    fn release(&mut self) {
        self.released += 1;
    }
}

/// Finds nothing for a number of calls, then a fixed device.
pub struct FakeDetector {
    misses: usize,
    device: PathBuf,
    pub calls: usize,
    pub vendor_ids: Vec<String>,
}

impl FakeDetector {
    pub fn found_after(misses: usize, device: &str) -> Self {
        Self {
            misses,
            device: PathBuf::from(device),
            calls: 0,
            vendor_ids: Vec::new(),
        }
    }
}

impl UsbDetector for FakeDetector {
    fn find(&mut self, vendor_id: &str) -> anyhow::Result<Option<PathBuf>> {
        self.calls += 1;
        self.vendor_ids.push(vendor_id.to_string());
        Ok((self.calls > self.misses).then(|| self.device.clone()))
    }
}

/// Records mounts and unmounts, optionally failing either.
#[derive(Default)]
pub struct FakeDrive {
    pub mounted: Vec<(PathBuf, PathBuf)>,
    pub unmounted: Vec<PathBuf>,
    pub fail_mount: bool,
    pub fail_unmount: bool,
}

impl DriveMounter for FakeDrive {
    fn mount(&mut self, device: &Path, mount_dir: &Path) -> anyhow::Result<()> {
        anyhow::ensure!(!self.fail_mount, "mount of {} failed", device.display());
        self.mounted
            .push((device.to_path_buf(), mount_dir.to_path_buf()));
        Ok(())
    }

    fn unmount(&mut self, device: &Path) -> anyhow::Result<()> {
        self.unmounted.push(device.to_path_buf());
        anyhow::ensure!(!self.fail_unmount, "unmount of {} failed", device.display());
        Ok(())
    }
}
