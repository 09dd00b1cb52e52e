//! One logging session, from waiting for the drive to unmounting it.

use crate::config::Config;
use crate::display::Screen;
use crate::recorder::{record, Instruments, RecordOutcome, RunState};
use crate::reprogram::{reprogram_clock, OperatorInput};
use crate::usb::{wait_for_usb, DriveMounter, UsbDetector};

/// Everything a session talks to: the recording instruments plus the
/// console and the drive.
pub struct Station<'a> {
    pub instruments: Instruments<'a>,
    pub input: &'a mut dyn OperatorInput,
    pub detector: &'a mut dyn UsbDetector,
    pub drive: &'a mut dyn DriveMounter,
}

/// Waits for the drive, mounts it, makes sure the clock is set and records
/// until the stop button is pressed.
///
/// Once the drive is mounted it is unmounted again whatever happens
/// afterwards.
pub fn run_session(station: &mut Station<'_>, config: &Config) -> anyhow::Result<RecordOutcome> {
    let mut state = RunState::AwaitingUsb;

    let device = wait_for_usb(
        station.detector,
        station.instruments.display,
        &config.vendor_id,
        config.usb_retry_delay(),
    )?;
    station.drive.mount(&device, &config.mount_dir)?;

    let result = record_on_drive(station, config, &mut state);

    match station.drive.unmount(&device) {
        Ok(()) => result,
        Err(e) => {
            if let Err(session) = &result {
                log::error!("Logging session failed: {session:#}");
            }
            Err(e)
        }
    }
}

fn enter(state: &mut RunState, next: RunState) {
    log::info!("{state:?} -> {next:?}");
    *state = next;
}

fn record_on_drive(
    station: &mut Station<'_>,
    config: &Config,
    state: &mut RunState,
) -> anyhow::Result<RecordOutcome> {
    let instruments = &mut station.instruments;

    enter(state, RunState::AwaitingStart);
    instruments.display.render(&Screen::Mounted {
        mount_dir: &config.mount_dir,
    })?;

    if instruments.clock.lost_power()? {
        reprogram_clock(instruments.clock, instruments.display, station.input)?;
    }

    // Also debounces the stop button.
    std::thread::sleep(config.start_delay());

    enter(state, RunState::Recording);
    let outcome = record(instruments, &config.mount_dir, config.time_between_lines);
    enter(state, RunState::Finished);

    log::info!("Recorded {} rows", outcome.rows());
    match &outcome {
        RecordOutcome::Stopped { path, .. } => {
            log::info!("Data is in {}", path.display());
        }
        RecordOutcome::Fault { description, .. } => {
            log::error!("Recording failed: {description}");
            log::warn!("Rows written before the failure are kept");
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        at, scratch_dir, FakeBarometer, FakeButton, FakeClock, FakeDetector, FakeDrive,
        MemoryDisplay, ScriptedInput,
    };
    use std::path::{Path, PathBuf};

    const DEVICE: &str = "/dev/sda1";

    struct Rig {
        clock: FakeClock,
        barometers: [FakeBarometer; 2],
        display: MemoryDisplay,
        button: FakeButton,
        input: ScriptedInput,
        detector: FakeDetector,
        drive: FakeDrive,
    }

    impl Rig {
        fn new(press_on_poll: usize) -> Self {
            Self {
                clock: FakeClock::new(vec![at(12, 0, 0), at(12, 1, 0)]),
                barometers: [FakeBarometer::new(1013.5, 20.25), FakeBarometer::new(990.0, 19.5)],
                display: MemoryDisplay::default(),
                button: FakeButton::pressed_on_poll(press_on_poll),
                input: ScriptedInput::typing(""),
                detector: FakeDetector::found_after(1, DEVICE),
                drive: FakeDrive::default(),
            }
        }

        fn run(&mut self, config: &Config) -> anyhow::Result<RecordOutcome> {
            let [first, second] = &mut self.barometers;
            let mut station = Station {
                instruments: Instruments {
                    clock: &mut self.clock,
                    barometers: [first, second],
                    display: &mut self.display,
                    stop_button: &mut self.button,
                },
                input: &mut self.input,
                detector: &mut self.detector,
                drive: &mut self.drive,
            };
            run_session(&mut station, config)
        }

        fn unmounted(&self) -> Vec<PathBuf> {
            self.drive.unmounted.clone()
        }
    }

    fn config(mount_dir: &Path) -> Config {
        Config {
            mount_dir: mount_dir.to_path_buf(),
            usb_retry_secs: 0,
            start_delay_ms: 0,
            ..Config::default()
        }
    }

    #[test]
    fn test_session_records_then_unmounts() {
        let dir = scratch_dir("session-happy");
        let mut rig = Rig::new(2);

        let outcome = rig.run(&config(&dir)).unwrap();

        assert_eq!(
            outcome,
            RecordOutcome::Stopped {
                rows: 1,
                path: dir.join("3-7-2024_12_0.csv"),
            }
        );
        assert_eq!(rig.detector.calls, 2);
        assert_eq!(rig.drive.mounted, vec![(PathBuf::from(DEVICE), dir)]);
        assert_eq!(rig.unmounted(), vec![PathBuf::from(DEVICE)]);
        assert_eq!(rig.display.current(), Screen::Finished.lines());
        assert!(rig.clock.set_calls.is_empty());
    }

    #[test]
    fn test_lost_clock_is_reprogrammed_before_recording() {
        let dir = scratch_dir("session-reprogram");
        let mut rig = Rig::new(1);
        rig.clock.lost_power = true;
        rig.input = ScriptedInput::typing("\r03/07/2024/12/00/00\r");

        let outcome = rig.run(&config(&dir)).unwrap();

        assert_eq!(outcome.rows(), 1);
        assert_eq!(rig.clock.set_calls, vec![at(12, 0, 0)]);
        assert_eq!(rig.input.released, 1);
        assert_eq!(rig.unmounted(), vec![PathBuf::from(DEVICE)]);
    }

    #[test]
    fn test_failed_clock_check_still_unmounts() {
        let dir = scratch_dir("session-clock-failure");
        let mut rig = Rig::new(1);
        rig.clock.lost_power = true;

        assert!(rig.run(&config(&dir)).is_err());

        assert_eq!(rig.button.polls, 0);
        assert_eq!(rig.unmounted(), vec![PathBuf::from(DEVICE)]);
    }

    #[test]
    fn test_recording_fault_still_unmounts() {
        let dir = scratch_dir("session-fault");
        let mut rig = Rig::new(5);
        rig.barometers[1].fail_on_read = Some(1);

        let outcome = rig.run(&config(&dir)).unwrap();

        assert!(matches!(outcome, RecordOutcome::Fault { rows: 0, .. }));
        assert_eq!(rig.unmounted(), vec![PathBuf::from(DEVICE)]);
    }

    #[test]
    fn test_unmount_failure_is_reported() {
        let dir = scratch_dir("session-unmount-failure");
        let mut rig = Rig::new(1);
        rig.clock.lost_power = true;
        rig.drive.fail_unmount = true;

        let error = rig.run(&config(&dir)).unwrap_err();

        assert!(format!("{error:#}").contains("unmount of /dev/sda1 failed"));
        assert_eq!(rig.unmounted(), vec![PathBuf::from(DEVICE)]);
    }

    #[test]
    fn test_failed_mount_skips_recording_and_unmount() {
        let dir = scratch_dir("session-mount-failure");
        let mut rig = Rig::new(1);
        rig.drive.fail_mount = true;

        assert!(rig.run(&config(&dir)).is_err());

        assert_eq!(rig.button.polls, 0);
        assert!(rig.unmounted().is_empty());
        assert!(!dir.join("3-7-2024_12_0.csv").exists());
    }
}
