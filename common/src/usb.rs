use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::Context;

use crate::display::{Screen, StatusDisplay};

const SYS_BLOCK: &str = "/sys/class/block";

/// Finds the block device of a USB drive.
pub trait UsbDetector {
    /// Device node of a partition on a drive made by `vendor_id`, if one is
    /// plugged in.
    fn find(&mut self, vendor_id: &str) -> anyhow::Result<Option<PathBuf>>;
}

/// Makes the file system of a USB drive available and takes it away again.
pub trait DriveMounter {
    /// Mounts `device` on `mount_dir`.
    fn mount(&mut self, device: &Path, mount_dir: &Path) -> anyhow::Result<()>;

    /// Unmounts `device`, so the data on it is safe to take away.
    fn unmount(&mut self, device: &Path) -> anyhow::Result<()>;
}

/// Looks up partitions through sysfs and their vendor through udev.
#[derive(Clone, Debug, Default)]
pub struct UdevDetector;

impl UsbDetector for UdevDetector {
    fn find(&mut self, vendor_id: &str) -> anyhow::Result<Option<PathBuf>> {
        let mut partitions = std::fs::read_dir(SYS_BLOCK)
            .with_context(|| format!("Failed to list {SYS_BLOCK}"))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().join("partition").exists())
            .map(|entry| entry.file_name())
            .collect::<Vec<_>>();
        partitions.sort();

        for name in partitions {
            let device = Path::new("/dev").join(name);
            let properties = udev_properties(&device)?;

            if properties.get("ID_VENDOR_ID").map(String::as_str) == Some(vendor_id) {
                let node = properties
                    .get("DEVNAME")
                    .map(PathBuf::from)
                    .unwrap_or(device);
                return Ok(Some(node));
            }
        }

        Ok(None)
    }
}

fn udev_properties(device: &Path) -> anyhow::Result<HashMap<String, String>> {
    let output = Command::new("udevadm")
        .arg("info")
        .arg("--query=property")
        .arg("--name")
        .arg(device)
        .output()
        .context("Failed to run udevadm")?;

    if !output.status.success() {
        log::debug!("udevadm knows nothing about {}", device.display());
        return Ok(HashMap::new());
    }

    Ok(parse_udev_properties(&String::from_utf8_lossy(&output.stdout)))
}

/// Parses the `KEY=value` lines printed by `udevadm info --query=property`.
pub fn parse_udev_properties(output: &str) -> HashMap<String, String> {
    output
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}

/// Polls `detector` until a drive by `vendor_id` shows up.
pub fn wait_for_usb(
    detector: &mut dyn UsbDetector,
    display: &mut dyn StatusDisplay,
    vendor_id: &str,
    retry_delay: Duration,
) -> anyhow::Result<PathBuf> {
    loop {
        if let Some(device) = detector.find(vendor_id)? {
            log::info!("Found USB drive {}", device.display());
            return Ok(device);
        }

        log::info!(
            "No USB present, trying again in {} seconds",
            retry_delay.as_secs_f32()
        );
        display.render(&Screen::NoUsb)?;
        std::thread::sleep(retry_delay);
    }
}

/// The shell scripts that mount and unmount the drive.
#[derive(Clone, Debug, PartialEq)]
pub struct MountScripts {
    pub mount: PathBuf,
    pub unmount: PathBuf,
}

impl DriveMounter for MountScripts {
    fn mount(&mut self, device: &Path, mount_dir: &Path) -> anyhow::Result<()> {
        log::info!("Attempting to mount USB to {}", mount_dir.display());
        run_script(Command::new(&self.mount).arg(device).arg(mount_dir))
    }

    fn unmount(&mut self, device: &Path) -> anyhow::Result<()> {
        log::info!("Unmounting {}", device.display());
        run_script(Command::new(&self.unmount).arg(device))
    }
}

fn run_script(command: &mut Command) -> anyhow::Result<()> {
    let status = command
        .status()
        .with_context(|| format!("Failed to run {:?}", command.get_program()))?;

    if !status.success() {
        log::warn!("{:?} exited with {status}", command.get_program());
    }

    Ok(())
}
