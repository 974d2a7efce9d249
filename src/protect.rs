use crate::error::{GuardError, GuardResult};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// The storage device's protection attribute: number of seconds the heads
/// stay parked, 0 meaning unparked.
pub trait ProtectionSwitch {
    /// Currently configured protection duration in seconds
    fn read(&mut self) -> GuardResult<u32>;

    /// Park for `seconds`, or unpark with 0
    fn write(&mut self, seconds: u32) -> GuardResult<()>;

    /// Check that the attribute is present and usable
    fn probe(&mut self) -> GuardResult<()> {
        self.read().map(|_| ())
    }

    fn describe(&self) -> String;
}

/// Block-layer `protect` attribute in sysfs.
pub struct SysfsProtectSwitch {
    path: PathBuf,
}

impl SysfsProtectSwitch {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, op: &str, e: std::io::Error) -> GuardError {
        GuardError::SwitchIo(format!("{}({}): {}", op, self.path.display(), e))
    }
}

pub fn protect_path(device: &str) -> PathBuf {
    PathBuf::from(format!("/sys/block/{}/queue/protect", device))
}

impl ProtectionSwitch for SysfsProtectSwitch {
    fn read(&mut self) -> GuardResult<u32> {
        let text = fs::read_to_string(&self.path).map_err(|e| self.io_error("read", e))?;
        parse_protect_value(&text).ok_or_else(|| {
            GuardError::SwitchIo(format!(
                "unexpected contents in {}: {:?}",
                self.path.display(),
                text.trim()
            ))
        })
    }

    fn write(&mut self, seconds: u32) -> GuardResult<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|e| self.io_error("open", e))?;
        file.write_all(seconds.to_string().as_bytes())
            .map_err(|e| self.io_error("write", e))
    }

    fn probe(&mut self) -> GuardResult<()> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .map(|_| ())
            .map_err(|e| self.io_error("open", e))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Leading unsigned integer of the attribute text; blank reads as 0.
fn parse_protect_value(text: &str) -> Option<u32> {
    match text.split_whitespace().next() {
        None => Some(0),
        Some(token) => token.parse().ok(),
    }
}
