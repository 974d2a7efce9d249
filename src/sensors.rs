use crate::error::{GuardError, GuardResult};
use crate::types::Position;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

pub const HDAPS_POSITION_FILE: &str = "/sys/devices/platform/hdaps/position";

/// Sysfs attributes are small; anything longer than this is not a position.
const READ_BUF_LEN: usize = 32;

/// Source of the latest chassis position.
pub trait SensorSource {
    fn read(&mut self) -> GuardResult<Position>;

    fn describe(&self) -> String;
}

/// HDAPS accelerometer exposed by the hdaps platform driver.
pub struct HdapsSensor {
    path: PathBuf,
}

impl HdapsSensor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for HdapsSensor {
    fn default() -> Self {
        Self::new(HDAPS_POSITION_FILE)
    }
}

impl SensorSource for HdapsSensor {
    fn read(&mut self) -> GuardResult<Position> {
        // Reopened every time: seeking a sysfs file back to 0 does not
        // produce a fresh reading.
        let mut file = File::open(&self.path).map_err(|e| {
            GuardError::SensorUnavailable(format!("open({}): {}", self.path.display(), e))
        })?;

        let mut buf = [0u8; READ_BUF_LEN];
        let n = file.read(&mut buf).map_err(|e| {
            GuardError::SensorUnavailable(format!("read({}): {}", self.path.display(), e))
        })?;
        if n == 0 {
            return Err(GuardError::MalformedReading(format!(
                "unexpectedly read zero bytes from {}",
                self.path.display()
            )));
        }

        let text = String::from_utf8_lossy(&buf[..n]);
        parse_position(&text)
            .ok_or_else(|| GuardError::MalformedReading(format!("{:?}", text.trim())))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Parse the driver's "(x,y)\n" format.
pub fn parse_position(output: &str) -> Option<Position> {
    let inner = output
        .trim()
        .strip_prefix('(')?
        .strip_suffix(')')?;
    let (x, y) = inner.split_once(',')?;

    Some(Position {
        x: x.trim().parse().ok()?,
        y: y.trim().parse().ok()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_parse_position() {
        assert_eq!(parse_position("(512,498)\n"), Some(Position::new(512, 498)));
        assert_eq!(parse_position("(-3,17)"), Some(Position::new(-3, 17)));
        assert_eq!(parse_position(" ( 1, 2 ) "), Some(Position::new(1, 2)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_position(""), None);
        assert_eq!(parse_position("512,498"), None);
        assert_eq!(parse_position("(512)"), None);
        assert_eq!(parse_position("(a,b)"), None);
        assert_eq!(parse_position("(1,2"), None);
    }

    #[test]
    fn test_read_from_file() {
        let path = std::env::temp_dir().join(format!("shock_guard_position_{}", std::process::id()));
        fs::write(&path, "(500,-20)\n").unwrap();

        let mut sensor = HdapsSensor::new(&path);
        assert_eq!(sensor.read().unwrap(), Position::new(500, -20));

        // A fresh open sees the updated value
        fs::write(&path, "(501,-21)\n").unwrap();
        assert_eq!(sensor.read().unwrap(), Position::new(501, -21));

        fs::write(&path, "").unwrap();
        assert!(matches!(sensor.read(), Err(GuardError::MalformedReading(_))));

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_sensor() {
        let mut sensor = HdapsSensor::new("/nonexistent/hdaps/position");
        let err = sensor.read().unwrap_err();
        assert!(matches!(err, GuardError::SensorUnavailable(_)));
        assert!(err.is_transient());
    }
}
