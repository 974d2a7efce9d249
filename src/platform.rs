//! Process-level hooks: memory pinning, detaching from the terminal and a
//! clock that keeps running through suspend.
//! All go straight to libc, the daemon needs nothing else from it.

use std::io;
#[cfg(target_os = "linux")]
use std::os::raw::c_long;

#[cfg(target_os = "linux")]
#[repr(C)]
struct Timespec {
    tv_sec: c_long,
    tv_nsec: c_long,
}

#[cfg(target_os = "linux")]
extern "C" {
    fn mlockall(flags: i32) -> i32;
    fn daemon(nochdir: i32, noclose: i32) -> i32;
    fn clock_gettime(clock_id: i32, tp: *mut Timespec) -> i32;
}

#[cfg(target_os = "linux")]
const CLOCK_BOOTTIME: i32 = 7;

// Generic Linux values (x86, arm)
#[cfg(target_os = "linux")]
const MCL_CURRENT: i32 = 1;
#[cfg(target_os = "linux")]
const MCL_FUTURE: i32 = 2;

/// Keep every current and future page resident so a park command is never
/// delayed by swap-in.
#[cfg(target_os = "linux")]
pub fn lock_memory() -> io::Result<()> {
    if unsafe { mlockall(MCL_CURRENT | MCL_FUTURE) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Fork into the background, chdir to / and point stdio at /dev/null.
/// Must run before any threads exist, i.e. before the runtime is built.
#[cfg(target_os = "linux")]
pub fn daemonize() -> io::Result<()> {
    if unsafe { daemon(0, 0) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Seconds since boot, including time spent suspended. A resume therefore
/// shows up as a gap between two samples.
#[cfg(target_os = "linux")]
pub fn boot_time() -> io::Result<f64> {
    let mut ts = Timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    if unsafe { clock_gettime(CLOCK_BOOTTIME, &mut ts) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(ts.tv_sec as f64 + ts.tv_nsec as f64 * 1e-9)
}

#[cfg(not(target_os = "linux"))]
pub fn lock_memory() -> io::Result<()> {
    Err(io::Error::new(io::ErrorKind::Unsupported, "mlockall is Linux-only here"))
}

#[cfg(not(target_os = "linux"))]
pub fn daemonize() -> io::Result<()> {
    Err(io::Error::new(io::ErrorKind::Unsupported, "daemon(3) is Linux-only here"))
}

#[cfg(not(target_os = "linux"))]
pub fn boot_time() -> io::Result<f64> {
    Err(io::Error::new(io::ErrorKind::Unsupported, "CLOCK_BOOTTIME is Linux-only"))
}
