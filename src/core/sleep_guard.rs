#[cfg(target_os = "windows")]
extern crate winapi;

#[cfg(not(target_os = "windows"))]
use std::process::Child;
#[cfg(any(target_os = "macos", target_os = "linux"))]
use std::process::Command;
use tracing::{debug, warn};

#[cfg(target_os = "windows")]
use winapi::um::winbase::SetThreadExecutionState;
#[cfg(target_os = "windows")]
use winapi::um::winnt::{ES_CONTINUOUS, ES_SYSTEM_REQUIRED};

/// Keeps the host from idling into sleep while a long run is in progress.
/// Released on drop.
pub struct SleepGuard {
    active: bool,
    #[cfg(not(target_os = "windows"))]
    process: Option<Child>,
}

impl SleepGuard {
    pub fn new(keep_awake: bool) -> Self {
        let mut guard = SleepGuard {
            active: false,
            #[cfg(not(target_os = "windows"))]
            process: None,
        };
        if keep_awake {
            guard.active = guard.prevent_sleep();
            if guard.active {
                debug!("sleep inhibited for the duration of the run");
            } else {
                warn!("could not inhibit sleep, continuing without it");
            }
        }
        guard
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    #[cfg(target_os = "windows")]
    fn prevent_sleep(&mut self) -> bool {
        unsafe { SetThreadExecutionState(ES_CONTINUOUS | ES_SYSTEM_REQUIRED) != 0 }
    }

    #[cfg(target_os = "macos")]
    fn prevent_sleep(&mut self) -> bool {
        self.process = Command::new("caffeinate").arg("-i").spawn().ok();
        self.process.is_some()
    }

    #[cfg(target_os = "linux")]
    fn prevent_sleep(&mut self) -> bool {
        self.process = Command::new("systemd-inhibit")
            .arg("--what=idle:sleep")
            .arg(format!("--who={}", env!("CARGO_PKG_NAME")))
            .arg("--why=load test in progress")
            .arg("--mode=block")
            .arg("sleep")
            .arg("infinity")
            .spawn()
            .ok();
        self.process.is_some()
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    fn prevent_sleep(&mut self) -> bool {
        false
    }
}

impl Drop for SleepGuard {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        #[cfg(target_os = "windows")]
        unsafe {
            SetThreadExecutionState(ES_CONTINUOUS);
        }

        #[cfg(not(target_os = "windows"))]
        if let Some(mut child) = self.process.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        debug!("sleep inhibition released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_guard_does_nothing() {
        let guard = SleepGuard::new(false);
        assert!(!guard.is_active());
    }
}
