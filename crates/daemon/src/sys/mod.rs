// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Specter Networks LLC

//! Platform process control.
//!
//! The supervision runtime talks to the OS through this boundary only:
//! process lookup, suspend/resume, kill, priority, and per-process CPU
//! measurement. One implementation is selected at compile time.

use sysinfo::{Pid, ProcessesToUpdate, System};

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub use unix::{kill, lower_priority, resume, suspend, CpuMeter};

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::{kill, lower_priority, resume, suspend, CpuMeter};

/// Executable name of the live process with this PID, or `None` when no such
/// process exists.
pub fn process_name(pid: u32) -> Option<String> {
    if pid == 0 {
        return None;
    }
    let mut sys = System::new();
    let target = Pid::from_u32(pid);
    sys.refresh_processes(ProcessesToUpdate::Some(&[target]), true);
    sys.process(target)
        .map(|proc| proc.name().to_string_lossy().into_owned())
}

/// Host CPU count used to normalize per-process CPU percentages.
pub(crate) fn cpu_count() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
