// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Specter Networks LLC

//! Unix process control: signals for suspend/resume/kill, `setpriority` for
//! demotion, sysinfo for CPU sampling.

use nix::sys::signal::{kill as send_signal, Signal};
use nix::unistd::Pid as NixPid;
use std::io;
use sysinfo::{Pid, ProcessesToUpdate, System};

fn signal(pid: u32, sig: Signal) -> io::Result<()> {
    send_signal(NixPid::from_raw(pid as i32), sig)
        .map_err(|errno| io::Error::from_raw_os_error(errno as i32))
}

/// Pause the process. Paired with [`resume`] by the throttler.
pub fn suspend(pid: u32) -> io::Result<()> {
    signal(pid, Signal::SIGSTOP)
}

pub fn resume(pid: u32) -> io::Result<()> {
    signal(pid, Signal::SIGCONT)
}

pub fn kill(pid: u32) -> io::Result<()> {
    signal(pid, Signal::SIGKILL)
}

/// Demote the process below normal scheduling priority.
pub fn lower_priority(pid: u32) -> io::Result<()> {
    // SAFETY: plain syscall with value arguments.
    let rc = unsafe { libc::setpriority(libc::PRIO_PROCESS as _, pid, 5) };
    if rc == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Per-process CPU sampler. Each call measures usage since the previous
/// sample, normalized by the host CPU count.
pub struct CpuMeter {
    sys: System,
    pid: Pid,
    num_cpus: usize,
}

impl CpuMeter {
    pub fn new(pid: u32) -> io::Result<Self> {
        let target = Pid::from_u32(pid);
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[target]), true);
        Ok(Self { sys, pid: target, num_cpus: super::cpu_count() })
    }

    /// CPU percentage of the process since the last sample. The first sample
    /// after construction reads near zero.
    pub fn sample(&mut self) -> io::Result<f64> {
        self.sys.refresh_processes(ProcessesToUpdate::Some(&[self.pid]), true);
        let proc = self
            .sys
            .process(self.pid)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "process exited"))?;
        Ok(proc.cpu_usage() as f64 / self.num_cpus as f64)
    }
}
