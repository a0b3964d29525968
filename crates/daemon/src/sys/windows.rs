// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Specter Networks LLC

//! Windows process control: NT suspend/resume, `SetPriorityClass`, and CPU
//! measurement from kernel+user times against tick-count deltas.

use std::io;
use windows_sys::Win32::Foundation::{CloseHandle, FILETIME, HANDLE};
use windows_sys::Win32::System::SystemInformation::GetTickCount64;
use windows_sys::Win32::System::Threading::{
    GetProcessTimes, OpenProcess, SetPriorityClass, TerminateProcess, IDLE_PRIORITY_CLASS,
    PROCESS_ALL_ACCESS,
};

// The NT suspend/resume entry points are not surfaced by the Win32 metadata.
#[link(name = "ntdll")]
extern "system" {
    fn NtSuspendProcess(handle: HANDLE) -> i32;
    fn NtResumeProcess(handle: HANDLE) -> i32;
}

/// Owned full-access process handle.
struct ProcessHandle(HANDLE);

impl ProcessHandle {
    fn open(pid: u32) -> io::Result<Self> {
        // SAFETY: OpenProcess with value arguments; failure returns null.
        let handle = unsafe { OpenProcess(PROCESS_ALL_ACCESS, 0, pid) };
        if handle.is_null() {
            return Err(io::Error::last_os_error());
        }
        Ok(Self(handle))
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        // SAFETY: handle was opened by us and is closed exactly once.
        unsafe { CloseHandle(self.0) };
    }
}

pub fn suspend(pid: u32) -> io::Result<()> {
    let handle = ProcessHandle::open(pid)?;
    // SAFETY: valid handle held for the duration of the call.
    let status = unsafe { NtSuspendProcess(handle.0) };
    nt_result(status)
}

pub fn resume(pid: u32) -> io::Result<()> {
    let handle = ProcessHandle::open(pid)?;
    // SAFETY: valid handle held for the duration of the call.
    let status = unsafe { NtResumeProcess(handle.0) };
    nt_result(status)
}

pub fn kill(pid: u32) -> io::Result<()> {
    let handle = ProcessHandle::open(pid)?;
    // SAFETY: valid handle held for the duration of the call.
    let ok = unsafe { TerminateProcess(handle.0, 1) };
    if ok == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Drop the process into the idle priority class.
pub fn lower_priority(pid: u32) -> io::Result<()> {
    let handle = ProcessHandle::open(pid)?;
    // SAFETY: valid handle held for the duration of the call.
    let ok = unsafe { SetPriorityClass(handle.0, IDLE_PRIORITY_CLASS) };
    if ok == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn nt_result(status: i32) -> io::Result<()> {
    if status < 0 {
        return Err(io::Error::new(
            io::ErrorKind::Other,
            format!("NTSTATUS {status:#x}"),
        ));
    }
    Ok(())
}

fn filetime_millis(ft: &FILETIME) -> f64 {
    // FILETIME is 100 ns units.
    let ticks = ((ft.dwHighDateTime as u64) << 32) | ft.dwLowDateTime as u64;
    ticks as f64 / 10_000.0
}

/// Per-process CPU sampler. Each call measures kernel+user time consumed
/// since the previous sample against the wall-clock tick delta, normalized by
/// the host CPU count.
pub struct CpuMeter {
    handle: ProcessHandle,
    prev_proc_ms: f64,
    prev_tick_ms: u64,
    num_cpus: usize,
}

impl CpuMeter {
    pub fn new(pid: u32) -> io::Result<Self> {
        Ok(Self {
            handle: ProcessHandle::open(pid)?,
            prev_proc_ms: 0.0,
            prev_tick_ms: 0,
            num_cpus: super::cpu_count(),
        })
    }

    /// CPU percentage of the process since the last sample. The first sample
    /// after construction reads zero.
    pub fn sample(&mut self) -> io::Result<f64> {
        let mut creation = zero_filetime();
        let mut exit = zero_filetime();
        let mut kernel = zero_filetime();
        let mut user = zero_filetime();

        // SAFETY: valid handle and out-pointers to stack FILETIMEs.
        let ok = unsafe {
            GetProcessTimes(self.handle.0, &mut creation, &mut exit, &mut kernel, &mut user)
        };
        if ok == 0 {
            return Err(io::Error::last_os_error());
        }

        let proc_ms = filetime_millis(&kernel) + filetime_millis(&user);
        // SAFETY: no arguments.
        let tick_ms = unsafe { GetTickCount64() };

        let percent = if self.prev_tick_ms == 0 || tick_ms <= self.prev_tick_ms {
            0.0
        } else {
            let elapsed = (tick_ms - self.prev_tick_ms) as f64;
            ((proc_ms - self.prev_proc_ms) / elapsed * 100.0) / self.num_cpus as f64
        };

        self.prev_proc_ms = proc_ms;
        self.prev_tick_ms = tick_ms;
        Ok(percent)
    }
}

fn zero_filetime() -> FILETIME {
    FILETIME { dwLowDateTime: 0, dwHighDateTime: 0 }
}
