// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Specter Networks LLC

//! Closed-loop CPU throttling.
//!
//! While attached to a PID, the throttler alternates brief suspend/resume
//! cycles sized by a feedback loop: every 200 ms it samples the process's CPU
//! share (normalized across host CPUs, padded by 20% headroom), scales the
//! suspend window by `measured / target`, then suspends, waits, and resumes.
//! A dying process just makes samples fail; the loop logs and keeps going
//! until the owning task cancels it after observing the exit.
//!
//! Cancellation never re-suspends: the loop stops and issues one final
//! resume, so a child is never left frozen by an agent shutdown mid-cycle.

use crate::sys;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Feedback cadence.
const TICK: Duration = Duration::from_millis(200);

/// Safety headroom applied to measurements.
const HEADROOM: f64 = 1.2;

/// Upper bound on one suspend window, so a mismeasured spike cannot park the
/// child for minutes.
const MAX_SLEEP: Duration = Duration::from_secs(10);

/// A running throttler attached to one PID.
pub struct ThrottleHandle {
    quit: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl ThrottleHandle {
    /// Attach a throttler driving `pid` toward `target_percent`.
    pub fn spawn(pid: u32, target_percent: u64) -> Self {
        let (quit, quit_rx) = mpsc::channel(1);
        let task = tokio::spawn(run(pid, target_percent, quit_rx));
        Self { quit, task }
    }

    /// Stop the loop and wait for its final resume.
    pub async fn cancel(self) {
        let _ = self.quit.send(()).await;
        let _ = self.task.await;
    }
}

async fn run(pid: u32, target_percent: u64, mut quit: mpsc::Receiver<()>) {
    let mut meter = match sys::CpuMeter::new(pid) {
        Ok(meter) => meter,
        Err(err) => {
            warn!(pid, error = %err, "unable to open process for throttling");
            return;
        }
    };
    let mut sleep = Duration::from_millis(1);

    loop {
        match quit.try_recv() {
            Err(mpsc::error::TryRecvError::Empty) => {}
            // Quit message, or every handle dropped.
            _ => break,
        }

        if let Err(err) = throttle_once(pid, target_percent, &mut meter, &mut sleep).await {
            // Transient: the loop self-heals on later ticks, and process
            // death is handled by the owner observing the exit.
            debug!(pid, error = %err, "throttle cycle failed");
        }

        tokio::time::sleep(TICK).await;
    }

    // The owner may have cancelled between our suspend and resume.
    if let Err(err) = sys::resume(pid) {
        debug!(pid, error = %err, "final resume failed");
    }
}

async fn throttle_once(
    pid: u32,
    target_percent: u64,
    meter: &mut sys::CpuMeter,
    sleep: &mut Duration,
) -> std::io::Result<()> {
    let measured = meter.sample()?;
    *sleep = next_sleep(*sleep, measured, target_percent);

    sys::suspend(pid)?;
    tokio::time::sleep(*sleep).await;
    sys::resume(pid)?;
    Ok(())
}

/// One feedback step: grow or shrink the suspend window toward the target.
///
/// An idle sample is treated as 1% so the window can recover from zero
/// measurements instead of collapsing permanently.
pub(crate) fn next_sleep(sleep: Duration, measured_percent: f64, target_percent: u64) -> Duration {
    if target_percent == 0 {
        return sleep;
    }
    let current = if measured_percent > 0.0 { measured_percent } else { 1.0 };
    let ratio = (current * HEADROOM) / target_percent as f64;
    let next = (sleep + Duration::from_millis(1)).as_secs_f64() * ratio;
    Duration::from_secs_f64(next.clamp(0.0, MAX_SLEEP.as_secs_f64()))
}

#[cfg(test)]
#[path = "throttle_tests.rs"]
mod tests;
