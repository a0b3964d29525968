// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Specter Networks LLC

//! Liveness heartbeat: a file beside the binary, rewritten every second with
//! the current Unix-nanosecond timestamp. The external restart wrapper
//! watches this file to detect a hung agent.

use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::error;

pub async fn run(install_dir: PathBuf) {
    let path = install_dir.join("heartbeat");
    let mut ticker = tokio::time::interval(Duration::from_secs(1));

    loop {
        ticker.tick().await;
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        if let Err(err) = std::fs::write(&path, nanos.to_string()) {
            // An unwritable install dir means the watchdog can't see us
            // either; better to die and let the wrapper restart cleanly.
            error!(path = %path.display(), error = %err, "unable to write heartbeat");
            std::process::exit(1);
        }
    }
}
