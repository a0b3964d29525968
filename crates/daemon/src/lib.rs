// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Specter Networks LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ghost-daemon: the agent's supervision runtime.
//!
//! Hosts the long-running tasks: the plugin supervisor with its launch and
//! adopt workers, per-plugin CPU throttlers, the outbound queue drainer, the
//! controller check-in loop, and the heartbeat. Everything shares one
//! [`AgentContext`] built by [`bootstrap`]; there is no ambient global state.

pub mod adopt;
pub mod bootstrap;
pub mod checkin;
pub mod context;
pub mod decision;
pub mod drainer;
pub mod heartbeat;
pub mod launch;
pub mod report;
pub mod resources;
pub mod supervisor;
pub mod sys;
pub mod throttle;

pub use bootstrap::{bootstrap, verify_binary, BootstrapArgs, BootstrapError};
pub use context::AgentContext;

#[cfg(test)]
pub(crate) mod test_helpers;
