// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! # r3bl_periodic
//!
//! The contract between a periodic task and its scheduler:
//!
//! 1. The task reads its [`SchedParams`], sets `period`, `deadline` and
//!    `is_periodic = true`, and writes them back ([`TaskHandle::set_params`]).
//! 2. At the end of each release it calls [`TaskHandle::wait_for_next_period`], which
//!    suspends it until the next release point.
//!
//! Release points are anchored at the release in which the task became periodic, and
//! advance by whole periods. A task that overruns is not stopped: the missed deadline
//! is counted, and the task waits for the next boundary that is still in the future.
//!
//! The release points are [`tokio::time`] instants, so tests can run with a paused
//! clock.

#![cfg_attr(not(test), deny(clippy::unwrap_in_result))]

// Attach sources.
pub mod error;
pub mod sched_params;
pub mod scheduler;
pub mod task_state;

// Re-export.
pub use error::*;
pub use sched_params::*;
pub use scheduler::*;
pub use task_state::*;

/// Flip this to `false` to silence the `tracing::debug!` calls in this crate.
pub const DEBUG_PERIODIC_MOD: bool = true;
