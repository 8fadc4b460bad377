// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::fmt::{Display, Formatter, Result};

use nix::sys::wait::WaitStatus;

/// How a child process ended (or paused).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobStatus {
    Exited(i32),
    Signaled(i32),
    Stopped(i32),
}

impl JobStatus {
    /// `None` for the wait results that don't describe a terminated or stopped child
    /// (eg: [`WaitStatus::StillAlive`]).
    #[must_use]
    pub fn from_wait_status(wait_status: WaitStatus) -> Option<Self> {
        match wait_status {
            WaitStatus::Exited(_, code) => Some(JobStatus::Exited(code)),
            WaitStatus::Signaled(_, signal, _) => Some(JobStatus::Signaled(signal as i32)),
            WaitStatus::Stopped(_, signal) => Some(JobStatus::Stopped(signal as i32)),
            _ => None,
        }
    }

    /// The conventional shell status: the exit code, or `128 + signal`.
    #[must_use]
    pub fn exit_code(self) -> i32 {
        match self {
            JobStatus::Exited(code) => code,
            JobStatus::Signaled(signal) | JobStatus::Stopped(signal) => 128 + signal,
        }
    }

    #[must_use]
    pub fn is_exited(self) -> bool { matches!(self, JobStatus::Exited(_)) }
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            JobStatus::Exited(code) => write!(f, "Done ({code})"),
            JobStatus::Signaled(signal) => write!(f, "Killed (signal {signal})"),
            JobStatus::Stopped(signal) => write!(f, "Stopped (signal {signal})"),
        }
    }
}
