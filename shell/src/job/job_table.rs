// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::fmt::{Display, Formatter, Result};

use nix::{errno::Errno,
          sys::wait::{WaitPidFlag, WaitStatus, waitpid},
          unistd::Pid};

use super::{DEBUG_JOB_MOD, JobStatus};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackgroundJob {
    pub pid: Pid,
    pub command: String,
}

/// A background job that has terminated and been reaped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FinishedJob {
    pub job: BackgroundJob,
    pub status: JobStatus,
}

impl Display for FinishedJob {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "[{}] {}  {}", self.job.pid, self.status, self.job.command)
    }
}

/// Background jobs that haven't been reaped yet, plus the ones that were reaped but not
/// reported yet. Reaping never touches `$?`.
#[derive(Debug, Default)]
pub struct JobTable {
    running: Vec<BackgroundJob>,
    finished: Vec<FinishedJob>,
}

impl JobTable {
    pub fn add(&mut self, pid: Pid, command: impl Into<String>) {
        self.running.push(BackgroundJob {
            pid,
            command: command.into(),
        });
    }

    #[must_use]
    pub fn running_count(&self) -> usize { self.running.len() }

    #[must_use]
    pub fn running(&self) -> &[BackgroundJob] { &self.running }

    /// Non blocking wait on every running job. Only the pids in this table are waited
    /// on, so a foreground `waitpid` elsewhere never loses its child to this loop.
    pub fn reap(&mut self) {
        let mut still_running = Vec::with_capacity(self.running.len());
        for job in self.running.drain(..) {
            match waitpid(job.pid, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::StillAlive) | Err(Errno::EINTR) => still_running.push(job),
                Ok(wait_status) => match JobStatus::from_wait_status(wait_status) {
                    Some(status) => {
                        DEBUG_JOB_MOD.then(|| {
                            // % is Display, ? is Debug.
                            tracing::debug!(
                                message = "reaped background job",
                                pid = %job.pid,
                                status = %status
                            );
                        });
                        self.finished.push(FinishedJob { job, status });
                    }
                    None => still_running.push(job),
                },
                Err(error) => {
                    // ECHILD: somebody else reaped it, there is nothing left to report.
                    tracing::warn!(message = "dropping background job", pid = %job.pid, error = %error);
                }
            }
        }
        self.running = still_running;
    }

    /// Finished jobs, oldest first. They are only returned once.
    pub fn drain_finished(&mut self) -> Vec<FinishedJob> { std::mem::take(&mut self.finished) }
}
