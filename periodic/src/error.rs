// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use nix::errno::Errno;

use crate::{TaskEvent, TaskState};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, miette::Diagnostic)]
pub enum SchedulerError {
    #[error("scheduler rejected parameters: {reason}")]
    #[diagnostic(
        code(r3bl_periodic::rejected),
        help("A periodic task needs 0 < deadline <= period <= one year")
    )]
    Rejected { reason: &'static str },

    #[error("task {task_id} is not periodic")]
    #[diagnostic(
        code(r3bl_periodic::not_periodic),
        help("Set `is_periodic = true` with `set_params` before waiting for the next period")
    )]
    NotPeriodic { task_id: u64 },

    #[error("task {task_id} can't {event} while {state}")]
    #[diagnostic(code(r3bl_periodic::invalid_state))]
    InvalidState {
        task_id: u64,
        state: TaskState,
        event: TaskEvent,
    },

    #[error("no task with id {task_id}")]
    #[diagnostic(code(r3bl_periodic::unknown_task))]
    UnknownTask { task_id: u64 },
}

impl SchedulerError {
    /// The negative errno a system call would return for this error.
    #[must_use]
    pub fn as_errno(&self) -> i32 {
        let errno = match self {
            SchedulerError::Rejected { .. } | SchedulerError::NotPeriodic { .. } => Errno::EINVAL,
            SchedulerError::InvalidState { .. } => Errno::EPERM,
            SchedulerError::UnknownTask { .. } => Errno::ESRCH,
        };
        -(errno as i32)
    }
}
