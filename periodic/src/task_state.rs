// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use strum_macros::Display;

/// ```text
///            dispatch                 wait_for_next_period
///   Ready ─────────────► Running ◄────────────────────────► WaitingForRelease
///     ▲                     │            cancel_wait                    │
///     │                     │ exit                                      │
///     │                     ▼                                           │
///     │                  Exited                                         │
///     └─────────────────────────────────────────────────────────────────┘
///                            period_boundary
/// ```
///
/// `cancel_wait` happens when a wait is dropped before its release point.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Hash)]
pub enum TaskState {
    #[default]
    Ready,
    Running,
    WaitingForRelease,
    Exited,
}

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
#[strum(serialize_all = "snake_case")]
pub enum TaskEvent {
    Dispatch,
    WaitForNextPeriod,
    PeriodBoundary,
    CancelWait,
    Exit,
}

impl TaskState {
    /// The state after `event`, or `None` if `event` is not allowed in this state.
    /// Any live state can exit.
    #[must_use]
    pub fn next(self, event: TaskEvent) -> Option<TaskState> {
        match (self, event) {
            (TaskState::Ready, TaskEvent::Dispatch) => Some(TaskState::Running),
            (TaskState::Running, TaskEvent::WaitForNextPeriod) => {
                Some(TaskState::WaitingForRelease)
            }
            (TaskState::WaitingForRelease, TaskEvent::PeriodBoundary) => Some(TaskState::Ready),
            (TaskState::WaitingForRelease, TaskEvent::CancelWait) => Some(TaskState::Running),
            (TaskState::Exited, _) => None,
            (_, TaskEvent::Exit) => Some(TaskState::Exited),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool { self == TaskState::Exited }
}

#[cfg(test)]
mod tests_task_state {
    use test_case::test_case;

    use super::*;

    #[test_case(TaskState::Ready, TaskEvent::Dispatch => Some(TaskState::Running))]
    #[test_case(TaskState::Running, TaskEvent::WaitForNextPeriod => Some(TaskState::WaitingForRelease))]
    #[test_case(TaskState::WaitingForRelease, TaskEvent::PeriodBoundary => Some(TaskState::Ready))]
    #[test_case(TaskState::WaitingForRelease, TaskEvent::CancelWait => Some(TaskState::Running))]
    #[test_case(TaskState::Running, TaskEvent::CancelWait => None)]
    #[test_case(TaskState::Running, TaskEvent::Exit => Some(TaskState::Exited))]
    #[test_case(TaskState::Ready, TaskEvent::Exit => Some(TaskState::Exited))]
    #[test_case(TaskState::Ready, TaskEvent::WaitForNextPeriod => None)]
    #[test_case(TaskState::Running, TaskEvent::Dispatch => None)]
    #[test_case(TaskState::WaitingForRelease, TaskEvent::Dispatch => None)]
    #[test_case(TaskState::Exited, TaskEvent::Dispatch => None)]
    #[test_case(TaskState::Exited, TaskEvent::Exit => None)]
    fn test_transitions(state: TaskState, event: TaskEvent) -> Option<TaskState> {
        state.next(event)
    }

    #[test]
    fn test_initial_and_terminal() {
        assert_eq!(TaskState::default(), TaskState::Ready);
        assert!(TaskState::Exited.is_terminal());
        assert!(!TaskState::WaitingForRelease.is_terminal());
        assert_eq!(TaskEvent::PeriodBoundary.to_string(), "period_boundary");
    }
}
