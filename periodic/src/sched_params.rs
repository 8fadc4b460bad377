// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::time::Duration;

use crate::SchedulerError;

pub const DEFAULT_PRIORITY: u8 = 10;

/// Longest accepted period. Release points are `Instant`s, which can't go arbitrarily
/// far into the future.
pub const MAX_PERIOD: Duration = Duration::from_secs(60 * 60 * 24 * 365);

/// Scheduler parameters of one task. A fresh task is not periodic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedParams {
    pub priority: u8,
    pub period: Duration,
    /// Relative to each release.
    pub deadline: Duration,
    pub is_periodic: bool,
}

impl Default for SchedParams {
    fn default() -> Self {
        Self {
            priority: DEFAULT_PRIORITY,
            period: Duration::ZERO,
            deadline: Duration::ZERO,
            is_periodic: false,
        }
    }
}

impl SchedParams {
    /// Periodic parameters with `deadline == period`.
    #[must_use]
    pub fn periodic(period: Duration) -> Self {
        Self {
            period,
            deadline: period,
            is_periodic: true,
            ..Self::default()
        }
    }

    /// Non periodic parameters are always valid.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Rejected`] for a periodic task with a zero period, a
    /// period longer than [`MAX_PERIOD`], a zero deadline, or a deadline past the period.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if !self.is_periodic {
            return Ok(());
        }
        let reason = if self.period.is_zero() {
            "period must be positive"
        } else if self.period > MAX_PERIOD {
            "period must not exceed one year"
        } else if self.deadline.is_zero() {
            "deadline must be positive"
        } else if self.deadline > self.period {
            "deadline must not exceed period"
        } else {
            return Ok(());
        };
        Err(SchedulerError::Rejected { reason })
    }
}
