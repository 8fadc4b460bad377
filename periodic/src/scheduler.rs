// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::{collections::HashMap,
          sync::{Arc, Mutex as StdMutex, PoisonError,
                 atomic::{AtomicU64, Ordering}},
          time::Duration};

use tokio::{task::JoinHandle, time::Instant};

use crate::{DEBUG_PERIODIC_MOD, SchedParams, SchedulerError, TaskEvent, TaskState};

pub type TaskId = u64;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TaskStats {
    /// Releases since the task became periodic, counting the first one.
    pub releases: u64,
    /// Releases that ended after their deadline.
    pub missed_deadlines: u64,
    /// Release points that had already passed when the task asked for them.
    pub skipped_releases: u64,
}

/// What [`TaskHandle::try_wait_for_next_period`] woke up for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Release {
    /// 1 based, the release in which the task became periodic is `1`.
    pub index: u64,
    pub at: Instant,
}

#[derive(Debug)]
struct TaskRecord {
    name: String,
    params: SchedParams,
    state: TaskState,
    /// Start of the current release. `None` while not periodic.
    current_release: Option<Instant>,
    stats: TaskStats,
}

impl TaskRecord {
    fn apply(&mut self, task_id: TaskId, event: TaskEvent) -> Result<(), SchedulerError> {
        let next = self.state.next(event).ok_or(SchedulerError::InvalidState {
            task_id,
            state: self.state,
            event,
        })?;
        DEBUG_PERIODIC_MOD.then(|| {
            // % is Display, ? is Debug.
            tracing::debug!(
                message = "task transition",
                task_id = %task_id,
                name = %self.name,
                from = %self.state,
                event = %event,
                to = %next
            );
        });
        self.state = next;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct SchedulerInner {
    tasks: StdMutex<HashMap<TaskId, TaskRecord>>,
    next_id: AtomicU64,
}

/// User space stand in for the kernel side of periodic scheduling. Cheap to clone, all
/// clones share the same task table.
#[derive(Clone, Debug, Default)]
pub struct PeriodicScheduler {
    inner: Arc<SchedulerInner>,
}

impl PeriodicScheduler {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Add a task in the [`TaskState::Ready`] state, with default (non periodic)
    /// parameters.
    pub fn register(&self, name: impl Into<String>) -> TaskHandle {
        let task_id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let record = TaskRecord {
            name: name.into(),
            params: SchedParams::default(),
            state: TaskState::Ready,
            current_release: None,
            stats: TaskStats::default(),
        };
        self.lock_tasks().insert(task_id, record);
        TaskHandle {
            task_id,
            scheduler: self.clone(),
        }
    }

    /// Register a task, dispatch it, and run `body` on the tokio runtime. The task
    /// exits when `body` returns, whether it succeeded or not.
    pub fn spawn<F, Fut>(
        &self,
        name: impl Into<String>,
        body: F,
    ) -> JoinHandle<Result<TaskStats, SchedulerError>>
    where
        F: FnOnce(TaskHandle) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), SchedulerError>> + Send + 'static,
    {
        let handle = self.register(name);
        tokio::spawn(async move {
            handle.dispatch()?;
            let result = body(handle.clone()).await;
            let stats = handle.exit()?;
            result.map(|()| stats)
        })
    }

    #[must_use]
    pub fn state_of(&self, task_id: TaskId) -> Option<TaskState> {
        self.lock_tasks().get(&task_id).map(|it| it.state)
    }

    #[must_use]
    pub fn stats_of(&self, task_id: TaskId) -> Option<TaskStats> {
        self.lock_tasks().get(&task_id).map(|it| it.stats)
    }

    #[must_use]
    pub fn task_count(&self) -> usize { self.lock_tasks().len() }

    fn lock_tasks(&self) -> std::sync::MutexGuard<'_, HashMap<TaskId, TaskRecord>> {
        self.inner
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn with_record<T>(
        &self,
        task_id: TaskId,
        f: impl FnOnce(&mut TaskRecord) -> Result<T, SchedulerError>,
    ) -> Result<T, SchedulerError> {
        let mut tasks = self.lock_tasks();
        let record = tasks
            .get_mut(&task_id)
            .ok_or(SchedulerError::UnknownTask { task_id })?;
        f(record)
    }
}

/// A task's view of the scheduler.
#[derive(Clone, Debug)]
pub struct TaskHandle {
    task_id: TaskId,
    scheduler: PeriodicScheduler,
}

impl TaskHandle {
    #[must_use]
    pub fn id(&self) -> TaskId { self.task_id }

    /// # Errors
    ///
    /// Returns [`SchedulerError::UnknownTask`] if the task is gone.
    pub fn get_params(&self) -> Result<SchedParams, SchedulerError> {
        self.scheduler.with_record(self.task_id, |it| Ok(it.params))
    }

    /// Replace the parameters. Becoming periodic starts the first release now.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Rejected`] for invalid periodic parameters (the old ones
    /// stay in place), or [`SchedulerError::InvalidState`] once the task has exited.
    pub fn set_params(&self, params: SchedParams) -> Result<(), SchedulerError> {
        params.validate()?;
        let task_id = self.task_id;
        self.scheduler.with_record(task_id, |record| {
            if record.state.is_terminal() {
                return Err(SchedulerError::InvalidState {
                    task_id,
                    state: record.state,
                    event: TaskEvent::Dispatch,
                });
            }
            let was_periodic = record.params.is_periodic;
            record.params = params;
            if !params.is_periodic {
                record.current_release = None;
            } else if !was_periodic || record.current_release.is_none() {
                record.current_release = Some(Instant::now());
                record.stats = TaskStats {
                    releases: 1,
                    ..TaskStats::default()
                };
            }
            DEBUG_PERIODIC_MOD.then(|| {
                tracing::debug!(message = "set params", task_id = %task_id, params = ?params);
            });
            Ok(())
        })
    }

    /// `Ready -> Running`.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidState`] unless the task is ready.
    pub fn dispatch(&self) -> Result<(), SchedulerError> {
        let task_id = self.task_id;
        self.scheduler
            .with_record(task_id, |it| it.apply(task_id, TaskEvent::Dispatch))
    }

    /// Suspend until the next release point. Returns `0`, or a negative errno when the
    /// task is not periodic, not running, or unknown.
    pub async fn wait_for_next_period(&self) -> i32 {
        match self.try_wait_for_next_period().await {
            Ok(_) => 0,
            Err(error) => error.as_errno(),
        }
    }

    /// Like [`Self::wait_for_next_period`], with a typed result.
    ///
    /// The task is [`TaskState::WaitingForRelease`] while it sleeps. If this future is
    /// dropped before the release point (a timeout, `select!`, or an aborted task), the
    /// task goes back to [`TaskState::Running`] and nothing is counted, so it can wait
    /// again.
    ///
    /// # Errors
    ///
    /// - [`SchedulerError::NotPeriodic`] if `is_periodic` is not set.
    /// - [`SchedulerError::InvalidState`] if the task is not running.
    /// - [`SchedulerError::UnknownTask`] if the task is gone.
    /// - [`SchedulerError::Rejected`] if the next release point can't be represented.
    pub async fn try_wait_for_next_period(&self) -> Result<Release, SchedulerError> {
        let task_id = self.task_id;
        let plan = self.scheduler.with_record(task_id, |record| {
            if !record.params.is_periodic {
                return Err(SchedulerError::NotPeriodic { task_id });
            }
            if record.state.next(TaskEvent::WaitForNextPeriod).is_none() {
                return Err(SchedulerError::InvalidState {
                    task_id,
                    state: record.state,
                    event: TaskEvent::WaitForNextPeriod,
                });
            }
            let current = *record.current_release.get_or_insert_with(Instant::now);
            let plan = ReleasePlan::try_new(current, record.params, Instant::now())?;
            record.apply(task_id, TaskEvent::WaitForNextPeriod)?;
            Ok(plan)
        })?;

        let mut cancel_guard = CancelWaitOnDrop {
            handle: self,
            armed: true,
        };
        tokio::time::sleep_until(plan.next_release).await;
        cancel_guard.armed = false;

        self.scheduler.with_record(task_id, |record| {
            record.apply(task_id, TaskEvent::PeriodBoundary)?;
            record.apply(task_id, TaskEvent::Dispatch)?;
            if let Some(overrun) = plan.overrun {
                record.stats.missed_deadlines += 1;
                tracing::warn!(
                    message = "missed deadline",
                    task_id = %task_id,
                    name = %record.name,
                    overrun = ?overrun
                );
            }
            record.stats.skipped_releases += plan.skipped;
            record.current_release = Some(plan.next_release);
            record.stats.releases += 1;
            Ok(Release {
                index: record.stats.releases,
                at: plan.next_release,
            })
        })
    }

    /// The task is done. Its record is removed from the scheduler, and its final stats
    /// are returned.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::UnknownTask`] if it already exited.
    pub fn exit(&self) -> Result<TaskStats, SchedulerError> {
        let task_id = self.task_id;
        let mut tasks = self.scheduler.lock_tasks();
        let mut record = tasks
            .remove(&task_id)
            .ok_or(SchedulerError::UnknownTask { task_id })?;
        record.apply(task_id, TaskEvent::Exit)?;
        Ok(record.stats)
    }
}

/// Where the next release is, computed when the task starts waiting and committed only
/// once it is reached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ReleasePlan {
    next_release: Instant,
    /// How far past the deadline the release ended, if it did.
    overrun: Option<Duration>,
    /// Release points that were already in the past.
    skipped: u64,
}

impl ReleasePlan {
    /// The first release boundary after `current` that is not before `now`.
    fn try_new(
        current: Instant,
        params: SchedParams,
        now: Instant,
    ) -> Result<Self, SchedulerError> {
        let deadline = current
            .checked_add(params.deadline)
            .ok_or_else(out_of_range)?;
        let overrun = (now > deadline).then(|| now - deadline);

        let period = params.period;
        let mut next_release = current
            .checked_add(period)
            .ok_or_else(out_of_range)?;
        let mut skipped = 0;
        if next_release < now {
            let behind = (now - next_release).as_nanos();
            let periods = behind.div_ceil(period.as_nanos());
            skipped = u64::try_from(periods).map_err(|_| out_of_range())?;
            let catch_up = u32::try_from(periods)
                .ok()
                .and_then(|it| period.checked_mul(it))
                .ok_or_else(out_of_range)?;
            next_release = next_release
                .checked_add(catch_up)
                .ok_or_else(out_of_range)?;
        }

        Ok(Self {
            next_release,
            overrun,
            skipped,
        })
    }
}

fn out_of_range() -> SchedulerError {
    SchedulerError::Rejected {
        reason: "release time out of range",
    }
}

/// Puts the task back to [`TaskState::Running`] if a wait is dropped mid sleep.
#[derive(Debug)]
struct CancelWaitOnDrop<'a> {
    handle: &'a TaskHandle,
    armed: bool,
}

impl Drop for CancelWaitOnDrop<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let task_id = self.handle.task_id;
        // The task may have exited meanwhile, then there is nothing to undo.
        let _unused = self
            .handle
            .scheduler
            .with_record(task_id, |it| it.apply(task_id, TaskEvent::CancelWait));
    }
}

#[cfg(test)]
mod tests_scheduler {
    use nix::errno::Errno;
    use pretty_assertions::assert_eq;

    use super::*;

    const PERIOD: Duration = Duration::from_millis(5000);

    #[tokio::test(start_paused = true)]
    async fn test_consecutive_releases_are_a_period_apart() {
        let scheduler = PeriodicScheduler::new();
        let join_handle = scheduler.spawn("counter", |task| async move {
            let mut params = task.get_params()?;
            params.period = PERIOD;
            params.deadline = PERIOD;
            params.is_periodic = true;
            task.set_params(params)?;

            let mut stamps = vec![Instant::now()];
            for _ in 0..3 {
                assert_eq!(task.wait_for_next_period().await, 0);
                stamps.push(Instant::now());
            }
            for pair in stamps.windows(2) {
                assert!(pair[1] - pair[0] >= PERIOD);
            }
            Ok(())
        });

        let stats = join_handle.await.unwrap().unwrap();
        assert_eq!(
            stats,
            TaskStats {
                releases: 4,
                missed_deadlines: 0,
                skipped_releases: 0
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_releases_do_not_drift() {
        let scheduler = PeriodicScheduler::new();
        let task = scheduler.register("steady");
        task.dispatch().unwrap();
        task.set_params(SchedParams::periodic(PERIOD)).unwrap();
        let anchor = Instant::now();

        for index in 2..=4_u32 {
            // Some work inside the release.
            tokio::time::sleep(Duration::from_millis(1200)).await;
            let release = task.try_wait_for_next_period().await.unwrap();
            assert_eq!(release.at, anchor + PERIOD * (index - 1));
            assert_eq!(release.index, u64::from(index));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_overrun_counts_a_miss_and_skips() {
        let scheduler = PeriodicScheduler::new();
        let task = scheduler.register("slow");
        task.dispatch().unwrap();
        task.set_params(SchedParams::periodic(PERIOD)).unwrap();
        let anchor = Instant::now();

        tokio::time::sleep(Duration::from_millis(7000)).await;
        let release = task.try_wait_for_next_period().await.unwrap();

        assert_eq!(release.at, anchor + PERIOD * 2);
        let stats = scheduler.stats_of(task.id()).unwrap();
        assert_eq!(stats.missed_deadlines, 1);
        assert_eq!(stats.skipped_releases, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_deadline_miss_without_skip() {
        let scheduler = PeriodicScheduler::new();
        let task = scheduler.register("tight");
        task.dispatch().unwrap();
        task.set_params(SchedParams {
            deadline: Duration::from_millis(2000),
            ..SchedParams::periodic(PERIOD)
        })
        .unwrap();
        let anchor = Instant::now();

        tokio::time::sleep(Duration::from_millis(3000)).await;
        let release = task.try_wait_for_next_period().await.unwrap();

        assert_eq!(release.at, anchor + PERIOD);
        let stats = scheduler.stats_of(task.id()).unwrap();
        assert_eq!(stats.missed_deadlines, 1);
        assert_eq!(stats.skipped_releases, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_periodic_is_rejected() {
        let scheduler = PeriodicScheduler::new();
        let task = scheduler.register("plain");
        task.dispatch().unwrap();
        assert_eq!(task.wait_for_next_period().await, -(Errno::EINVAL as i32));
        assert_eq!(scheduler.state_of(task.id()), Some(TaskState::Running));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_params_keep_old_ones() {
        let scheduler = PeriodicScheduler::new();
        let task = scheduler.register("bad");
        let bad = SchedParams {
            deadline: PERIOD * 2,
            ..SchedParams::periodic(PERIOD)
        };
        assert!(matches!(task.set_params(bad), Err(SchedulerError::Rejected { .. })));
        assert_eq!(task.get_params().unwrap(), SchedParams::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_machine_through_a_release() {
        let scheduler = PeriodicScheduler::new();
        let task = scheduler.register("observed");
        assert_eq!(scheduler.state_of(task.id()), Some(TaskState::Ready));

        // Waiting before dispatch is not allowed.
        task.set_params(SchedParams::periodic(PERIOD)).unwrap();
        assert_eq!(task.wait_for_next_period().await, -(Errno::EPERM as i32));

        task.dispatch().unwrap();
        assert_eq!(scheduler.state_of(task.id()), Some(TaskState::Running));

        let waiter = {
            let task = task.clone();
            tokio::spawn(async move { task.wait_for_next_period().await })
        };
        tokio::task::yield_now().await;
        assert_eq!(scheduler.state_of(task.id()), Some(TaskState::WaitingForRelease));

        tokio::time::advance(PERIOD).await;
        assert_eq!(waiter.await.unwrap(), 0);
        assert_eq!(scheduler.state_of(task.id()), Some(TaskState::Running));

        task.exit().unwrap();
        assert_eq!(scheduler.state_of(task.id()), None);
        assert_eq!(task.wait_for_next_period().await, -(Errno::ESRCH as i32));
        assert!(matches!(task.exit(), Err(SchedulerError::UnknownTask { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_wait_can_wait_again() {
        let scheduler = PeriodicScheduler::new();
        let task = scheduler.register("impatient");
        task.dispatch().unwrap();
        task.set_params(SchedParams::periodic(PERIOD)).unwrap();
        let anchor = Instant::now();

        let timed_out =
            tokio::time::timeout(Duration::from_millis(10), task.wait_for_next_period()).await;
        assert!(timed_out.is_err());
        assert_eq!(scheduler.state_of(task.id()), Some(TaskState::Running));
        assert_eq!(scheduler.stats_of(task.id()).unwrap().releases, 1);

        let release = task.try_wait_for_next_period().await.unwrap();
        assert_eq!(release.at, anchor + PERIOD);
        assert_eq!(release.index, 2);
        assert_eq!(scheduler.state_of(task.id()), Some(TaskState::Running));
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_period_is_rejected_not_a_panic() {
        let scheduler = PeriodicScheduler::new();
        let task = scheduler.register("forever");
        task.dispatch().unwrap();

        let huge = Duration::from_secs(u64::MAX / 2);
        assert!(matches!(
            task.set_params(SchedParams::periodic(huge)),
            Err(SchedulerError::Rejected { .. })
        ));
        assert_eq!(task.wait_for_next_period().await, -(Errno::EINVAL as i32));
        assert_eq!(scheduler.state_of(task.id()), Some(TaskState::Running));
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_plan_out_of_range() {
        let now = Instant::now();
        let params = SchedParams {
            period: Duration::from_secs(u64::MAX / 2),
            deadline: Duration::from_secs(u64::MAX / 2),
            is_periodic: true,
            ..SchedParams::default()
        };
        assert_eq!(ReleasePlan::try_new(now, params, now), Err(out_of_range()));

        let plan = ReleasePlan::try_new(now, SchedParams::periodic(PERIOD), now + PERIOD * 3)
            .unwrap();
        assert_eq!(plan.next_release, now + PERIOD * 3);
        assert_eq!(plan.skipped, 2);
        assert_eq!(plan.overrun, Some(PERIOD * 2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exited_tasks_are_removed() {
        let scheduler = PeriodicScheduler::new();
        let join_handles: Vec<_> = (0..3)
            .map(|index| {
                scheduler.spawn(format!("short-{index}"), |task| async move {
                    task.set_params(SchedParams::periodic(PERIOD))?;
                    task.try_wait_for_next_period().await?;
                    Ok(())
                })
            })
            .collect();
        let kept = scheduler.register("kept");
        assert_eq!(scheduler.task_count(), 4);

        for join_handle in join_handles {
            assert_eq!(join_handle.await.unwrap().unwrap().releases, 2);
        }
        assert_eq!(scheduler.task_count(), 1);

        kept.exit().unwrap();
        assert_eq!(scheduler.task_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_task() {
        let scheduler = PeriodicScheduler::new();
        assert_eq!(scheduler.state_of(42), None);
        assert_eq!(scheduler.task_count(), 0);
        let task = scheduler.register("one");
        assert_eq!(scheduler.task_count(), 1);
        assert_eq!(task.id(), 0);
    }
}
