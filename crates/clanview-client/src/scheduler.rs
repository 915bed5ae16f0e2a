//! Deterministic timer store.
//!
//! Components never sleep; they register deadlines here and the driver
//! delivers whatever is due. Tests advance an explicit [`Instant`] instead
//! of waiting on a real clock.

use std::collections::BTreeMap;
use std::time::Instant;

/// What a timer is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    ReconnectAttempt,
    Heartbeat,
    ApplyParameters,
    Analytics,
}

/// Opaque handle used to cancel a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(u64);

#[derive(Debug, Default)]
pub struct Scheduler {
    next_id: u64,
    tasks: BTreeMap<TaskHandle, (Instant, TimerKind)>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, at: Instant, kind: TimerKind) -> TaskHandle {
        let handle = TaskHandle(self.next_id);
        self.next_id += 1;
        self.tasks.insert(handle, (at, kind));
        handle
    }

    /// Returns false if the task already fired or was cancelled.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        self.tasks.remove(&handle).is_some()
    }

    pub fn is_pending(&self, handle: TaskHandle) -> bool {
        self.tasks.contains_key(&handle)
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.tasks.values().map(|(at, _)| *at).min()
    }

    /// Remove and return every task due at `now`, earliest first.
    ///
    /// Tasks scheduled while the result is being handled are not included,
    /// even if already due.
    pub fn take_due(&mut self, now: Instant) -> Vec<(TaskHandle, TimerKind)> {
        let mut due: Vec<(Instant, TaskHandle, TimerKind)> = self
            .tasks
            .iter()
            .filter(|(_, (at, _))| *at <= now)
            .map(|(handle, (at, kind))| (*at, *handle, *kind))
            .collect();
        due.sort_by_key(|(at, handle, _)| (*at, *handle));

        for (_, handle, _) in &due {
            self.tasks.remove(handle);
        }
        due.into_iter().map(|(_, handle, kind)| (handle, kind)).collect()
    }

    /// Number of pending tasks of `kind`.
    pub fn pending(&self, kind: TimerKind) -> usize {
        self.tasks.values().filter(|(_, k)| *k == kind).count()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn due_tasks_come_out_in_deadline_order() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        let late = scheduler.schedule(t0 + Duration::from_secs(3), TimerKind::Heartbeat);
        let early = scheduler.schedule(t0 + Duration::from_secs(1), TimerKind::ReconnectAttempt);
        scheduler.schedule(t0 + Duration::from_secs(10), TimerKind::Analytics);

        assert_eq!(scheduler.next_deadline(), Some(t0 + Duration::from_secs(1)));
        assert!(scheduler.take_due(t0).is_empty());

        let due = scheduler.take_due(t0 + Duration::from_secs(5));
        assert_eq!(
            due,
            vec![(early, TimerKind::ReconnectAttempt), (late, TimerKind::Heartbeat)]
        );
        assert_eq!(scheduler.len(), 1);
        assert!(!scheduler.is_pending(early));
    }

    #[test]
    fn cancelled_tasks_never_fire() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        let handle = scheduler.schedule(t0, TimerKind::ApplyParameters);

        assert!(scheduler.cancel(handle));
        assert!(!scheduler.cancel(handle));
        assert!(scheduler.take_due(t0 + Duration::from_secs(1)).is_empty());
        assert_eq!(scheduler.next_deadline(), None);
    }

    #[test]
    fn pending_counts_by_kind() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.schedule(t0, TimerKind::Heartbeat);
        scheduler.schedule(t0, TimerKind::Heartbeat);
        scheduler.schedule(t0, TimerKind::Analytics);
        assert_eq!(scheduler.pending(TimerKind::Heartbeat), 2);
        assert_eq!(scheduler.pending(TimerKind::ReconnectAttempt), 0);
    }
}
