use derive_more::Display;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("task#{_0}")]
pub struct TaskHandle(u64);

/// Deferred work for the input thread. Tasks run in due order when the owner
/// drains them with [`Scheduler::pop_due`]; nothing here sleeps or spawns.
#[derive(Debug)]
pub struct Scheduler<T> {
    next_id: u64,
    queue: BTreeMap<(Instant, u64), T>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            queue: BTreeMap::new(),
        }
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&mut self, now: Instant, task: T) -> TaskHandle {
        self.post_delayed(now, Duration::ZERO, task)
    }

    pub fn post_delayed(&mut self, now: Instant, delay: Duration, task: T) -> TaskHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.queue.insert((now + delay, id), task);
        TaskHandle(id)
    }

    /// Returns `true` if the task was still pending.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        let key = self.queue.keys().find(|(_, id)| *id == handle.0).copied();
        key.and_then(|key| self.queue.remove(&key)).is_some()
    }

    pub fn is_pending(&self, handle: TaskHandle) -> bool {
        self.queue.keys().any(|(_, id)| *id == handle.0)
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.queue.keys().next().map(|(due, _)| *due)
    }

    pub fn pop_due(&mut self, now: Instant) -> Option<(TaskHandle, T)> {
        let (due, id) = *self.queue.keys().next()?;
        if due > now {
            return None;
        }
        self.queue
            .remove(&(due, id))
            .map(|task| (TaskHandle(id), task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runs_in_due_order() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.post_delayed(t0, Duration::from_millis(16), "late");
        scheduler.post(t0, "now");
        scheduler.post_delayed(t0, Duration::from_millis(8), "soon");

        assert_eq!(scheduler.pop_due(t0).map(|(_, t)| t), Some("now"));
        assert!(scheduler.pop_due(t0).is_none());

        let later = t0 + Duration::from_millis(20);
        assert_eq!(scheduler.pop_due(later).map(|(_, t)| t), Some("soon"));
        assert_eq!(scheduler.pop_due(later).map(|(_, t)| t), Some("late"));
        assert_eq!(scheduler.next_due(), None);
    }

    #[test]
    fn test_cancel_by_handle() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        let keep = scheduler.post(t0, 1);
        let drop = scheduler.post(t0, 2);

        assert!(scheduler.cancel(drop));
        assert!(!scheduler.cancel(drop));
        assert!(scheduler.is_pending(keep));
        assert!(!scheduler.is_pending(drop));

        assert_eq!(scheduler.pop_due(t0), Some((keep, 1)));
        assert_eq!(scheduler.next_due(), None);
    }
}
