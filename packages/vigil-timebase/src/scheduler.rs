use std::time::Instant;

use thiserror::Error;
use tracing::trace;

pub const MAX_TASKS: usize = 16;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("no slot available for task registration")]
    NoSlot,
    #[error("a task named '{0}' is already registered")]
    DuplicateName,
}

struct Task {
    name: String,
    interval_ms: u64,
    last_run_ms: u64,
    max_duration_ms: u64,
}

/// Cooperative, non-preemptive scheduler for up to [`MAX_TASKS`] named
/// periodic callbacks. Callers drive it with [`Scheduler::tick`]; tasks are
/// run synchronously on the calling thread and must not block.
#[derive(Default)]
pub struct Scheduler {
    tasks: Vec<Task>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    pub fn register(
        &mut self,
        name: &str,
        interval_ms: u64,
        now_ms: u64,
    ) -> Result<(), SchedulerError> {
        if self.tasks.iter().any(|t| t.name == name) {
            return Err(SchedulerError::DuplicateName);
        }
        if self.tasks.len() >= MAX_TASKS {
            return Err(SchedulerError::NoSlot);
        }
        self.tasks.push(Task {
            name: name.to_string(),
            interval_ms,
            last_run_ms: now_ms,
            max_duration_ms: 0,
        });
        Ok(())
    }

    /// Runs every task whose interval has elapsed, invoking `run` with the
    /// task's name. `run` is given the task name only; it is expected to
    /// look up whatever state it closed over. `now_ms` only decides which
    /// tasks are due; a task's observed duration is measured with a real
    /// monotonic clock read around the call, since `now_ms` is fixed for the
    /// whole tick and can't see time spent inside `run`.
    pub fn tick(&mut self, now_ms: u64, mut run: impl FnMut(&str)) {
        for task in &mut self.tasks {
            if now_ms.saturating_sub(task.last_run_ms) >= task.interval_ms {
                let start = Instant::now();
                run(&task.name);
                let duration = start.elapsed().as_millis() as u64;
                if duration > task.max_duration_ms {
                    task.max_duration_ms = duration;
                }
                task.last_run_ms = now_ms;
                trace!(task = task.name.as_str(), "scheduler task ran");
            }
        }
    }

    pub fn max_duration_ms(&self, name: &str) -> Option<u64> {
        self.tasks
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.max_duration_ms)
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
    use std::cell::RefCell;

    #[test]
    fn duplicate_name_rejected() {
        let mut s = Scheduler::new();
        s.register("a", 100, 0).unwrap();
        assert_eq!(s.register("a", 100, 0), Err(SchedulerError::DuplicateName));
    }

    #[test]
    fn full_table_rejects_registration() {
        let mut s = Scheduler::new();
        for i in 0..MAX_TASKS {
            s.register(&format!("t{i}"), 100, 0).unwrap();
        }
        assert_eq!(s.register("overflow", 100, 0), Err(SchedulerError::NoSlot));
    }

    #[test]
    fn tick_runs_only_due_tasks() {
        let mut s = Scheduler::new();
        s.register("fast", 10, 0).unwrap();
        s.register("slow", 1000, 0).unwrap();
        let ran = RefCell::new(Vec::new());
        s.tick(10, |name| ran.borrow_mut().push(name.to_string()));
        assert_eq!(ran.into_inner(), vec!["fast".to_string()]);
    }

    #[test]
    fn max_duration_tracks_the_slowest_observed_run() {
        let mut s = Scheduler::new();
        s.register("task", 10, 0).unwrap();
        assert_eq!(s.max_duration_ms("task"), Some(0));

        s.tick(10, |_| std::thread::sleep(std::time::Duration::from_millis(15)));
        let first = s.max_duration_ms("task").unwrap();
        assert!(first >= 15, "expected >= 15ms, got {first}");

        // A faster run afterwards must not lower the recorded max.
        s.tick(20, |_| {});
        assert_eq!(s.max_duration_ms("task"), Some(first));
    }
}
