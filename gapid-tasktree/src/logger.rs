//! A [`Listener`] that logs one line per task start/finish, and throttles progress logging to at
//! most once per `interval` of wall-clock time per task.

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use parking_lot::Mutex;

use crate::{listener::Listener, task::TaskId};

pub struct ThrottledLogger {
    interval: Duration,
    last_progress_log: Mutex<HashMap<TaskId, Instant>>,
}

impl ThrottledLogger {
    pub fn new(interval: Duration) -> Self {
        Self { interval, last_progress_log: Mutex::new(HashMap::new()) }
    }
}

impl Listener for ThrottledLogger {
    fn on_task_start(&self, task: &crate::task::Task) {
        tracing::info!(task = %task.name, "task started");
    }

    fn on_task_finish(&self, task: &crate::task::Task) {
        self.last_progress_log.lock().remove(&task.id);
        tracing::info!(task = %task.name, "task finished");
    }

    fn on_task_progress(&self, task: &crate::task::Task) {
        let now = Instant::now();
        let mut last = self.last_progress_log.lock();
        let should_log = match last.get(&task.id) {
            Some(prev) => now.duration_since(*prev) >= self.interval,
            None => true,
        };
        if should_log {
            last.insert(task.id, now);
            drop(last);
            tracing::debug!(task = %task.name, completion = task.completion(), "task progress");
        }
    }
}
