//! The listener capability set. A listener is any type that implements a subset of these
//! callbacks; default no-op bodies mean implementors only override what they care about.

use crate::{replay::Replay, task::Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventScope {
    Task,
    Global,
    Process,
}

impl EventScope {
    pub fn chrome_trace_char(self) -> char {
        match self {
            EventScope::Task => 't',
            EventScope::Global => 'g',
            EventScope::Process => 'p',
        }
    }
}

/// Receives task tree notifications. Implementations must not block, and must not call back
/// into the tree (register/unregister a listener, or mutate a task) from within a callback —
/// doing so is a contract violation and will deadlock against the tree's own locks.
pub trait Listener: Send + Sync {
    fn on_task_start(&self, _task: &Task) {}
    fn on_task_progress(&self, _task: &Task) {}
    fn on_task_block(&self, _task: &Task) {}
    fn on_task_unblock(&self, _task: &Task) {}
    fn on_task_finish(&self, _task: &Task) {}
    fn on_event(&self, _scope: EventScope, _task: Option<&Task>, _name: &str) {}
    fn on_memory_snapshot(&self, _task: &Task, _label: &str, _bytes: u64) {}
    fn on_replay_status_update(
        &self,
        _replay: &Replay,
        _label: &str,
        _total_instructions: u64,
        _finished_instructions: u64,
    ) {
    }
}
