//! A [`Listener`] that emits a Chrome Trace Event stream: `B`/`E` for task start/finish, `i` for
//! events, `v` for memory snapshots. Task ids are pooled so re-entrant tasks render compactly in
//! a trace viewer.

use std::{
    collections::{HashMap, VecDeque},
    time::Instant,
};

use parking_lot::Mutex;

use crate::{
    listener::{EventScope, Listener},
    replay::Replay,
    task::{Task, TaskId},
};

struct TracerState {
    buffer: String,
    pool: VecDeque<u32>,
    next_pool_id: u32,
    assigned: HashMap<TaskId, u32>,
}

/// Buffers Chrome Trace Event JSON records. `snapshot` returns what's been written so far; the
/// stream tolerates truncation (no closing `]` is ever required).
pub struct ChromeTracer {
    start: Instant,
    state: Mutex<TracerState>,
}

impl Default for ChromeTracer {
    fn default() -> Self {
        Self::new()
    }
}

impl ChromeTracer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            state: Mutex::new(TracerState {
                buffer: String::from("[\n"),
                pool: VecDeque::new(),
                next_pool_id: 0,
                assigned: HashMap::new(),
            }),
        }
    }

    pub fn snapshot(&self) -> String {
        self.state.lock().buffer.clone()
    }

    fn micros_since_start(&self) -> u128 {
        self.start.elapsed().as_micros()
    }

    fn alloc_pool_id(&self, state: &mut TracerState, task_id: TaskId) -> u32 {
        let id = state.pool.pop_front().unwrap_or_else(|| {
            let id = state.next_pool_id;
            state.next_pool_id += 1;
            id
        });
        state.assigned.insert(task_id, id);
        id
    }

    /// Falls back to `0` for a task the tracer never saw a start record for (e.g. the synthetic
    /// process root, which predates tracer registration).
    fn pool_id_for(&self, state: &TracerState, task_id: TaskId) -> u32 {
        state.assigned.get(&task_id).copied().unwrap_or(0)
    }
}

impl Listener for ChromeTracer {
    fn on_task_start(&self, task: &Task) {
        let ts = self.micros_since_start();
        let mut state = self.state.lock();
        let pool_id = self.alloc_pool_id(&mut state, task.id);
        state.buffer.push_str(&format!(
            "{{\"name\":\"{}\",\"ph\":\"B\",\"pid\":1,\"tid\":{pool_id},\"ts\":{ts}}},\n",
            escape(&task.name),
        ));
    }

    fn on_task_finish(&self, task: &Task) {
        let ts = self.micros_since_start();
        let mut state = self.state.lock();
        let pool_id = self.pool_id_for(&state, task.id);
        state.buffer.push_str(&format!("{{\"ph\":\"E\",\"pid\":1,\"tid\":{pool_id},\"ts\":{ts}}},\n"));
        state.assigned.remove(&task.id);
        state.pool.push_back(pool_id);
    }

    fn on_event(&self, scope: EventScope, task: Option<&Task>, name: &str) {
        let ts = self.micros_since_start();
        let mut state = self.state.lock();
        let tid = task.map(|t| self.pool_id_for(&state, t.id)).unwrap_or(0);
        state.buffer.push_str(&format!(
            "{{\"name\":\"{}\",\"ph\":\"i\",\"s\":\"{}\",\"pid\":1,\"tid\":{tid},\"ts\":{ts}}},\n",
            escape(name),
            scope.chrome_trace_char(),
        ));
    }

    fn on_memory_snapshot(&self, task: &Task, label: &str, bytes: u64) {
        let ts = self.micros_since_start();
        let mut state = self.state.lock();
        let tid = self.pool_id_for(&state, task.id);
        state.buffer.push_str(&format!(
            "{{\"name\":\"{}\",\"ph\":\"v\",\"pid\":1,\"tid\":{tid},\"ts\":{ts},\"args\":{{\"bytes\":{bytes}}}}},\n",
            escape(label),
        ));
    }

    fn on_replay_status_update(
        &self,
        replay: &Replay,
        label: &str,
        total_instructions: u64,
        finished_instructions: u64,
    ) {
        let ts = self.micros_since_start();
        let mut state = self.state.lock();
        state.buffer.push_str(&format!(
            "{{\"name\":\"{}\",\"ph\":\"v\",\"pid\":1,\"tid\":0,\"ts\":{ts},\"args\":{{\"replay\":{},\"device\":\"{}\",\"total\":{total_instructions},\"finished\":{finished_instructions}}}}},\n",
            escape(label),
            replay.id.0,
            escape(&replay.device_id),
        ));
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskTree;

    #[test]
    fn start_and_finish_emit_b_and_e_records() {
        let (tree, root) = TaskTree::new();
        let tracer = std::sync::Arc::new(ChromeTracer::new());
        tree.register(tracer.clone());

        let child = root.start("load-module");
        child.finish();

        let snapshot = tracer.snapshot();
        assert!(snapshot.contains("\"ph\":\"B\""));
        assert!(snapshot.contains("\"ph\":\"E\""));
        assert!(snapshot.contains("load-module"));
    }

    #[test]
    fn pooled_task_ids_are_reused_after_finish() {
        let (tree, root) = TaskTree::new();
        let tracer = std::sync::Arc::new(ChromeTracer::new());
        tree.register(tracer.clone());

        let first = root.start("a");
        first.finish();
        let second = root.start("b");
        second.finish();

        // Both tasks should have reused pool id 0 since the first was returned to the free list
        // before the second was allocated.
        let snapshot = tracer.snapshot();
        let tid_lines: Vec<&str> = snapshot.lines().filter(|l| l.contains("\"ph\":\"B\"")).collect();
        assert_eq!(tid_lines.len(), 2);
        for line in tid_lines {
            assert!(line.contains("\"tid\":0"));
        }
    }
}
