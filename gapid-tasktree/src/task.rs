//! [`Task`] nodes, the [`TaskTree`] that owns them, and the [`TaskContext`] cursor handed to
//! callers by `Start`.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
    time::Instant,
};

use parking_lot::{Mutex, RwLock};

use crate::{
    listener::{EventScope, Listener},
    replay::Replay,
};

/// Monotonic task identifier. `TaskId(0)` is always the synthetic process root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

struct TaskState {
    completion: f64,
    blocked: bool,
    finished: bool,
    children: Vec<TaskId>,
}

/// A node in the task tree. Accessor methods take a snapshot of the mutable state under lock.
pub struct Task {
    pub id: TaskId,
    pub name: Box<str>,
    pub parent: Option<TaskId>,
    pub started_at: Instant,
    pub background: bool,
    state: Mutex<TaskState>,
}

impl Task {
    pub fn completion(&self) -> f64 {
        self.state.lock().completion
    }

    pub fn is_blocked(&self) -> bool {
        self.state.lock().blocked
    }

    pub fn is_finished(&self) -> bool {
        self.state.lock().finished
    }

    pub fn children(&self) -> Vec<TaskId> {
        self.state.lock().children.clone()
    }
}

struct Shared {
    next_task_id: AtomicU64,
    next_listener_id: AtomicU64,
    tasks: RwLock<HashMap<TaskId, std::sync::Arc<Task>>>,
    listeners: RwLock<Vec<(u64, std::sync::Arc<dyn Listener>)>>,
    replay: Mutex<Option<std::sync::Arc<Replay>>>,
}

/// Owns every live [`Task`] and the listener registry. Cheap to clone — it's a handle around
/// shared state, like the tracer/registry types it's modeled on.
#[derive(Clone)]
pub struct TaskTree(std::sync::Arc<Shared>);

/// A handle that identifies "the currently active task" for a caller. Returned by
/// [`TaskTree::new`] (the process root) and by [`TaskContext::start`] (every child).
#[derive(Clone)]
pub struct TaskContext {
    tree: TaskTree,
    task_id: TaskId,
}

/// Detach handle for a registered [`Listener`]. Holds only a weak reference back into the
/// registry, so a listener that outlives the tree doesn't keep the tree itself alive and the
/// registry doesn't need to know about listeners that were simply dropped.
pub struct ListenerHandle {
    tree: std::sync::Weak<Shared>,
    id: u64,
}

impl ListenerHandle {
    pub fn detach(self) {
        if let Some(shared) = self.tree.upgrade() {
            shared.listeners.write().retain(|(id, _)| *id != self.id);
        }
    }
}

impl TaskTree {
    /// Creates a new tree with a synthetic process-root task, returning a context positioned at
    /// that root.
    pub fn new() -> (Self, TaskContext) {
        let root_id = TaskId(0);
        let root = Task {
            id: root_id,
            name: "process-root".into(),
            parent: None,
            started_at: Instant::now(),
            background: false,
            state: Mutex::new(TaskState {
                completion: 0.0,
                blocked: false,
                finished: false,
                children: Vec::new(),
            }),
        };
        let mut tasks = HashMap::new();
        tasks.insert(root_id, std::sync::Arc::new(root));

        let shared = std::sync::Arc::new(Shared {
            next_task_id: AtomicU64::new(1),
            next_listener_id: AtomicU64::new(0),
            tasks: RwLock::new(tasks),
            listeners: RwLock::new(Vec::new()),
            replay: Mutex::new(None),
        });
        let tree = TaskTree(shared);
        let ctx = TaskContext { tree: tree.clone(), task_id: root_id };
        (tree, ctx)
    }

    pub fn register(&self, listener: std::sync::Arc<dyn Listener>) -> ListenerHandle {
        let id = self.0.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.0.listeners.write().push((id, listener));
        ListenerHandle { tree: std::sync::Arc::downgrade(&self.0), id }
    }

    fn notify(&self, f: impl Fn(&dyn Listener)) {
        for (_, listener) in self.0.listeners.read().iter() {
            f(listener.as_ref());
        }
    }

    fn task(&self, id: TaskId) -> std::sync::Arc<Task> {
        self.0
            .tasks
            .read()
            .get(&id)
            .cloned()
            .expect("TaskId from a live TaskContext must reference a live task")
    }

    /// Replaces the tree's [`Replay`] object, notifying listeners of the update per their
    /// `on_replay_status_update` capability.
    pub fn set_replay(&self, replay: Replay) {
        *self.0.replay.lock() = Some(std::sync::Arc::new(replay));
    }

    pub fn replay_status_update(&self, label: &str, total: u64, finished: u64) {
        let replay = self.0.replay.lock().clone();
        if let Some(replay) = replay {
            self.notify(|l| l.on_replay_status_update(&replay, label, total, finished));
        }
    }
}

impl TaskContext {
    pub fn tree(&self) -> &TaskTree {
        &self.tree
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    pub fn task(&self) -> std::sync::Arc<Task> {
        self.tree.task(self.task_id)
    }

    /// Creates a child task of the task this context is positioned at and returns a context
    /// positioned at the new child.
    pub fn start(&self, name: impl Into<Box<str>>) -> TaskContext {
        self.start_with_background(name, false)
    }

    pub fn start_with_background(&self, name: impl Into<Box<str>>, background: bool) -> TaskContext {
        let id = TaskId(self.tree.0.next_task_id.fetch_add(1, Ordering::Relaxed));
        let task = Task {
            id,
            name: name.into(),
            parent: Some(self.task_id),
            started_at: Instant::now(),
            background,
            state: Mutex::new(TaskState {
                completion: 0.0,
                blocked: false,
                finished: false,
                children: Vec::new(),
            }),
        };
        let task = std::sync::Arc::new(task);

        self.tree.task(self.task_id).state.lock().children.push(id);
        self.tree.0.tasks.write().insert(id, task.clone());

        self.tree.notify(|l| l.on_task_start(&task));
        TaskContext { tree: self.tree.clone(), task_id: id }
    }

    /// Emits the finish notification, unlinks this task from its parent, and drops it from the
    /// tree. Calling `finish` a second time on the same context is a contract violation.
    pub fn finish(&self) {
        let task = self.task();
        {
            let mut state = task.state.lock();
            assert!(!state.finished, "Finish called on a task that was already finished");
            state.finished = true;
        }

        if let Some(parent_id) = task.parent {
            let parent = self.tree.task(parent_id);
            parent.state.lock().children.retain(|c| *c != self.task_id);
        }

        self.tree.notify(|l| l.on_task_finish(&task));
        self.tree.0.tasks.write().remove(&self.task_id);
    }

    pub fn update_progress(&self, n: u64, out_of: u64) {
        assert!(out_of > 0, "UpdateProgress out_of must be greater than zero");
        let task = self.task();
        {
            let mut state = task.state.lock();
            assert!(!state.finished, "UpdateProgress called on a finished task");
            state.completion = (n as f64 / out_of as f64).clamp(0.0, 1.0);
        }
        self.tree.notify(|l| l.on_task_progress(&task));
    }

    pub fn block(&self) {
        let task = self.task();
        {
            let mut state = task.state.lock();
            assert!(!state.finished, "Block called on a finished task");
            assert!(!state.blocked, "Block called on an already-blocked task");
            state.blocked = true;
        }
        self.tree.notify(|l| l.on_task_block(&task));
    }

    pub fn unblock(&self) {
        let task = self.task();
        {
            let mut state = task.state.lock();
            assert!(!state.finished, "Unblock called on a finished task");
            assert!(state.blocked, "Unblock called on a task that was not blocked");
            state.blocked = false;
        }
        self.tree.notify(|l| l.on_task_unblock(&task));
    }

    pub fn event(&self, scope: EventScope, name: &str) {
        let task = match scope {
            EventScope::Task => Some(self.task()),
            EventScope::Global | EventScope::Process => None,
        };
        self.tree.notify(|l| l.on_event(scope, task.as_deref(), name));
    }

    pub fn memory_snapshot(&self, label: &str, bytes: u64) {
        let task = self.task();
        self.tree.notify(|l| l.on_memory_snapshot(&task, label, bytes));
    }
}
