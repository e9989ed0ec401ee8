//! The `Replay` side object: tracks a device-bound replay session in parallel with the task
//! tree, guarded by its own lock.

use parking_lot::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReplayId(pub u64);

#[derive(Debug)]
struct ReplayState {
    started: bool,
    finished: bool,
}

/// `{id, device, started, finished}`, guarded by its own reader/writer lock so replay status
/// updates don't contend with task-tree mutation.
#[derive(Debug)]
pub struct Replay {
    pub id: ReplayId,
    pub device_id: Box<str>,
    state: RwLock<ReplayState>,
}

impl Replay {
    pub fn new(id: ReplayId, device_id: impl Into<Box<str>>) -> Self {
        Self {
            id,
            device_id: device_id.into(),
            state: RwLock::new(ReplayState { started: false, finished: false }),
        }
    }

    pub fn mark_started(&self) {
        self.state.write().started = true;
    }

    pub fn mark_finished(&self) {
        self.state.write().finished = true;
    }

    pub fn started(&self) -> bool {
        self.state.read().started
    }

    pub fn finished(&self) -> bool {
        self.state.read().finished
    }
}
