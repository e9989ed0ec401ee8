//! Hierarchical task progress tracking with a listener bus.
//!
//! [`TaskTree`] owns a tree of [`task::Task`] nodes rooted at a synthetic process root;
//! [`TaskContext`] is the cursor callers use to `start`/`finish`/`update_progress`/`block`/
//! `unblock`/emit an `event` against "the current task". Every notification fans out to a
//! registered [`listener::Listener`] set; [`tracer::ChromeTracer`] and [`logger::ThrottledLogger`]
//! are the two built-in listeners.

pub mod cancellation;
pub mod listener;
pub mod logger;
pub mod replay;
pub mod task;
pub mod tracer;

pub use cancellation::CancellationToken;
pub use listener::{EventScope, Listener};
pub use logger::ThrottledLogger;
pub use replay::{Replay, ReplayId};
pub use task::{ListenerHandle, Task, TaskContext, TaskId, TaskTree};
pub use tracer::ChromeTracer;

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc, Mutex,
        },
        thread,
    };

    use super::*;

    #[derive(Default)]
    struct RecordingListener {
        starts: Mutex<Vec<String>>,
        finishes: Mutex<Vec<String>>,
    }

    impl Listener for RecordingListener {
        fn on_task_start(&self, task: &Task) {
            self.starts.lock().unwrap().push(task.name.to_string());
        }

        fn on_task_finish(&self, task: &Task) {
            self.finishes.lock().unwrap().push(task.name.to_string());
        }
    }

    #[test]
    fn property_8_nested_start_finish_calls_are_reverse_matched() {
        let (tree, root) = TaskTree::new();
        let recorder = Arc::new(RecordingListener::default());
        tree.register(recorder.clone());

        let t1 = root.start("n1");
        let t2 = t1.start("n2");
        t2.finish();
        t1.finish();

        assert_eq!(*recorder.starts.lock().unwrap(), vec!["n1", "n2"]);
        assert_eq!(*recorder.finishes.lock().unwrap(), vec!["n2", "n1"]);
        assert!(root.task().children().is_empty());
    }

    #[test]
    fn update_progress_between_start_and_finish_targets_the_active_task() {
        #[derive(Default)]
        struct ProgressSpy {
            seen: Mutex<Vec<(String, f64)>>,
        }
        impl Listener for ProgressSpy {
            fn on_task_progress(&self, task: &Task) {
                self.seen.lock().unwrap().push((task.name.to_string(), task.completion()));
            }
        }

        let (tree, root) = TaskTree::new();
        let spy = Arc::new(ProgressSpy::default());
        tree.register(spy.clone());

        let t = root.start("work");
        t.update_progress(1, 4);
        t.update_progress(2, 4);
        t.finish();

        let seen = spy.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|(name, _)| name == "work"));
        assert_eq!(seen[0].1, 0.25);
        assert_eq!(seen[1].1, 0.5);
    }

    #[test]
    #[should_panic(expected = "already finished")]
    fn finish_without_matching_start_context_panics() {
        let (_tree, root) = TaskTree::new();
        let t = root.start("once");
        t.finish();
        t.finish();
    }

    #[test]
    #[should_panic(expected = "not blocked")]
    fn unblock_without_block_panics() {
        let (_tree, root) = TaskTree::new();
        let t = root.start("x");
        t.unblock();
    }

    #[test]
    fn s6_sixteen_threads_start_and_finish_children_concurrently() {
        let (tree, root) = TaskTree::new();
        let counter = Arc::new(AtomicUsize::new(0));
        struct CountingListener(Arc<AtomicUsize>);
        impl Listener for CountingListener {
            fn on_task_finish(&self, _task: &Task) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
        tree.register(Arc::new(CountingListener(counter.clone())));

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let root = root.clone();
                thread::spawn(move || {
                    let t = root.start(format!("thread-{i}"));
                    for n in 0..10 {
                        t.update_progress(n, 10);
                    }
                    t.finish();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(counter.load(Ordering::SeqCst), 16);
        assert!(root.task().children().is_empty());
    }

    #[test]
    fn listener_handle_detach_stops_future_notifications() {
        let (tree, root) = TaskTree::new();
        let recorder = Arc::new(RecordingListener::default());
        let handle = tree.register(recorder.clone());

        root.start("before-detach");
        handle.detach();
        root.start("after-detach");

        assert_eq!(*recorder.starts.lock().unwrap(), vec!["before-detach"]);
    }
}
