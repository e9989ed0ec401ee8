//! Capturing and resolving native callstacks, behind traits so the rest of the crate is testable
//! without a real unwinder.

use std::os::raw::c_void;

use crate::frame::{Callstack, Frame};

pub trait Capturer {
    fn capture(&self) -> Callstack;
}

pub trait Resolver {
    fn resolve(&self, callstack: &Callstack) -> Callstack;
}

/// Captures via [`backtrace::trace`], which walks outward from the caller — deepest frame
/// first.
pub struct BacktraceCapturer;

impl Capturer for BacktraceCapturer {
    fn capture(&self) -> Callstack {
        let mut frames = Vec::new();
        backtrace::trace(|frame| {
            frames.push(Frame::with_pc(frame.ip() as u64));
            true
        });
        Callstack(frames)
    }
}

/// Resolves each frame's `pc` against the process's loaded symbol tables via
/// [`backtrace::resolve`].
pub struct BacktraceResolver;

impl Resolver for BacktraceResolver {
    fn resolve(&self, callstack: &Callstack) -> Callstack {
        let frames = callstack
            .frames()
            .iter()
            .map(|frame| {
                let mut resolved = frame.clone();
                backtrace::resolve(frame.pc as *mut c_void, |symbol| {
                    if let Some(name) = symbol.name() {
                        resolved.function = Some(name.to_string().into_boxed_str());
                    }
                    if let Some(file) = symbol.filename() {
                        let path = file.to_string_lossy();
                        resolved.dir =
                            file.parent().map(|p| p.to_string_lossy().into_owned().into_boxed_str());
                        resolved.file = Some(
                            file.file_name()
                                .map(|n| n.to_string_lossy().into_owned())
                                .unwrap_or_else(|| path.into_owned())
                                .into_boxed_str(),
                        );
                    }
                    resolved.line = symbol.lineno();
                });
                resolved
            })
            .collect();
        Callstack(frames)
    }
}
