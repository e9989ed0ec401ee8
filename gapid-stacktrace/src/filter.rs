//! `Matcher` predicates over [`Frame`] and the `Filter`s built from them.

use crate::frame::{Callstack, Frame};

pub trait Matcher {
    fn matches(&self, frame: &Frame) -> bool;
}

impl<F: Fn(&Frame) -> bool> Matcher for F {
    fn matches(&self, frame: &Frame) -> bool {
        self(frame)
    }
}

/// Matches a frame whose resolved function name contains `needle`.
pub struct FunctionContains(pub Box<str>);

impl Matcher for FunctionContains {
    fn matches(&self, frame: &Frame) -> bool {
        frame.function.as_deref().is_some_and(|f| f.contains(self.0.as_ref()))
    }
}

/// Matches a frame whose resolved package name equals `name`.
pub struct PackageIs(pub Box<str>);

impl Matcher for PackageIs {
    fn matches(&self, frame: &Frame) -> bool {
        frame.package.as_deref() == Some(self.0.as_ref())
    }
}

/// Matches only if every inner matcher matches. Boxed so callers can combine matchers of
/// different concrete types in one `And`.
pub struct And(pub Vec<Box<dyn Matcher>>);

impl Matcher for And {
    fn matches(&self, frame: &Frame) -> bool {
        self.0.iter().all(|m| m.matches(frame))
    }
}

pub trait Filter {
    fn apply(&self, callstack: &Callstack) -> Callstack;
}

/// Drops leading frames until `matcher` matches; if it never matches, the whole stack is
/// dropped.
pub struct TrimTop<M>(pub M);

impl<M: Matcher> Filter for TrimTop<M> {
    fn apply(&self, callstack: &Callstack) -> Callstack {
        match callstack.frames().iter().position(|f| self.0.matches(f)) {
            Some(i) => Callstack(callstack.frames()[i..].to_vec()),
            None => Callstack(Vec::new()),
        }
    }
}

/// Drops trailing frames past the last frame `matcher` matches; if it never matches, the whole
/// stack is dropped.
pub struct TrimBottom<M>(pub M);

impl<M: Matcher> Filter for TrimBottom<M> {
    fn apply(&self, callstack: &Callstack) -> Callstack {
        match callstack.frames().iter().rposition(|f| self.0.matches(f)) {
            Some(i) => Callstack(callstack.frames()[..=i].to_vec()),
            None => Callstack(Vec::new()),
        }
    }
}

/// `TrimTop(m) ∘ TrimBottom(m)`: keeps the run of frames from the first match through the last.
pub struct Trim<M>(pub M);

impl<M: Matcher> Filter for Trim<M> {
    fn apply(&self, callstack: &Callstack) -> Callstack {
        let kept_end = match callstack.frames().iter().rposition(|f| self.0.matches(f)) {
            Some(i) => &callstack.frames()[..=i],
            None => return Callstack(Vec::new()),
        };
        match kept_end.iter().position(|f| self.0.matches(f)) {
            Some(i) => Callstack(kept_end[i..].to_vec()),
            None => Callstack(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_named(name: &str) -> Frame {
        Frame { function: Some(name.into()), ..Default::default() }
    }

    fn is_named(name: &'static str) -> impl Fn(&Frame) -> bool {
        move |f: &Frame| f.function.as_deref() == Some(name)
    }

    #[test]
    fn property_9_trim_top_is_identity_when_deepest_frame_matches() {
        let cs = Callstack(vec![frame_named("deepest"), frame_named("mid"), frame_named("top")]);
        let trimmed = TrimTop(is_named("deepest")).apply(&cs);
        assert_eq!(trimmed, cs);
    }

    #[test]
    fn property_9_trim_is_prefix_suffix_trimmed_subsequence() {
        let cs = Callstack(vec![
            frame_named("runtime_entry"),
            frame_named("user_main"),
            frame_named("user_helper"),
            frame_named("panic_handler"),
        ]);
        let trimmed = Trim(is_named("user_main")).apply(&cs);
        assert_eq!(trimmed.frames(), &cs.frames()[1..2]);
    }

    #[test]
    fn trim_bottom_keeps_up_to_last_match() {
        let cs = Callstack(vec![frame_named("a"), frame_named("b"), frame_named("a"), frame_named("c")]);
        let trimmed = TrimBottom(is_named("a")).apply(&cs);
        assert_eq!(trimmed.frames(), &cs.frames()[..3]);
    }

    #[test]
    fn and_requires_every_matcher() {
        let frame = Frame { function: Some("foo".into()), package: Some("pkg".into()), ..Default::default() };
        assert!(And(vec![Box::new(FunctionContains("foo".into()))]).matches(&frame));
        assert!(
            !And(vec![Box::new(FunctionContains("foo".into())), Box::new(PackageIs("other".into()))])
                .matches(&frame)
        );
    }
}
