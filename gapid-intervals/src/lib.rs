//! Ordered, non-overlapping spans over a `u64` key space, carrying arbitrary per-span values.
//!
//! [`Store`] is a flat `Vec<Entry<V>>` sorted by `start`, kept disjoint and free of
//! equal-valued adjacent entries at all times. Binary search over the `Vec` meets the
//! `O(log n + k)` complexity target without a tree of boxed nodes.

use std::cmp::Ordering;

/// A half-open `[start, end)` range. `start < end` always holds; violating it is a programmer
/// error, not a recoverable condition, so construction panics rather than returning a `Result`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: u64,
    pub end: u64,
}

impl Span {
    pub fn new(start: u64, end: u64) -> Self {
        assert!(start < end, "span start {start} must be < end {end}");
        Self { start, end }
    }

    /// Fallible counterpart to [`Span::new`] for callers that receive span bounds from
    /// untrusted input rather than from their own logic.
    pub fn try_new(start: u64, end: u64) -> Result<Self, IntervalError> {
        if start < end { Ok(Self { start, end }) } else { Err(IntervalError::InvalidSpan { start, end }) }
    }

    fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum IntervalError {
    #[error("span start {start} must be < end {end}")]
    InvalidSpan { start: u64, end: u64 },
}

/// An `(span, value)` pair. Values are opaque to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<V> {
    pub span: Span,
    pub value: V,
}

/// An ordered, non-overlapping span store. See the module docs for the invariants it maintains.
#[derive(Debug, Clone)]
pub struct Store<V> {
    entries: Vec<Entry<V>>,
}

impl<V> Default for Store<V> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<V> Store<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Entry<V>] {
        &self.entries
    }

    pub fn contains(&self, key: u64) -> bool {
        self.index_of(key).is_some()
    }

    pub fn index_of(&self, key: u64) -> Option<usize> {
        let idx = self.entries.partition_point(|e| e.span.end <= key);
        let entry = self.entries.get(idx)?;
        (entry.span.start <= key && key < entry.span.end).then_some(idx)
    }

    /// Smallest index whose span satisfies `pred`, or `self.len()` if none does. `pred` must be
    /// monotone over the store's sorted spans — once true, it stays true for every later span.
    /// Violating monotonicity is a contract violation: in debug builds it is caught and panics;
    /// in release builds the result is simply wrong.
    pub fn search(&self, pred: impl Fn(Span) -> bool) -> usize {
        let idx = self.entries.partition_point(|e| !pred(e.span));

        #[cfg(debug_assertions)]
        {
            for (i, e) in self.entries.iter().enumerate() {
                let expected = i >= idx;
                assert_eq!(
                    pred(e.span),
                    expected,
                    "non-monotone predicate passed to Store::search at index {i}"
                );
            }
        }

        idx
    }

    /// `(first_index, count)` of entries overlapping `span`.
    pub fn intersect(&self, span: Span) -> (usize, usize) {
        let (first, last) = self.overlap_range(span);
        (first, last - first)
    }

    fn overlap_range(&self, span: Span) -> (usize, usize) {
        let first = self.entries.partition_point(|e| e.span.end <= span.start);
        let mut last = first;
        while last < self.entries.len() && self.entries[last].span.start < span.end {
            last += 1;
        }
        (first, last)
    }

    /// Merges entry value equality at `idx`/`idx+1` and `idx-1`/`idx` if they're adjacent with
    /// equal values, maintaining the no-adjacent-equal-values invariant. Returns the index the
    /// surviving merged entry (if any) now sits at.
    fn coalesce_around(&mut self, mut idx: usize) -> usize
    where
        V: PartialEq,
    {
        if idx > 0 {
            let merge = {
                let left = &self.entries[idx - 1];
                let right = &self.entries[idx];
                left.span.end == right.span.start && left.value == right.value
            };
            if merge {
                let right_end = self.entries[idx].span.end;
                self.entries[idx - 1].span.end = right_end;
                self.entries.remove(idx);
                idx -= 1;
            }
        }
        if idx + 1 < self.entries.len() {
            let merge = {
                let left = &self.entries[idx];
                let right = &self.entries[idx + 1];
                left.span.end == right.span.start && left.value == right.value
            };
            if merge {
                let right_end = self.entries[idx + 1].span.end;
                self.entries[idx].span.end = right_end;
                self.entries.remove(idx + 1);
            }
        }
        idx
    }

    /// Inserts `span` with `value`, coalescing any overlap. When `join_adjacent` is set, spans
    /// that merely touch `span` (but don't overlap it) are absorbed too, regardless of their
    /// value; the whole union gets `value`.
    pub fn merge(&mut self, span: Span, value: V, join_adjacent: bool) -> usize
    where
        V: PartialEq,
    {
        let (mut first, mut last) = self.overlap_range(span);

        if join_adjacent && last - first == 1 && self.entries[first].span == span {
            return first;
        }

        let mut start = span.start;
        let mut end = span.end;

        if join_adjacent {
            if first > 0 && self.entries[first - 1].span.end == start {
                first -= 1;
                start = self.entries[first].span.start;
            }
            if last < self.entries.len() && self.entries[last].span.start == end {
                end = self.entries[last].span.end;
                last += 1;
            }
        }

        self.entries.splice(first..last, std::iter::once(Entry { span: Span::new(start, end), value }));
        self.coalesce_around(first)
    }

    /// Cuts any overlap with `span` out of existing entries (trimming or splitting them), then
    /// inserts `span` with `value` as a fresh entry. Returns its index.
    pub fn replace(&mut self, span: Span, value: V) -> usize
    where
        V: Clone + PartialEq,
    {
        let (first, last) = self.overlap_range(span);

        let mut replacement = Vec::with_capacity(3);
        if first < last {
            let left = &self.entries[first];
            if left.span.start < span.start {
                replacement.push(Entry { span: Span::new(left.span.start, span.start), value: left.value.clone() });
            }
        }
        replacement.push(Entry { span, value });
        if first < last {
            let right = &self.entries[last - 1];
            if right.span.end > span.end {
                replacement.push(Entry { span: Span::new(span.end, right.span.end), value: right.value.clone() });
            }
        }

        let inserted_at = first + (replacement.first().unwrap().span.start < span.start) as usize;
        self.entries.splice(first..last, replacement);
        self.coalesce_around(inserted_at)
    }

    /// Subtracts `span` from any overlapping entries, splitting them where `span` falls in their
    /// interior and dropping them entirely where `span` covers them.
    pub fn remove(&mut self, span: Span)
    where
        V: Clone,
    {
        let (first, last) = self.overlap_range(span);
        if first == last {
            return;
        }

        let mut replacement = Vec::with_capacity(2);
        let left = &self.entries[first];
        if left.span.start < span.start {
            replacement.push(Entry { span: Span::new(left.span.start, span.start), value: left.value.clone() });
        }
        let right = &self.entries[last - 1];
        if right.span.end > span.end {
            replacement.push(Entry { span: Span::new(span.end, right.span.end), value: right.value.clone() });
        }

        self.entries.splice(first..last, replacement);
    }

    /// Applies `f` across every sub-range of `span`: entries `f` maps to `Some` survive (with
    /// their span clipped to `span`) and adjacent equal results coalesce, including with the
    /// entries immediately outside `span`; `f(None)` is consulted for gaps, and a `None` result
    /// removes that sub-range.
    pub fn update(&mut self, span: Span, mut f: impl FnMut(Option<&V>) -> Option<V>)
    where
        V: Clone + PartialEq,
    {
        let (first, last) = self.overlap_range(span);

        let mut pieces: Vec<Entry<V>> = Vec::new();

        // Part of the first overlapping entry that sticks out before `span` keeps its original
        // value untouched by `f` — only the portion inside `span` is subject to the transform.
        if first < last {
            let entry = &self.entries[first];
            if entry.span.start < span.start {
                pieces.push(Entry {
                    span: Span::new(entry.span.start, span.start),
                    value: entry.value.clone(),
                });
            }
        }

        let mut cursor = span.start;
        for entry in &self.entries[first..last] {
            let piece_start = entry.span.start.max(span.start);
            let piece_end = entry.span.end.min(span.end);

            if cursor < piece_start {
                if let Some(value) = f(None) {
                    pieces.push(Entry { span: Span::new(cursor, piece_start), value });
                }
            }
            if let Some(value) = f(Some(&entry.value)) {
                pieces.push(Entry { span: Span::new(piece_start, piece_end), value });
            }
            cursor = piece_end;
        }
        if cursor < span.end {
            if let Some(value) = f(None) {
                pieces.push(Entry { span: Span::new(cursor, span.end), value });
            }
        }

        // Same as the left remainder above, but for the tail of the last overlapping entry.
        if first < last {
            let entry = &self.entries[last - 1];
            if entry.span.end > span.end {
                pieces.push(Entry {
                    span: Span::new(span.end, entry.span.end),
                    value: entry.value.clone(),
                });
            }
        }

        // Coalesce adjacent equal-valued pieces before splicing them in.
        let mut merged: Vec<Entry<V>> = Vec::with_capacity(pieces.len());
        for piece in pieces {
            match merged.last_mut() {
                Some(prev) if prev.span.end == piece.span.start && prev.value == piece.value => {
                    prev.span.end = piece.span.end;
                },
                _ => merged.push(piece),
            }
        }

        let insertion_point = first;
        let inserted_count = merged.len();
        self.entries.splice(first..last, merged);

        // Coalesce with the entries now immediately outside the spliced-in region, at both ends.
        if inserted_count > 0 {
            self.coalesce_around(insertion_point + inserted_count - 1);
        }
        if insertion_point > 0 {
            self.coalesce_around(insertion_point - 1);
        }
    }
}
