//! Crunch/Uncrunch: compresses a callstack's program counters into a byte budget for inclusion
//! in exception telemetry, and decompresses them back.
//!
//! The wire shape is a 2-bit compressor selector, a bitvle frame count, then a compressor-specific
//! payload. Four compressors are tried and the shortest result that fits the cap wins; if none fit,
//! the shallowest frame is dropped and all four are retried. If the stack is trimmed to nothing, the
//! `<none>` sentinel is emitted instead of an empty frame.

use crate::bitstream::{bitvle_bit_len, read_bitvle, write_bitvle, BitReader, BitWriter};
use crate::error::StacktraceError;

pub const NONE_SENTINEL: &[u8] = b"<none>";

#[derive(Clone, Copy, PartialEq, Eq)]
enum PackKind {
    Xor,
    Diff,
}

fn zigzag(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

fn unzigzag(u: u64) -> i64 {
    ((u >> 1) as i64) ^ -((u & 1) as i64)
}

fn pack(kind: PackKind, delta: u64, reference: u64) -> u64 {
    match kind {
        PackKind::Xor => delta ^ reference,
        PackKind::Diff => zigzag(delta as i64 - reference as i64),
    }
}

fn unpack(kind: PackKind, packed: u64, reference: u64) -> u64 {
    match kind {
        PackKind::Xor => packed ^ reference,
        PackKind::Diff => (reference as i64 + unzigzag(packed)) as u64,
    }
}

fn write_dictionary(w: &mut BitWriter, pcs: &[u64]) {
    let mut uniq: Vec<u64> = pcs.to_vec();
    uniq.sort_unstable();
    uniq.dedup();
    let mut prev = 0u64;
    for &v in &uniq {
        write_bitvle(w, v - prev);
        prev = v;
    }
    write_bitvle(w, 0);
    for &pc in pcs {
        let idx = uniq.binary_search(&pc).expect("pc must be in its own dictionary");
        write_bitvle(w, idx as u64);
    }
}

fn read_dictionary(r: &mut BitReader, count: usize) -> Result<Vec<u64>, StacktraceError> {
    let mut uniq = Vec::new();
    let mut prev = 0u64;
    loop {
        let d = read_bitvle(r)?;
        if d == 0 {
            break;
        }
        prev += d;
        uniq.push(prev);
    }
    let mut pcs = Vec::with_capacity(count);
    for _ in 0..count {
        let idx = read_bitvle(r)? as usize;
        pcs.push(*uniq.get(idx).ok_or(StacktraceError::ShortRead)?);
    }
    Ok(pcs)
}

fn write_xor_delta(w: &mut BitWriter, pcs: &[u64]) {
    let mut prev = 0u64;
    for &pc in pcs {
        write_bitvle(w, pc ^ prev);
        prev = pc;
    }
}

fn read_xor_delta(r: &mut BitReader, count: usize) -> Result<Vec<u64>, StacktraceError> {
    let mut pcs = Vec::with_capacity(count);
    let mut prev = 0u64;
    for _ in 0..count {
        let pc = read_bitvle(r)? ^ prev;
        pcs.push(pc);
        prev = pc;
    }
    Ok(pcs)
}

/// Per-frame delta from the stack's minimum pc, each either written directly or as a
/// back-reference to an earlier delta packed with `kind`, whichever is cheaper.
fn write_base_backref(w: &mut BitWriter, pcs: &[u64], kind: PackKind) {
    let base = pcs.iter().copied().min().unwrap_or(0);
    write_bitvle(w, base);
    let mut deltas: Vec<u64> = Vec::with_capacity(pcs.len());
    for (i, &pc) in pcs.iter().enumerate() {
        let delta = pc - base;
        let direct_bits = 1 + bitvle_bit_len(delta);
        let mut best: Option<(usize, u64, usize)> = None;
        for (j, &reference) in deltas.iter().enumerate() {
            let packed = pack(kind, delta, reference);
            let distance = (i - j) as u64;
            let bits = 1 + bitvle_bit_len(distance) + bitvle_bit_len(packed);
            if best.is_none_or(|(_, _, b)| bits < b) {
                best = Some((i - j, packed, bits));
            }
        }
        match best {
            Some((distance, packed, bits)) if bits < direct_bits => {
                w.push_bit(true);
                write_bitvle(w, distance as u64);
                write_bitvle(w, packed);
            }
            _ => {
                w.push_bit(false);
                write_bitvle(w, delta);
            }
        }
        deltas.push(delta);
    }
}

fn read_base_backref(r: &mut BitReader, count: usize, kind: PackKind) -> Result<Vec<u64>, StacktraceError> {
    let base = read_bitvle(r)?;
    let mut deltas: Vec<u64> = Vec::with_capacity(count);
    for i in 0..count {
        let delta = if r.read_bit()? {
            let distance = read_bitvle(r)? as usize;
            let packed = read_bitvle(r)?;
            let j = i.checked_sub(distance).ok_or(StacktraceError::ShortRead)?;
            let reference = *deltas.get(j).ok_or(StacktraceError::ShortRead)?;
            unpack(kind, packed, reference)
        } else {
            read_bitvle(r)?
        };
        deltas.push(delta);
    }
    Ok(deltas.into_iter().map(|d| d + base).collect())
}

fn candidate(selector: u8, frame_count: usize, body: impl FnOnce(&mut BitWriter)) -> Vec<u8> {
    let mut w = BitWriter::new();
    w.push_bits(selector as u64, 2);
    write_bitvle(&mut w, frame_count as u64);
    body(&mut w);
    w.into_bytes()
}

/// Packs `pcs` (deepest frame first) into at most `cap_bytes`, dropping the shallowest frames
/// one at a time until it fits. Returns [`NONE_SENTINEL`] if even zero frames would overflow the
/// cap, or if `pcs` started empty.
pub fn crunch(pcs: &[u64], cap_bytes: usize) -> Vec<u8> {
    let mut frames = pcs.to_vec();
    loop {
        if frames.is_empty() {
            return NONE_SENTINEL.to_vec();
        }
        let candidates = [
            candidate(0, frames.len(), |w| write_dictionary(w, &frames)),
            candidate(1, frames.len(), |w| write_xor_delta(w, &frames)),
            candidate(2, frames.len(), |w| write_base_backref(w, &frames, PackKind::Xor)),
            candidate(3, frames.len(), |w| write_base_backref(w, &frames, PackKind::Diff)),
        ];
        let shortest = candidates.into_iter().min_by_key(|c| c.len()).expect("four candidates");
        if shortest.len() <= cap_bytes {
            return shortest;
        }
        frames.pop();
    }
}

/// Inverse of [`crunch`]. Returns an empty vec for the `<none>` sentinel.
pub fn uncrunch(bytes: &[u8]) -> Result<Vec<u64>, StacktraceError> {
    if bytes == NONE_SENTINEL {
        return Ok(Vec::new());
    }
    let mut r = BitReader::new(bytes);
    let selector = r.read_bits(2)?;
    let count = read_bitvle(&mut r)? as usize;
    match selector {
        0 => read_dictionary(&mut r, count),
        1 => read_xor_delta(&mut r, count),
        2 => read_base_backref(&mut r, count, PackKind::Xor),
        3 => read_base_backref(&mut r, count, PackKind::Diff),
        other => Err(StacktraceError::UnknownCompressor(other as u8)),
    }
}
