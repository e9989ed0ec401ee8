//! Encoding a crunched callstack for inclusion in a size-bounded telemetry field.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::crunch::{crunch, NONE_SENTINEL};
use crate::frame::Callstack;

/// Crunches `callstack` and base64url-encodes it, staying within `max_exception_length`
/// characters. Base64 expands every 3 raw bytes to 4 characters, so the raw budget handed to
/// [`crunch`] is `max_exception_length * 3 / 4`; if the encoded form still overflows (crunch
/// could not shrink below that raw budget) the `<none>` sentinel is returned verbatim instead of
/// a truncated, undecodable payload.
pub fn telemetry_payload(callstack: &Callstack, max_exception_length: usize) -> Box<str> {
    let raw_budget = max_exception_length * 3 / 4;
    let pcs: Vec<u64> = callstack.frames().iter().map(|f| f.pc).collect();
    let packed = crunch(&pcs, raw_budget);
    let encoded = URL_SAFE_NO_PAD.encode(&packed);
    if encoded.len() <= max_exception_length {
        encoded.into_boxed_str()
    } else {
        String::from_utf8_lossy(NONE_SENTINEL).into_owned().into_boxed_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;

    #[test]
    fn payload_stays_within_budget_and_decodes() {
        let cs = Callstack((0..10).map(|i| Frame::with_pc(0x1000 + i * 0x20)).collect());
        let payload = telemetry_payload(&cs, 64);
        assert!(payload.len() <= 64);
        let decoded = URL_SAFE_NO_PAD.decode(payload.as_bytes()).unwrap();
        assert_eq!(crate::crunch::uncrunch(&decoded).unwrap(), cs.frames().iter().map(|f| f.pc).collect::<Vec<_>>());
    }

    #[test]
    fn empty_callstack_yields_none_sentinel() {
        let cs = Callstack(Vec::new());
        let payload = telemetry_payload(&cs, 64);
        assert_eq!(&*payload, "<none>");
    }

    #[test]
    fn tiny_budget_falls_back_to_none_sentinel() {
        let cs = Callstack((0..50).map(|i| Frame::with_pc(0x4000 + i * 0x30)).collect());
        let payload = telemetry_payload(&cs, 4);
        assert_eq!(&*payload, "<none>");
    }
}
