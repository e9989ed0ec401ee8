//! Byte-level writer/reader and the `Encode`/`Decode` traits for primitive values.
//!
//! Mirrors the `ByteWriter` / `ByteReader` / `Serializable` / `Deserializable` split used
//! throughout the MAST serialization code this crate is modeled on: a `Writer` that only ever
//! grows a buffer, a `Reader` that walks a borrowed slice, and a pair of traits so every type that
//! appears on the wire can describe its own encoding.

use crate::{
    error::CodecError,
    vle::{read_vle, write_vle, zigzag_decode, zigzag_encode},
};

// WRITER
// ================================================================================================

#[derive(Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_bool(&mut self, v: bool) {
        self.write_u8(v as u8);
    }

    pub fn write_i8(&mut self, v: i8) {
        self.write_u8(v as u8);
    }

    pub fn write_u16(&mut self, v: u16) {
        write_vle(&mut self.buf, v as u64);
    }

    pub fn write_i16(&mut self, v: i16) {
        write_vle(&mut self.buf, zigzag_encode(v as i64));
    }

    pub fn write_u32(&mut self, v: u32) {
        write_vle(&mut self.buf, v as u64);
    }

    pub fn write_i32(&mut self, v: i32) {
        write_vle(&mut self.buf, zigzag_encode(v as i64));
    }

    pub fn write_u64(&mut self, v: u64) {
        write_vle(&mut self.buf, v);
    }

    pub fn write_i64(&mut self, v: i64) {
        write_vle(&mut self.buf, zigzag_encode(v));
    }

    pub fn write_f16(&mut self, v: half::f16) {
        write_vle(&mut self.buf, v.to_bits().swap_bytes() as u64);
    }

    pub fn write_f32(&mut self, v: f32) {
        write_vle(&mut self.buf, v.to_bits().swap_bytes() as u64);
    }

    pub fn write_f64(&mut self, v: f64) {
        write_vle(&mut self.buf, v.to_bits().swap_bytes());
    }

    pub fn write_str(&mut self, v: &str) {
        write_vle(&mut self.buf, v.len() as u64);
        self.buf.extend_from_slice(v.as_bytes());
    }

    pub fn write_bytes_raw(&mut self, v: &[u8]) {
        write_vle(&mut self.buf, v.len() as u64);
        self.buf.extend_from_slice(v);
    }
}

// READER
// ================================================================================================

#[derive(Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn has_more(&self) -> bool {
        self.pos < self.buf.len()
    }

    fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        let &b = self.buf.get(self.pos).ok_or(CodecError::ShortRead)?;
        self.pos += 1;
        Ok(b)
    }

    pub fn read_bool(&mut self) -> Result<bool, CodecError> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_i8(&mut self) -> Result<i8, CodecError> {
        Ok(self.read_u8()? as i8)
    }

    fn read_vle_u64(&mut self) -> Result<u64, CodecError> {
        let (value, consumed) = read_vle(self.rest())?;
        self.pos += consumed;
        Ok(value)
    }

    pub fn read_u16(&mut self) -> Result<u16, CodecError> {
        let v = self.read_vle_u64()?;
        u16::try_from(v).map_err(|_| CodecError::MalformedEncoding("u16 overflow".into()))
    }

    pub fn read_i16(&mut self) -> Result<i16, CodecError> {
        let v = zigzag_decode(self.read_vle_u64()?);
        i16::try_from(v).map_err(|_| CodecError::MalformedEncoding("i16 overflow".into()))
    }

    pub fn read_u32(&mut self) -> Result<u32, CodecError> {
        let v = self.read_vle_u64()?;
        u32::try_from(v).map_err(|_| CodecError::MalformedEncoding("u32 overflow".into()))
    }

    pub fn read_i32(&mut self) -> Result<i32, CodecError> {
        let v = zigzag_decode(self.read_vle_u64()?);
        i32::try_from(v).map_err(|_| CodecError::MalformedEncoding("i32 overflow".into()))
    }

    pub fn read_u64(&mut self) -> Result<u64, CodecError> {
        self.read_vle_u64()
    }

    pub fn read_i64(&mut self) -> Result<i64, CodecError> {
        Ok(zigzag_decode(self.read_vle_u64()?))
    }

    pub fn read_f16(&mut self) -> Result<half::f16, CodecError> {
        let bits = self.read_vle_u64()? as u16;
        Ok(half::f16::from_bits(bits.swap_bytes()))
    }

    pub fn read_f32(&mut self) -> Result<f32, CodecError> {
        let bits = self.read_vle_u64()? as u32;
        Ok(f32::from_bits(bits.swap_bytes()))
    }

    pub fn read_f64(&mut self) -> Result<f64, CodecError> {
        let bits = self.read_vle_u64()?;
        Ok(f64::from_bits(bits.swap_bytes()))
    }

    pub fn read_str(&mut self) -> Result<String, CodecError> {
        let len = self.read_vle_u64()? as usize;
        let end = self.pos.checked_add(len).ok_or(CodecError::ShortRead)?;
        let bytes = self.buf.get(self.pos..end).ok_or(CodecError::ShortRead)?;
        let s = String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8)?;
        self.pos = end;
        Ok(s)
    }

    pub fn read_bytes_raw(&mut self) -> Result<Vec<u8>, CodecError> {
        let len = self.read_vle_u64()? as usize;
        let end = self.pos.checked_add(len).ok_or(CodecError::ShortRead)?;
        let bytes = self.buf.get(self.pos..end).ok_or(CodecError::ShortRead)?;
        let out = bytes.to_vec();
        self.pos = end;
        Ok(out)
    }
}

// ENCODE / DECODE
// ================================================================================================

/// Implemented by every type that has a wire representation.
pub trait Encode {
    fn encode(&self, w: &mut Writer);
}

/// Implemented by every type that can be read back from the wire.
pub trait Decode: Sized {
    fn decode(r: &mut Reader) -> Result<Self, CodecError>;
}

macro_rules! impl_primitive {
    ($ty:ty, $write:ident, $read:ident) => {
        impl Encode for $ty {
            fn encode(&self, w: &mut Writer) {
                w.$write(*self);
            }
        }

        impl Decode for $ty {
            fn decode(r: &mut Reader) -> Result<Self, CodecError> {
                r.$read()
            }
        }
    };
}

impl_primitive!(bool, write_bool, read_bool);
impl_primitive!(i8, write_i8, read_i8);
impl_primitive!(u8, write_u8, read_u8);
impl_primitive!(i16, write_i16, read_i16);
impl_primitive!(u16, write_u16, read_u16);
impl_primitive!(i32, write_i32, read_i32);
impl_primitive!(u32, write_u32, read_u32);
impl_primitive!(i64, write_i64, read_i64);
impl_primitive!(u64, write_u64, read_u64);
impl_primitive!(half::f16, write_f16, read_f16);
impl_primitive!(f32, write_f32, read_f32);
impl_primitive!(f64, write_f64, read_f64);

impl Encode for str {
    fn encode(&self, w: &mut Writer) {
        w.write_str(self);
    }
}

impl Encode for String {
    fn encode(&self, w: &mut Writer) {
        w.write_str(self);
    }
}

impl Decode for String {
    fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        r.read_str()
    }
}

impl Encode for [u8] {
    fn encode(&self, w: &mut Writer) {
        w.write_bytes_raw(self);
    }
}

impl Encode for Vec<u8> {
    fn encode(&self, w: &mut Writer) {
        w.write_bytes_raw(self);
    }
}

impl Decode for Vec<u8> {
    fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        r.read_bytes_raw()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn roundtrip<T: Encode + Decode + PartialEq + core::fmt::Debug>(value: T) {
        let mut w = Writer::new();
        value.encode(&mut w);
        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes);
        let decoded = T::decode(&mut r).unwrap();
        assert_eq!(value, decoded);
        assert!(!r.has_more());
    }

    #[test]
    fn primitive_roundtrips() {
        roundtrip(true);
        roundtrip(false);
        roundtrip(-42i8);
        roundtrip(200u8);
        roundtrip(-1234i16);
        roundtrip(54321u16);
        roundtrip(i32::MIN);
        roundtrip(u32::MAX);
        roundtrip(i64::MIN);
        roundtrip(u64::MAX);
        roundtrip(String::new());
        roundtrip("hello, gapid".to_string());
        roundtrip(Vec::<u8>::new());
        roundtrip(vec![1u8, 2, 3, 255]);
    }

    #[test]
    fn float_nan_payload_is_preserved_bit_for_bit() {
        for bits in [0x7FC0_0000u32, 0xFFC0_0000, 0x7F80_0001] {
            let value = f32::from_bits(bits);
            let mut w = Writer::new();
            value.encode(&mut w);
            let bytes = w.into_bytes();
            let mut r = Reader::new(&bytes);
            let decoded = f32::decode(&mut r).unwrap();
            assert_eq!(decoded.to_bits(), bits);
        }

        let bits = 0x7FF8_0000_0000_0001u64;
        let value = f64::from_bits(bits);
        let mut w = Writer::new();
        value.encode(&mut w);
        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes);
        let decoded = f64::decode(&mut r).unwrap();
        assert_eq!(decoded.to_bits(), bits);
    }

    proptest! {
        #[test]
        fn f32_roundtrips(bits: u32) {
            let value = f32::from_bits(bits);
            let mut w = Writer::new();
            value.encode(&mut w);
            let bytes = w.into_bytes();
            let mut r = Reader::new(&bytes);
            let decoded = f32::decode(&mut r).unwrap();
            prop_assert_eq!(decoded.to_bits(), bits);
        }

        #[test]
        fn string_roundtrips(s in ".*") {
            let mut w = Writer::new();
            s.encode(&mut w);
            let bytes = w.into_bytes();
            let mut r = Reader::new(&bytes);
            let decoded = String::decode(&mut r).unwrap();
            prop_assert_eq!(decoded, s);
        }
    }
}
