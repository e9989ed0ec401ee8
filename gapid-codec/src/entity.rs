//! Entity schemas: self-describing record layouts.

use crate::{
    error::CodecError,
    primitive::{Decode, Encode, Reader, Writer},
};

/// The type of a single field in an [`Entity`].
///
/// `Entity` and `Object` fields hold references into the stream's interning tables rather than
/// inline payloads; every other variant is encoded directly per [`crate::primitive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FieldKind {
    Bool = 0,
    I8 = 1,
    U8 = 2,
    I16 = 3,
    U16 = 4,
    I32 = 5,
    U32 = 6,
    I64 = 7,
    U64 = 8,
    F16 = 9,
    F32 = 10,
    F64 = 11,
    String = 12,
    Bytes = 13,
    Id = 14,
    Entity = 15,
    Object = 16,
}

impl Encode for FieldKind {
    fn encode(&self, w: &mut Writer) {
        w.write_u8(*self as u8);
    }
}

impl Decode for FieldKind {
    fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        Ok(match r.read_u8()? {
            0 => FieldKind::Bool,
            1 => FieldKind::I8,
            2 => FieldKind::U8,
            3 => FieldKind::I16,
            4 => FieldKind::U16,
            5 => FieldKind::I32,
            6 => FieldKind::U32,
            7 => FieldKind::I64,
            8 => FieldKind::U64,
            9 => FieldKind::F16,
            10 => FieldKind::F32,
            11 => FieldKind::F64,
            12 => FieldKind::String,
            13 => FieldKind::Bytes,
            14 => FieldKind::Id,
            15 => FieldKind::Entity,
            16 => FieldKind::Object,
            other => {
                return Err(CodecError::MalformedEncoding(format!(
                    "unknown field kind tag {other}"
                )));
            },
        })
    }
}

/// Describes one named field of an [`Entity`].
///
/// `compact` marks the field as droppable in [`crate::stream::Mode::Compact`] mode; both sides
/// must agree on which fields are non-compact, since a `Compact`-mode writer simply omits them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    pub name: Box<str>,
    pub kind: FieldKind,
    pub compact: bool,
}

impl FieldSchema {
    pub fn new(name: impl Into<Box<str>>, kind: FieldKind, compact: bool) -> Self {
        Self { name: name.into(), kind, compact }
    }
}

impl Encode for FieldSchema {
    fn encode(&self, w: &mut Writer) {
        w.write_str(&self.name);
        self.kind.encode(w);
        w.write_bool(self.compact);
    }
}

impl Decode for FieldSchema {
    fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        let name = r.read_str()?.into_boxed_str();
        let kind = FieldKind::decode(r)?;
        let compact = r.read_bool()?;
        Ok(Self { name, kind, compact })
    }
}

/// A schema descriptor identified by a signature string, with an ordered list of typed fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub signature: Box<str>,
    pub fields: Vec<FieldSchema>,
}

impl Entity {
    pub fn new(signature: impl Into<Box<str>>, fields: Vec<FieldSchema>) -> Self {
        Self { signature: signature.into(), fields }
    }
}

impl Encode for Entity {
    fn encode(&self, w: &mut Writer) {
        w.write_str(&self.signature);
        w.write_u32(self.fields.len() as u32);
        for field in &self.fields {
            field.encode(w);
        }
    }
}

impl Decode for Entity {
    fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        let signature = r.read_str()?.into_boxed_str();
        let count = r.read_u32()? as usize;
        let mut fields = Vec::with_capacity(count);
        for _ in 0..count {
            fields.push(FieldSchema::decode(r)?);
        }
        Ok(Self { signature, fields })
    }
}
