//! Self-describing object streaming: entity/object interning, stream-local sid assignment, and
//! the `Compact`/`Full` mode control block.
//!
//! Wire shape for a reference (entity or object):
//!
//! ```text
//! sid_header := vle_u64((sid << 1) | new_bit)
//! sid == 0  -> null
//! sid == 1  -> control block escape: a mode byte follows, then the real sid_header
//! sid >= 2  -> a real entity/object id; new_bit == 1 means a full definition follows
//! ```

use std::collections::HashMap;

use crate::{
    entity::Entity,
    error::CodecError,
    primitive::{Decode, Encode, Reader, Writer},
    value::{Arena, ArenaIdx, Record, Value},
};

/// Stream-local mode selector. In `Compact` mode, fields marked non-compact are omitted by the
/// writer and must not be expected by the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Compact,
    Full,
}

impl Mode {
    fn to_byte(self) -> u8 {
        match self {
            Mode::Compact => 0,
            Mode::Full => 1,
        }
    }

    fn from_byte(b: u8) -> Result<Self, CodecError> {
        match b {
            0 => Ok(Mode::Compact),
            1 => Ok(Mode::Full),
            other => Err(CodecError::MalformedEncoding(format!("invalid mode byte {other}"))),
        }
    }
}

const NULL_SID: u32 = 0;
const CONTROL_SID: u32 = 1;
const FIRST_REAL_SID: u32 = 2;

enum RefHeader {
    Null,
    New(u32),
    Existing(u32),
}

// STREAM WRITER
// ================================================================================================

pub struct StreamWriter {
    w: Writer,
    mode: Mode,
    pending_mode: Option<Mode>,
    entity_sid_of: HashMap<Box<str>, u32>,
    next_entity_sid: u32,
    next_object_sid: u32,
    max_record_bytes: Option<usize>,
}

impl Default for StreamWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamWriter {
    pub fn new() -> Self {
        Self {
            w: Writer::new(),
            mode: Mode::Compact,
            pending_mode: None,
            entity_sid_of: HashMap::new(),
            next_entity_sid: FIRST_REAL_SID,
            next_object_sid: FIRST_REAL_SID,
            max_record_bytes: None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Queues a one-shot mode transition, emitted just before the next ref header is written.
    pub fn set_mode(&mut self, mode: Mode) {
        self.pending_mode = Some(mode);
    }

    /// Sets the maximum number of encoded bytes (header, entity ref, and fields) any single
    /// record may occupy on the wire. `write_arena` fails with [`CodecError::PayloadTooLarge`]
    /// for the first record that exceeds it. `None` (the default) leaves records unbounded.
    pub fn set_max_record_bytes(&mut self, cap: Option<usize>) {
        self.max_record_bytes = cap;
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.w.into_bytes()
    }

    fn write_ref_header(&mut self, sid: u32, is_new: bool) {
        if let Some(mode) = self.pending_mode.take() {
            self.w.write_u64(((CONTROL_SID as u64) << 1) | 0);
            self.w.write_u8(mode.to_byte());
            self.mode = mode;
        }
        self.w.write_u64(((sid as u64) << 1) | is_new as u64);
    }

    /// Writes a reference to `entity`, interning it (and emitting its full definition) the first
    /// time this signature is seen on this stream.
    pub fn write_entity_ref(&mut self, entity: &Entity) {
        if let Some(&sid) = self.entity_sid_of.get(&entity.signature) {
            self.write_ref_header(sid, false);
            return;
        }
        let sid = self.next_entity_sid;
        self.next_entity_sid += 1;
        self.entity_sid_of.insert(entity.signature.clone(), sid);
        self.write_ref_header(sid, true);
        entity.encode(&mut self.w);
    }

    /// Writes an entire object graph rooted at `root`, assigning a fresh stream id to each record
    /// the first time it is reached and a back-reference on every subsequent visit — this is what
    /// makes cyclic graphs safe to serialize: the sid is reserved before the object's body is
    /// serialized.
    pub fn write_arena(&mut self, arena: &Arena, root: ArenaIdx) -> Result<(), CodecError> {
        let mut assigned = HashMap::new();
        self.write_node(arena, root, &mut assigned)
    }

    fn write_node(
        &mut self,
        arena: &Arena,
        idx: ArenaIdx,
        assigned: &mut HashMap<ArenaIdx, u32>,
    ) -> Result<(), CodecError> {
        if let Some(&sid) = assigned.get(&idx) {
            self.write_ref_header(sid, false);
            return Ok(());
        }

        let sid = self.next_object_sid;
        self.next_object_sid += 1;
        // Reserve before recursing into fields so a self- or mutually-referential field encodes
        // as a back-reference instead of infinite recursion.
        assigned.insert(idx, sid);

        let start = self.w.len();
        self.write_ref_header(sid, true);
        let record = arena.get(idx);
        self.write_entity_ref(&record.entity);

        for (field, value) in record.entity.fields.iter().zip(&record.fields) {
            if self.mode == Mode::Compact && !field.compact {
                continue;
            }
            self.write_field_value(value, arena, assigned)?;
        }

        if let Some(cap) = self.max_record_bytes {
            if self.w.len() - start > cap {
                return Err(CodecError::PayloadTooLarge { cap });
            }
        }
        Ok(())
    }

    fn write_field_value(
        &mut self,
        value: &Value,
        arena: &Arena,
        assigned: &mut HashMap<ArenaIdx, u32>,
    ) -> Result<(), CodecError> {
        match value {
            Value::Null => self.w.write_u8(0),
            Value::Bool(v) => v.encode(&mut self.w),
            Value::I8(v) => v.encode(&mut self.w),
            Value::U8(v) => v.encode(&mut self.w),
            Value::I16(v) => v.encode(&mut self.w),
            Value::U16(v) => v.encode(&mut self.w),
            Value::I32(v) => v.encode(&mut self.w),
            Value::U32(v) => v.encode(&mut self.w),
            Value::I64(v) => v.encode(&mut self.w),
            Value::U64(v) => v.encode(&mut self.w),
            Value::F16(v) => v.encode(&mut self.w),
            Value::F32(v) => v.encode(&mut self.w),
            Value::F64(v) => v.encode(&mut self.w),
            Value::String(v) => v.encode(&mut self.w),
            Value::Bytes(v) => v.encode(&mut self.w),
            Value::Id(v) => self.w.write_u64(*v),
            Value::EntityRef(entity) => self.write_entity_ref(entity),
            Value::Object(child) => return self.write_node(arena, *child, assigned),
        }
        Ok(())
    }
}

// STREAM READER
// ================================================================================================

pub struct StreamReader<'a> {
    r: Reader<'a>,
    mode: Mode,
    entities: Vec<Entity>,
    arena: Arena,
    object_idx_of_sid: HashMap<u32, ArenaIdx>,
}

impl<'a> StreamReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            r: Reader::new(bytes),
            mode: Mode::Compact,
            entities: Vec::new(),
            arena: Arena::new(),
            object_idx_of_sid: HashMap::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    fn read_ref_header(&mut self) -> Result<RefHeader, CodecError> {
        let mut raw = self.r.read_u64()?;
        let mut sid = (raw >> 1) as u32;
        let mut is_new = (raw & 1) != 0;

        if sid == CONTROL_SID {
            let mode_byte = self.r.read_u8()?;
            self.mode = Mode::from_byte(mode_byte)?;
            raw = self.r.read_u64()?;
            sid = (raw >> 1) as u32;
            is_new = (raw & 1) != 0;
        }

        Ok(if sid == NULL_SID {
            RefHeader::Null
        } else if is_new {
            RefHeader::New(sid)
        } else {
            RefHeader::Existing(sid)
        })
    }

    fn entity_index_for_sid(sid: u32) -> usize {
        (sid - FIRST_REAL_SID) as usize
    }

    /// Reads one entity reference, returning the resolved [`Entity`].
    pub fn read_entity_ref(&mut self) -> Result<Entity, CodecError> {
        match self.read_ref_header()? {
            RefHeader::Null => Err(CodecError::MalformedEncoding(
                "entity reference cannot be null".into(),
            )),
            RefHeader::New(sid) => {
                let entity = Entity::decode(&mut self.r)?;
                let idx = Self::entity_index_for_sid(sid);
                debug_assert_eq!(idx, self.entities.len());
                self.entities.push(entity.clone());
                Ok(entity)
            },
            RefHeader::Existing(sid) => {
                let idx = Self::entity_index_for_sid(sid);
                self.entities
                    .get(idx)
                    .cloned()
                    .ok_or(CodecError::UnknownEntitySid(sid))
            },
        }
    }

    /// Reads an entire object graph and returns the [`Arena`] plus the index of the root record.
    pub fn read_arena(mut self) -> Result<(Arena, ArenaIdx), CodecError> {
        let root = self.read_node()?;
        Ok((self.arena, root))
    }

    fn read_node(&mut self) -> Result<ArenaIdx, CodecError> {
        match self.read_ref_header()? {
            RefHeader::Null => Err(CodecError::MalformedEncoding("object cannot be null".into())),
            RefHeader::Existing(sid) => self
                .object_idx_of_sid
                .get(&sid)
                .copied()
                .ok_or(CodecError::UnknownObjectSid(sid)),
            RefHeader::New(sid) => {
                let entity = self.read_entity_ref()?;

                // Reserve the arena slot before reading fields, mirroring the writer's eager sid
                // reservation so a cyclic field can resolve a back-reference to this object.
                let idx = self.arena.insert(Record::new(entity.clone(), Vec::new()));
                self.object_idx_of_sid.insert(sid, idx);

                let mut fields = Vec::with_capacity(entity.fields.len());
                for field in &entity.fields {
                    if self.mode == Mode::Compact && !field.compact {
                        fields.push(Value::Null);
                        continue;
                    }
                    fields.push(self.read_field_value(field.kind)?);
                }

                self.arena.set_fields(idx, fields);
                Ok(idx)
            },
        }
    }

    fn read_field_value(&mut self, kind: crate::entity::FieldKind) -> Result<Value, CodecError> {
        use crate::entity::FieldKind::*;
        Ok(match kind {
            Bool => Value::Bool(bool::decode(&mut self.r)?),
            I8 => Value::I8(i8::decode(&mut self.r)?),
            U8 => Value::U8(u8::decode(&mut self.r)?),
            I16 => Value::I16(i16::decode(&mut self.r)?),
            U16 => Value::U16(u16::decode(&mut self.r)?),
            I32 => Value::I32(i32::decode(&mut self.r)?),
            U32 => Value::U32(u32::decode(&mut self.r)?),
            I64 => Value::I64(i64::decode(&mut self.r)?),
            U64 => Value::U64(u64::decode(&mut self.r)?),
            F16 => Value::F16(half::f16::decode(&mut self.r)?),
            F32 => Value::F32(f32::decode(&mut self.r)?),
            F64 => Value::F64(f64::decode(&mut self.r)?),
            String => Value::String(std::string::String::decode(&mut self.r)?),
            Bytes => Value::Bytes(Vec::<u8>::decode(&mut self.r)?),
            Id => Value::Id(self.r.read_u64()?),
            Entity => Value::EntityRef(self.read_entity_ref()?),
            Object => Value::Object(self.read_node()?),
        })
    }
}

impl Arena {
    fn set_fields(&mut self, idx: ArenaIdx, fields: Vec<Value>) {
        self.record_mut(idx).fields = fields;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{FieldKind, FieldSchema};

    fn leaf_entity() -> Entity {
        Entity::new("gapid.Leaf", vec![FieldSchema::new("value", FieldKind::I32, true)])
    }

    fn node_entity() -> Entity {
        Entity::new(
            "gapid.Node",
            vec![
                FieldSchema::new("name", FieldKind::String, true),
                FieldSchema::new("child", FieldKind::Object, true),
                FieldSchema::new("debug_note", FieldKind::String, false),
            ],
        )
    }

    #[test]
    fn shared_child_is_written_once_and_shared_on_read() {
        let mut arena = Arena::new();
        let leaf = arena.insert(Record::new(leaf_entity(), vec![Value::I32(7)]));
        let left = arena.insert(Record::new(
            node_entity(),
            vec![Value::String("left".into()), Value::Object(leaf), Value::Null],
        ));
        let right = arena.insert(Record::new(
            node_entity(),
            vec![Value::String("right".into()), Value::Object(leaf), Value::Null],
        ));
        let root = arena.insert(Record::new(
            node_entity(),
            vec![Value::String("root".into()), Value::Object(left), Value::Null],
        ));
        // Make `right` reachable too, to exercise a second shared reference to `leaf`.
        let root_with_right = arena.insert(Record::new(
            node_entity(),
            vec![Value::String("root2".into()), Value::Object(right), Value::Null],
        ));

        let mut w = StreamWriter::new();
        w.write_arena(&arena, root).unwrap();
        let bytes = w.into_bytes();

        let (decoded, decoded_root) = StreamReader::new(&bytes).read_arena().unwrap();
        let root_record = decoded.get(decoded_root);
        assert_eq!(root_record.fields[0], Value::String("root".into()));

        // Encode the second root separately and confirm the shared leaf decodes identically.
        let mut w2 = StreamWriter::new();
        w2.write_arena(&arena, root_with_right).unwrap();
        let bytes2 = w2.into_bytes();
        let (decoded2, root2_idx) = StreamReader::new(&bytes2).read_arena().unwrap();
        let Value::Object(right_idx) = decoded2.get(root2_idx).fields[1] else { panic!() };
        let Value::Object(leaf_idx) = decoded2.get(right_idx).fields[1] else { panic!() };
        assert_eq!(decoded2.get(leaf_idx).fields[0], Value::I32(7));
    }

    #[test]
    fn cyclic_object_graph_roundtrips() {
        let mut arena = Arena::new();
        // Build a two-node cycle: a -> b -> a.
        let a = arena.insert(Record::new(
            node_entity(),
            vec![Value::String("a".into()), Value::Null, Value::Null],
        ));
        let b = arena.insert(Record::new(
            node_entity(),
            vec![Value::String("b".into()), Value::Object(a), Value::Null],
        ));
        arena.record_mut(a).fields[1] = Value::Object(b);

        let mut w = StreamWriter::new();
        w.write_arena(&arena, a).unwrap();
        let bytes = w.into_bytes();

        let (decoded, root) = StreamReader::new(&bytes).read_arena().unwrap();
        assert_eq!(decoded.get(root).fields[0], Value::String("a".into()));
        let Value::Object(b_idx) = decoded.get(root).fields[1] else { panic!() };
        assert_eq!(decoded.get(b_idx).fields[0], Value::String("b".into()));
        let Value::Object(a_idx) = decoded.get(b_idx).fields[1] else { panic!() };
        assert_eq!(a_idx, root);
    }

    #[test]
    fn compact_mode_drops_non_compact_field() {
        let mut arena = Arena::new();
        let root = arena.insert(Record::new(
            node_entity(),
            vec![
                Value::String("root".into()),
                Value::Null,
                Value::String("debug info that should vanish".into()),
            ],
        ));

        let mut w = StreamWriter::new();
        // Default mode is Compact.
        w.write_arena(&arena, root).unwrap();
        let bytes = w.into_bytes();

        let (decoded, decoded_root) = StreamReader::new(&bytes).read_arena().unwrap();
        assert_eq!(decoded.get(decoded_root).fields[2], Value::Null);
    }

    #[test]
    fn full_mode_keeps_non_compact_field() {
        let mut arena = Arena::new();
        let root = arena.insert(Record::new(
            node_entity(),
            vec![
                Value::String("root".into()),
                Value::Null,
                Value::String("kept".into()),
            ],
        ));

        let mut w = StreamWriter::new();
        w.set_mode(Mode::Full);
        w.write_arena(&arena, root).unwrap();
        let bytes = w.into_bytes();

        let (decoded, decoded_root) = StreamReader::new(&bytes).read_arena().unwrap();
        assert_eq!(decoded.get(decoded_root).fields[2], Value::String("kept".into()));
    }

    #[test]
    fn unknown_object_sid_is_an_error() {
        // A hand-crafted stream that references sid 5 (existing) without ever defining it.
        let mut w = Writer::new();
        w.write_u64((5u64 << 1) | 0);
        let bytes = w.into_bytes();
        let result = StreamReader::new(&bytes).read_arena();
        assert!(matches!(result, Err(CodecError::UnknownObjectSid(5))));
    }

    #[test]
    fn record_over_the_configured_cap_is_rejected() {
        let mut arena = Arena::new();
        let root = arena.insert(Record::new(
            leaf_entity(),
            vec![Value::I32(7)],
        ));

        let mut w = StreamWriter::new();
        w.set_max_record_bytes(Some(1));
        let result = w.write_arena(&arena, root);
        assert!(matches!(result, Err(CodecError::PayloadTooLarge { cap: 1 })));
    }

    #[test]
    fn record_within_the_configured_cap_still_roundtrips() {
        let mut arena = Arena::new();
        let root = arena.insert(Record::new(leaf_entity(), vec![Value::I32(7)]));

        let mut w = StreamWriter::new();
        w.set_max_record_bytes(Some(256));
        w.write_arena(&arena, root).unwrap();
        let bytes = w.into_bytes();

        let (decoded, decoded_root) = StreamReader::new(&bytes).read_arena().unwrap();
        assert_eq!(decoded.get(decoded_root).fields[0], Value::I32(7));
    }
}
