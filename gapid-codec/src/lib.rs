//! Structured binary interchange for capture data.
//!
//! Four layers, bottom to top:
//!
//! - [`vle`]: the variable-length integer encoding every other layer builds on.
//! - [`primitive`]: byte-oriented [`primitive::Writer`]/[`primitive::Reader`] plus the
//!   [`primitive::Encode`]/[`primitive::Decode`] traits implemented by every wire type.
//! - [`entity`]: self-describing record schemas ([`entity::Entity`], [`entity::FieldSchema`]).
//! - [`value`]: dynamically-typed field values ([`value::Value`]) and the cycle-safe
//!   [`value::Arena`] object graph container.
//! - [`stream`]: ties the above together into a stream of interned entity/object references,
//!   with the `Compact`/`Full` mode control block.

pub mod entity;
pub mod error;
pub mod primitive;
pub mod stream;
pub mod value;
pub mod vle;

pub use entity::{Entity, FieldKind, FieldSchema};
pub use error::CodecError;
pub use primitive::{Decode, Encode, Reader, Writer};
pub use stream::{Mode, StreamReader, StreamWriter};
pub use value::{Arena, ArenaIdx, Record, Value};
