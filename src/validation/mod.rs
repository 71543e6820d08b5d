//! Envelope validation
//!
//! Schema-driven structural checks and checksum calculation for save
//! envelopes. This is the leaf of the persistence stack: the serializer and
//! the migrator both delegate to [`Validator`].

mod schema;
mod validator;

pub use schema::{
    FieldKind, FieldRule, Schema, SchemaRegistry, CORE_ENVELOPE_FIELDS, CURRENT_VERSION,
    SCHEMA_CHAIN,
};
pub use validator::{canonical_json, Validator, CHECKSUM_FIELD};
