//! Rill AST <-> JSON bridge.
//!
//! Lossless, deterministic serialization of the AST to kind-tagged JSON,
//! and deserialization back -- including *hybrid* inputs in which any
//! node position holds a `{source: "..."}` fragment that is lexed and
//! parsed on demand. External tools can author programs mixing
//! structural and textual forms and hand them to the rest of the
//! pipeline unchanged.
//!
//! Round-trip guarantee: for any parser-produced AST `A`,
//! `deserialize(serialize(A))` is structurally equal to `A` modulo node
//! ids (which are session-local and never serialized) and synthetic
//! spans.

mod deserialize;
mod serialize;

pub use deserialize::{
    deserialize_program, deserialize_program_str, DeserializeError, DeserializeResult,
};
pub use serialize::{program_to_json, serialize_program, SerializeOptions};
