//! The schema contract (`spec.md` §3 "Schema (external, immutable)").
//!
//! Schema construction, validation, and introspection are out of scope for
//! this crate (`spec.md` §1): callers hand the executor an already-built
//! [`Schema`] value. What lives here is only the *shape* the executor needs
//! to read from that schema while it runs — field/argument/type lookups,
//! `resolve_type`/`is_type_of`, and the possible-types index for abstract
//! types.

pub mod meta;
pub mod model;

pub use meta::{ArgumentDef, FieldDef, InputFieldDef, TypeDef, TypeRef};
pub use model::Schema;
