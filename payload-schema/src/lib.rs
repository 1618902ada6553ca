//! Payload schema registry, validator and type inferencer.
//!
//! Decoded sensor uplinks arrive as loose JSON records. This crate answers
//! two questions about such a record: does it match a known payload shape
//! (`validate`), and if it carries no label, which shape is it most likely
//! to be (`infer`). Both are pure functions over an immutable
//! [`SchemaRegistry`] built once at process start.

pub mod infer;
pub mod schema;
pub mod validate;

pub use infer::InferenceResult;
pub use schema::{PayloadSchema, RegistryError, SchemaRegistry, UNCLASSIFIED};
pub use validate::ValidationResult;
