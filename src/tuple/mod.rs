//! Tuple and schema value types.
//!
//! - [`Type`] / [`Field`] - Fixed-width column types and values
//! - [`TupleDesc`] - Table schema
//! - [`Tuple`] - A row, tagged with its [`RecordId`](crate::RecordId) once stored

mod desc;
mod field;
#[allow(clippy::module_inception)]
mod tuple;

pub use desc::{TdItem, TupleDesc};
pub use field::{Field, Type};
pub use tuple::Tuple;
