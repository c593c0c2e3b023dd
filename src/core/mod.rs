pub mod error;
pub mod types;
pub mod value;

pub use error::{DbError, Result};
pub use types::{Column, DataType, ForeignKey, Row, Schema, Snapshot, estimated_row_bytes};
pub use value::Value;
