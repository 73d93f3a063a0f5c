//! Foundation types shared by every Quill crate.
pub mod position;
pub mod value;

pub use position::{Position, Span};
pub use value::{OBJECT_PLACEHOLDER, Object, Value, format_number, parse_number};
