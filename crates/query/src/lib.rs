//! Path queries over template data and the library of named functions that
//! templates apply as filters.
pub mod engine;
pub mod error;
mod functions;
pub mod lookup;
pub mod path;
pub mod registry;

pub use engine::{QueryEngine, QueryOptions, query, resolve_segments};
pub use error::{FunctionError, QueryError};
pub use path::{PathSegment, QueryFilter, QueryPath, parse_path};
pub use registry::{Category, FunctionRegistry, FunctionSignature, Handler, Parameter};
