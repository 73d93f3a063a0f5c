//! Tree-walking renderer for Quill templates.
//!
//! Each call to [`render`] owns a fresh [`RenderContext`]; the template and
//! the function registry are only read, so independent renders may run on
//! separate threads.
mod context;
mod error;
mod eval;
mod options;
mod renderer;

pub use context::{FrameGuard, RenderContext};
pub use error::{RenderError, RenderErrorKind};
pub use options::RenderOptions;
pub use renderer::{RenderOutput, render, render_with};
