//! Rendering module for converting documents to output artifacts.

mod json;
mod text;

pub use json::{to_json, JsonFormat};
pub use text::{render_line, to_text, CELL_SEPARATOR, TABLE_MARKER, UNANSWERED};
