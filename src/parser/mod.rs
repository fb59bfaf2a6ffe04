//! Turning raw analysis blocks into an ordered, typed document.
//!
//! [`order_blocks`] re-sorts each page's children into reading order and
//! [`assemble`] walks the block graph to build a [`Document`](crate::model::Document).

mod assemble;
mod options;
mod order;

pub use assemble::assemble;
pub use options::{MissingGeometry, OrderOptions, DEFAULT_Y_TOLERANCE};
pub use order::{order_blocks, reading_order};
