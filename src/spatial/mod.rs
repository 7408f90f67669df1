//! Grid coordinates, tile ids and chunked cell storage.

mod index;

pub use index::*;
