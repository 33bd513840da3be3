//! Annotation core for redline.
//!
//! The diff renderer fills a [`surface::Surface`]; this crate indexes its rows
//! by `(file, line)`, runs the two-step range selection, paints stored comments
//! after their anchor rows and persists comments and the review verdict in SQLite.

pub mod anchor;
pub mod db;
pub mod error;
pub mod lifecycle;
pub mod row_index;
pub mod schema;
pub mod selection;
pub mod store;
pub mod surface;
pub mod types;
