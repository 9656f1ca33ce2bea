//! # fg-store
//!
//! On-disk result store, cache validation and external grid file loading
//! for fstat-grid.
//!
//! The result file format is plain text: a `#`-prefixed header block with
//! provenance and serialized-parameter lines, one column-name line, then one
//! whitespace-separated row per grid point. The same tolerant parser that
//! re-loads these files backs the cache validator.

mod cache;
mod gridfile;
mod result_file;

pub use cache::check_cache;
pub use gridfile::{load_grid_file, GridFile};
pub use result_file::{load_table, save_table, LoadedTable, Provenance};
