//! # appletv-archive
//!
//! Lazy, schema-less lookups over keyed archives: the binary, UID-indexed
//! object graphs that Apple accessories use when now-playing metadata is
//! delivered as an opaque blob instead of a structured message.
//!
//! The graph is an immutable arena mapping object ids to decoded values.
//! Object `1` is the root keys dictionary (`name -> reference`), which may
//! reference a nested `"metadata"` dictionary of the same shape. Nothing is
//! parsed up front: every lookup resolves independently, and a graph where
//! only some keys are populated never errors for the keys that are absent.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use appletv_archive::ArchiveGraph;
//!
//! let graph = ArchiveGraph::from_bytes(&blob)?;
//! if graph.is_valid() {
//!     if let Some(title) = graph.get_str("title") {
//!         println!("Now playing: {title}");
//!     }
//! }
//! ```

pub mod error;
pub mod graph;
pub mod value;

pub use error::{ArchiveError, Result};
pub use graph::{ArchiveGraph, ROOT_OBJECT_ID};
pub use value::ArchiveValue;
