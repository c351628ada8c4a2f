//! BOM graph model
//!
//! Parts are nodes and BOM items are weighted edges from the part being built
//! to the part it consumes. The edge set must always form a DAG: every insert
//! runs a reachability check first, and every traversal rejects cycles on its
//! own so that data written by other tools cannot send it into a loop.
//!
//! A [`BomGraph`] is a plain in-memory snapshot. It is `Send + Sync`, so
//! explosions and rollups can run on any thread once the snapshot is read.

mod error;
mod explode;
mod graph;

pub use error::BomError;
pub use explode::{CostLine, CostRollup, ExplodedLine, Explosion, TreeLine};
pub use graph::{BomEdge, BomGraph};
