//! # Geometry Module
//!
//! Static spatial partitioning for repeated radius queries over 3D point sets.
//!
//! ## Overview
//!
//! A [`tree::SpatialTree`] is built once over a point set and answers "all points
//! within radius r of X" by recursive descent with bounding-interval pruning. Results
//! are written into a caller-owned [`buffer::ResultBuffer`], so a single buffer can be
//! reused across millions of queries without reallocating.
//!
//! The module has no molecular knowledge; the query layer feeds it atom indices and
//! coordinates.

pub mod bounds;
pub mod buffer;
pub mod error;
pub mod tree;

pub use bounds::Box3D;
pub use buffer::{IndexBuffer, PriorityBuffer, ResultBuffer};
pub use error::GeometryError;
pub use tree::{SpatialQuery, SpatialTree, TreeNode};
