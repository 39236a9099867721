//! # Core Module
//!
//! The foundation the selection engine runs on: read-only molecular tables, the spatial
//! index and residue/atom identifier knowledge.
//!
//! ## Architecture
//!
//! - **Molecular Representation** ([`models`]) - Flat atom, residue, chain and entity
//!   tables with half-open index ranges and back-indices
//! - **Spatial Search** ([`geometry`]) - A kd-like subdivision tree with reusable result
//!   buffers for radius queries
//! - **Structural Knowledge** ([`utils`]) - Backbone atom names, standard residue names
//!   and water names
//!
//! Nothing in this module knows about queries; it only provides data and geometry.

pub mod geometry;
pub mod models;
pub mod utils;
