//! # Core Models Module
//!
//! Tabular representation of a single molecular model snapshot.
//!
//! ## Overview
//!
//! A model is stored as four flat tables (atoms, residues, chains, entities). Each row
//! of an outer table owns a contiguous half-open range of the inner tables, and every
//! inner row carries back-indices to its owners. All cross-references are plain `usize`
//! indices so that the query layer can work on integer sets.
//!
//! ## Key Components
//!
//! - [`atom`] - Per-atom identity, coordinates and back-indices
//! - [`residue`] - Residue identity (internal and author naming) and atom range
//! - [`chain`] - Chain identity with atom and residue ranges
//! - [`entity`] - Entity identity, classification and ranges
//! - [`model`] - The assembled, read-only [`model::MoleculeModel`]
//! - [`builder`] - Hierarchical construction computing all ranges and back-indices
//!
//! ## Usage
//!
//! ```ignore
//! use molsel::core::models::{atom::Atom, builder::MoleculeModelBuilder};
//! use molsel::core::models::{entity::EntityType, residue::Residue};
//!
//! let mut builder = MoleculeModelBuilder::new("1ABC");
//! builder.start_entity("1", EntityType::Polymer, "polymer");
//! builder.start_chain("A", "A")?;
//! builder.start_residue(Residue::new("ALA", 1))?;
//! builder.add_atom(Atom::new(1, "CA", "C", Point3::new(0.0, 0.0, 0.0)))?;
//! let model = builder.build()?;
//! ```

pub mod atom;
pub mod builder;
pub mod chain;
pub mod entity;
pub mod model;
pub mod residue;
