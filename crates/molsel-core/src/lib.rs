//! # molsel Core Library
//!
//! Composable substructure selection and fast radius search over large, read-only
//! molecular models.
//!
//! ## Architectural Philosophy
//!
//! The library is split into two layers with a strict dependency direction:
//!
//! - **[`core`]: The Foundation.** Stateless tabular data models (`MoleculeModel`),
//!   the static spatial index used for radius queries, and identifier tables.
//!
//! - **[`query`]: The Selection Engine.** Contexts (the active atom subset and its
//!   lazily built spatial index), immutable fragment results, the query expression
//!   builder, its compiler and the textual grammar.
//!
//! A typical round trip:
//!
//! ```ignore
//! use molsel::query::{Context, builder};
//!
//! let ctx = Context::of_structure(model.clone());
//! let query = builder::residues_by_name(["HEM"]).ambient_residues(5.0).compile()?;
//! let pocket = query.execute(&ctx)?.union_atom_indices();
//! ```

pub mod core;
pub mod query;
