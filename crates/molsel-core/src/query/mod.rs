//! # Query Module
//!
//! The selection engine: composable queries that map a [`Context`] to a sequence of
//! [`Fragment`]s.
//!
//! ## Architecture
//!
//! - **Execution Environment** ([`context`], [`mask`]) - A read-only model, the subset
//!   of active atoms and a lazily built spatial index over them
//! - **Results** ([`fragment`]) - Immutable sorted atom sets with cached structural
//!   identity, and sequences of them
//! - **Expressions** ([`builder`], [`algebraic`], [`schema`]) - Persistent query values
//!   built from selectors and modifiers, per-atom predicates and identity schemas
//! - **Compilation** ([`compiler`], [`grammar`]) - Turning expressions or query text into
//!   executable [`Query`] values
//! - **Tuning** ([`config`]) - Spatial index and buffer parameters
//!
//! Compiled queries are pure functions of their context; they can be shared between
//! threads and reused across contexts.

pub mod algebraic;
pub mod builder;
pub mod compiler;
pub mod config;
pub mod context;
pub mod error;
pub mod fragment;
pub mod grammar;
pub mod mask;
pub mod schema;

#[cfg(test)]
mod fixtures;

pub use builder::QueryExpr;
pub use compiler::{Query, Source, compile, parse, to_query};
pub use config::{ConfigError, QueryConfig, QueryConfigBuilder};
pub use context::Context;
pub use error::QueryError;
pub use fragment::{Fragment, FragmentSeq, FragmentSeqBuilder, HashFragmentSeqBuilder};
pub use grammar::ParseError;
pub use mask::Mask;
pub use schema::{AsymIdSchema, EntityIdSchema, ResidueIdSchema};
