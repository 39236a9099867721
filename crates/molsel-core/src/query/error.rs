use super::config::ConfigError;
use super::grammar::ParseError;
use crate::core::geometry::GeometryError;
use crate::core::models::builder::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Radius must be a finite, non-negative number (got {radius})")]
    InvalidRadius { radius: f64 },

    #[error("Invalid box: min {min:?} must not exceed max {max:?} on any axis")]
    InvalidBox { min: [f64; 3], max: [f64; 3] },

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Atom index {index} is out of bounds for a model of {count} atoms")]
    AtomIndexOutOfBounds { index: usize, count: usize },

    #[error("Index {index} is out of bounds for the {table} table ({count} rows)")]
    RowIndexOutOfBounds {
        table: &'static str,
        index: usize,
        count: usize,
    },

    #[error("Atom {index} is not active in the query context")]
    AtomNotInContext { index: usize },

    #[error("Atom indices must be strictly increasing (found {previous} followed by {next})")]
    UnsortedAtomIndices { previous: usize, next: usize },

    #[error("A fragment must contain at least one atom")]
    EmptyFragment,

    #[error("Spatial index error: {source}")]
    Geometry {
        #[from]
        source: GeometryError,
    },

    #[error("Model error: {source}")]
    Model {
        #[from]
        source: ModelError,
    },

    #[error("Configuration error: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("{source}")]
    Parse {
        #[from]
        source: ParseError,
    },
}
