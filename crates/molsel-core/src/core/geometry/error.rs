use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Query radius must be a finite, non-negative number (got {radius})")]
    InvalidRadius { radius: f64 },

    #[error("Leaf size must be at least 1")]
    InvalidLeafSize,

    #[error("Point index {index} is out of bounds for a tree of {count} points")]
    IndexOutOfBounds { index: usize, count: usize },
}

/// Validates a query radius: it must be finite and non-negative.
pub(crate) fn check_radius(radius: f64) -> Result<(), GeometryError> {
    if radius.is_finite() && radius >= 0.0 {
        Ok(())
    } else {
        Err(GeometryError::InvalidRadius { radius })
    }
}
