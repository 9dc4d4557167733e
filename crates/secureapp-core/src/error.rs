//! # Error Types
//!
//! Validation failures raised by domain constructors and request checks.

use thiserror::Error;

/// A domain value violated one of its business rules.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A required string field was empty or whitespace-only.
    #[error("field '{0}' must not be empty")]
    EmptyField(&'static str),

    /// Price was negative.
    #[error("price must be non-negative, got {0}")]
    NegativePrice(f64),

    /// Price was NaN or infinite.
    #[error("price must be a finite number")]
    NonFinitePrice,

    /// A path pattern could not be parsed.
    #[error("invalid path pattern '{0}': {1}")]
    InvalidPattern(String, &'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_carry_context() {
        assert!(ValidationError::EmptyField("name").to_string().contains("name"));
        assert!(ValidationError::NegativePrice(-1.5).to_string().contains("-1.5"));
        assert!(ValidationError::InvalidPattern("api".into(), "must start with '/'")
            .to_string()
            .contains("must start with"));
    }
}
