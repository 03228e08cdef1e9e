// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;

/// Errors that can occur during solver configuration, I/O, or execution.
#[derive(Debug)]
pub enum EikonalError {
    /// Neither a speed field nor a constant speed was configured.
    MissingSpeed,
    /// The output grid size was never set.
    OutputSizeUnset,
    /// Grid shape is invalid (an axis has no nodes).
    InvalidGridShape {
        /// The axis index.
        axis: usize,
        /// The size provided.
        size: usize,
    },
    /// Grid spacing along an axis is not positive and finite.
    InvalidGridSpacing {
        /// The axis index.
        axis: usize,
        /// The spacing provided.
        value: f64,
    },
    /// Array shape does not match expected shape.
    ShapeMismatch {
        /// The expected shape.
        expected: Vec<usize>,
        /// The actual shape encountered.
        got: Vec<usize>,
    },
    /// Stopping value is NaN.
    InvalidStoppingValue(f64),
    /// Target offset is negative or not finite.
    InvalidTargetOffset(f64),
    /// Speed normalization factor is not positive and finite.
    InvalidNormalizationFactor(f64),
    /// Unsupported data type in file.
    UnsupportedDtype(String),
    /// Unsupported file format (unrecognized extension).
    UnsupportedFileFormat(String),
    /// Expected MAT variable not found in file.
    MatVariableNotFound {
        /// The variable name that was requested.
        expected: String,
        /// The variable names that are available.
        available: Vec<String>,
    },
    /// I/O error occurred.
    IoError(std::io::Error),
    /// Other error with a descriptive message.
    Other(String),
}

impl fmt::Display for EikonalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EikonalError::MissingSpeed => {
                write!(f, "no speed field or speed constant configured")
            }
            EikonalError::OutputSizeUnset => write!(f, "output size is not set"),
            EikonalError::InvalidGridShape { axis, size } => {
                write!(
                    f,
                    "invalid grid shape: axis {} has size {} (must be >= 1)",
                    axis, size
                )
            }
            EikonalError::InvalidGridSpacing { axis, value } => {
                write!(
                    f,
                    "invalid grid spacing on axis {}: {} (must be positive and finite)",
                    axis, value
                )
            }
            EikonalError::ShapeMismatch { expected, got } => {
                write!(f, "shape mismatch: expected {:?}, got {:?}", expected, got)
            }
            EikonalError::InvalidStoppingValue(v) => {
                write!(f, "invalid stopping value: {} (must not be NaN)", v)
            }
            EikonalError::InvalidTargetOffset(v) => {
                write!(
                    f,
                    "invalid target offset: {} (must be non-negative and finite)",
                    v
                )
            }
            EikonalError::InvalidNormalizationFactor(v) => {
                write!(
                    f,
                    "invalid normalization factor: {} (must be positive and finite)",
                    v
                )
            }
            EikonalError::UnsupportedDtype(dtype) => {
                write!(f, "unsupported dtype: {}", dtype)
            }
            EikonalError::UnsupportedFileFormat(ext) => {
                write!(f, "unsupported file format: {}", ext)
            }
            EikonalError::MatVariableNotFound {
                expected,
                available,
            } => {
                write!(
                    f,
                    "MAT variable '{}' not found; available variables: {:?}",
                    expected, available
                )
            }
            EikonalError::IoError(e) => write!(f, "I/O error: {}", e),
            EikonalError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for EikonalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EikonalError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for EikonalError {
    fn from(e: std::io::Error) -> Self {
        EikonalError::IoError(e)
    }
}

/// Convenience type alias for Results with EikonalError.
pub type Result<T> = std::result::Result<T, EikonalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_configuration_errors() {
        assert_eq!(
            EikonalError::MissingSpeed.to_string(),
            "no speed field or speed constant configured"
        );
        assert_eq!(
            EikonalError::OutputSizeUnset.to_string(),
            "output size is not set"
        );
    }

    #[test]
    fn display_invalid_grid_shape() {
        let e = EikonalError::InvalidGridShape { axis: 1, size: 0 };
        assert_eq!(
            e.to_string(),
            "invalid grid shape: axis 1 has size 0 (must be >= 1)"
        );
    }

    #[test]
    fn display_invalid_grid_spacing() {
        let e = EikonalError::InvalidGridSpacing {
            axis: 0,
            value: -1.0,
        };
        assert_eq!(
            e.to_string(),
            "invalid grid spacing on axis 0: -1 (must be positive and finite)"
        );
    }

    #[test]
    fn display_invalid_target_offset() {
        let e = EikonalError::InvalidTargetOffset(-2.5);
        assert_eq!(
            e.to_string(),
            "invalid target offset: -2.5 (must be non-negative and finite)"
        );
    }

    #[test]
    fn display_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let e = EikonalError::IoError(io_err);
        assert!(e.to_string().contains("file not found"));
    }

    #[test]
    fn from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let e: EikonalError = io_err.into();
        assert!(matches!(e, EikonalError::IoError(_)));
        assert!(std::error::Error::source(&e).is_some());
    }

    #[test]
    fn display_mat_variable_not_found() {
        let e = EikonalError::MatVariableNotFound {
            expected: "speed".to_string(),
            available: vec!["velocity".to_string(), "grid".to_string()],
        };
        assert!(e.to_string().contains("speed"));
        assert!(e.to_string().contains("velocity"));
    }
}
