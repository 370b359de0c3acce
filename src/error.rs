use std::error;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]

/**
 * Error to represent an invalid grid configuration or a fault in the halo
 * exchange protocol.
 */
pub enum Error {
    UnevenDecomposition { ny: usize, size: usize },
    GridTooSmall { axis: &'static str, len: usize },
    RankOutOfRange { rank: usize, size: usize },
    NonPositiveSpacing(f64),
    FieldSizeMismatch { expected: usize, actual: usize },
    Communication(String),
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        use Error::*;

        match self {
            UnevenDecomposition { ny, size } => {
                writeln!(fmt, "{} rows cannot be split evenly over {} ranks", ny, size)
            }
            GridTooSmall { axis, len } => {
                writeln!(fmt, "grid extent {} on the {} axis is below the stencil minimum of 3", len, axis)
            }
            RankOutOfRange { rank, size } => {
                writeln!(fmt, "rank {} is not valid in a group of size {}", rank, size)
            }
            NonPositiveSpacing(h) => writeln!(fmt, "grid spacing must be positive and finite, got {}", h),
            FieldSizeMismatch { expected, actual } => {
                writeln!(fmt, "array length {} does not match the subdomain size {}", actual, expected)
            }
            Communication(what) => writeln!(fmt, "halo exchange failed: {}", what),
        }
    }
}

impl error::Error for Error {}
