//! Dense 2D pixel grids.

use crate::error::{CommonError, CommonResult};

/// A single-band pixel grid in row-major order (row 0 first).
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    /// Pixel values, `width * height` of them.
    pub data: Vec<f32>,
    /// Number of columns.
    pub width: usize,
    /// Number of rows.
    pub height: usize,
}

impl Grid {
    /// Wrap a row-major buffer, checking that it matches the declared shape.
    pub fn new(data: Vec<f32>, width: usize, height: usize) -> CommonResult<Self> {
        if data.len() != width * height {
            return Err(CommonError::ShapeMismatch {
                expected: (width, height),
                actual: (data.len(), 1),
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// A grid of `width * height` copies of `value`.
    pub fn filled(width: usize, height: usize, value: f32) -> Self {
        Self {
            data: vec![value; width * height],
            width,
            height,
        }
    }

    /// `(width, height)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Get the value at a specific grid coordinate.
    pub fn get(&self, col: usize, row: usize) -> Option<f32> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.data.get(row * self.width + col).copied()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Fail unless `other` has exactly this grid's shape.
    pub fn ensure_same_shape(&self, other: &Grid) -> CommonResult<()> {
        if self.shape() != other.shape() {
            return Err(CommonError::ShapeMismatch {
                expected: self.shape(),
                actual: other.shape(),
            });
        }
        Ok(())
    }
}
