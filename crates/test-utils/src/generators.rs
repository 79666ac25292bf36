//! Test data generators for synthetic Sentinel-2 band grids.
//!
//! Values are raw L2A digital numbers (reflectance * 10000), row-major.

/// Creates a band grid with predictable values.
///
/// Each cell value is `base + (row * width + col) * step`, so every pixel is
/// distinct and easy to locate in assertions.
///
/// # Arguments
///
/// * `width` - Number of columns
/// * `height` - Number of rows
/// * `base` - Value of the top-left pixel
/// * `step` - Increment per pixel in row-major order
///
/// # Example
///
/// ```
/// use test_utils::create_band_grid;
///
/// let grid = create_band_grid(3, 2, 1000.0, 10.0);
/// assert_eq!(grid.len(), 6);
/// assert_eq!(grid[0], 1000.0);
/// assert_eq!(grid[4], 1040.0); // row 1, col 1
/// ```
pub fn create_band_grid(width: usize, height: usize, base: f32, step: f32) -> Vec<f32> {
    (0..width * height).map(|i| base + i as f32 * step).collect()
}

/// Creates a grid filled with a constant value.
pub fn create_constant_grid(width: usize, height: usize, value: f32) -> Vec<f32> {
    vec![value; width * height]
}

/// Creates a deterministic pseudo-random reflectance grid.
///
/// Values fall in `0..=10000`. Roughly one pixel in eight is exactly zero,
/// which exercises the zero-band mask.
///
/// # Arguments
///
/// * `width` - Number of columns
/// * `height` - Number of rows
/// * `seed` - Seed value for deterministic generation
pub fn create_reflectance_grid(width: usize, height: usize, seed: u32) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let hash = simple_hash(col as u32, row as u32, seed);
            let value = if hash % 8 == 0 {
                0.0
            } else {
                (hash % 10001) as f32
            };
            data.push(value);
        }
    }
    data
}

/// Creates a grid of zeros with `value` at the given `(col, row)` positions.
pub fn create_grid_with_values(
    width: usize,
    height: usize,
    value: f32,
    positions: &[(usize, usize)],
) -> Vec<f32> {
    let mut data = vec![0.0f32; width * height];
    for &(col, row) in positions {
        if col < width && row < height {
            data[row * width + col] = value;
        }
    }
    data
}

/// Raw values a real band can carry that tend to break naive formulas:
/// zero, saturation, the undeclared no-data default, negative and tiny values.
pub fn edge_case_band_values() -> Vec<f32> {
    vec![
        0.0,
        1.0,
        -1.0,
        0.5,
        10000.0,
        65535.0,
        -9999.9,
        9999.9,
        f32::MIN_POSITIVE,
        f32::MAX,
    ]
}

/// Simple deterministic hash for reproducible test data.
fn simple_hash(x: u32, y: u32, seed: u32) -> u32 {
    let mut h = seed;
    h = h.wrapping_mul(31).wrapping_add(x);
    h = h.wrapping_mul(31).wrapping_add(y);
    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;
    h
}
