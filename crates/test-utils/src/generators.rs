//! Test data generators for creating synthetic precipitation fields.
//!
//! These generators create predictable, verifiable test data patterns
//! that can be used across the test suite.

/// Creates a test grid with predictable values.
///
/// Each cell value is calculated as: `col * 1000 + row`
///
/// # Example
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50);
/// assert_eq!(grid[1], 1000.0);
/// assert_eq!(grid[10], 1.0);
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f32);
        }
    }
    data
}

/// Creates a storm cell: a gaussian bump of rainfall in millimetres.
///
/// The peak (`peak_mm`) sits at (`center_col`, `center_row`) and decays
/// with the given radius (in cells). Cells far from the centre are exactly
/// zero so the "dry" masking path is exercised.
pub fn create_storm_cell(
    width: usize,
    height: usize,
    center_col: f32,
    center_row: f32,
    radius: f32,
    peak_mm: f32,
) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let dx = col as f32 - center_col;
            let dy = row as f32 - center_row;
            let d2 = (dx * dx + dy * dy) / (radius * radius);
            let value = peak_mm * (-d2).exp();
            data.push(if value < 0.01 { 0.0 } else { value });
        }
    }
    data
}

/// Creates a uniform grid filled with a single value.
pub fn create_constant_grid(width: usize, height: usize, value: f32) -> Vec<f32> {
    vec![value; width * height]
}
