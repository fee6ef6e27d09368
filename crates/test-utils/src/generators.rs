//! Deterministic grid generators for synthetic forecast fields and patches.

/// Creates a test grid with predictable values.
///
/// Each cell value is calculated as: `col * 1000 + row`, so a value read
/// back identifies the cell it came from.
///
/// # Example
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50);
/// assert_eq!(grid[1], 1000.0);  // col=1, row=0
/// assert_eq!(grid[10], 1.0);    // col=0, row=1
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

/// Creates a reflectivity-like field in dBZ: a single storm cell centred on
/// the grid, peaking at `peak` and falling off to zero.
pub fn create_storm_grid(width: usize, height: usize, peak: f32) -> Vec<f32> {
    let cx = width.saturating_sub(1) as f32 / 2.0;
    let cy = height.saturating_sub(1) as f32 / 2.0;
    let radius = (width.min(height) as f32 / 2.0).max(1.0);

    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let dist = ((col as f32 - cx).powi(2) + (row as f32 - cy).powi(2)).sqrt();
            data.push((peak * (1.0 - dist / radius)).max(0.0));
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_grid() {
        let grid = create_test_grid(3, 2);
        assert_eq!(grid, vec![0.0, 1000.0, 2000.0, 1.0, 1001.0, 2001.0]);
    }

    #[test]
    fn test_storm_grid_peaks_in_centre() {
        let grid = create_storm_grid(9, 9, 60.0);
        let centre = grid[4 * 9 + 4];
        assert!((centre - 60.0).abs() < 1e-4);
        assert_eq!(grid[0], 0.0);
    }
}
