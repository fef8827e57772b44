//! Rectangular travel-time matrix with explicit unreachable cells.

use std::time::Duration;

use super::error::TravelTimeError;

/// Travel times from each origin (row) to each destination (column).
///
/// A cell is `None` when the provider found no path. The matrix is always
/// rectangular: construction fails on ragged input.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use teamroute_core::DurationMatrix;
///
/// # fn main() -> Result<(), teamroute_core::TravelTimeError> {
/// let matrix = DurationMatrix::from_seconds(vec![
///     vec![Some(300.0), None],
///     vec![Some(1200.0), Some(200.0)],
/// ])?;
/// assert_eq!(matrix.shape(), (2, 2));
/// assert_eq!(matrix.get(0, 0), Some(Duration::from_secs(300)));
/// assert_eq!(matrix.get(0, 1), None);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DurationMatrix {
    rows: usize,
    cols: usize,
    cells: Vec<Option<Duration>>,
}

impl DurationMatrix {
    /// Build a matrix from row vectors.
    ///
    /// # Errors
    ///
    /// Returns [`TravelTimeError::MalformedResponse`] when the rows differ in
    /// length.
    pub fn from_rows(rows: Vec<Vec<Option<Duration>>>) -> Result<Self, TravelTimeError> {
        let row_count = rows.len();
        let cols = rows.first().map_or(0, Vec::len);
        if let Some((index, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != cols) {
            return Err(TravelTimeError::MalformedResponse {
                message: format!(
                    "duration matrix row {index} has {} cells, expected {cols}",
                    row.len()
                ),
            });
        }
        Ok(Self {
            rows: row_count,
            cols,
            cells: rows.into_iter().flatten().collect(),
        })
    }

    /// Build a matrix from raw seconds as reported by routing services.
    ///
    /// `None`, negative, NaN, infinite and overflowing values all become
    /// unreachable cells.
    ///
    /// # Errors
    ///
    /// Returns [`TravelTimeError::MalformedResponse`] on ragged rows.
    pub fn from_seconds(rows: Vec<Vec<Option<f64>>>) -> Result<Self, TravelTimeError> {
        Self::from_rows(
            rows.into_iter()
                .map(|row| row.into_iter().map(|cell| cell.and_then(seconds_to_duration)).collect())
                .collect(),
        )
    }

    /// Number of rows (origins).
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns (destinations).
    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`.
    #[must_use]
    pub const fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Travel time from origin `row` to destination `col`.
    ///
    /// Returns `None` for unreachable cells and for indices outside the
    /// matrix.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<Duration> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.cells
            .get(row.checked_mul(self.cols)?.checked_add(col)?)
            .copied()
            .flatten()
    }

    /// Iterate one column top to bottom.
    pub fn column(&self, col: usize) -> impl Iterator<Item = Option<Duration>> + '_ {
        (0..self.rows).map(move |row| self.get(row, col))
    }
}

fn seconds_to_duration(seconds: f64) -> Option<Duration> {
    if seconds.is_sign_negative() {
        return None;
    }
    Duration::try_from_secs_f64(seconds).ok()
}
