//! Correlation matrices and their Cholesky factor loadings.
//!
//! A correlation matrix `C` is turned into factor loadings through the lower
//! triangular Cholesky factor `L` with `C = L * L^T`. Row `i` of `L` loads
//! output factor `i` on the independent factors `0..=i`; the entries above
//! the diagonal are exact zeros and are skipped when increments are
//! combined.

use stochastic_core::{Result, SimulationError};

/// Tolerance for the unit diagonal and the symmetry checks.
const EPSILON: f64 = 1e-10;

/// Validated correlation matrix.
///
/// - Square and symmetric
/// - Diagonal elements equal to 1.0
/// - Off-diagonal elements in [-1, 1]
///
/// # Examples
///
/// ```
/// use stochastic_models::brownian::CorrelationMatrix;
///
/// let correlation = CorrelationMatrix::new(vec![vec![1.0, 0.5], vec![0.5, 1.0]]).unwrap();
/// let loadings = correlation.factor_loadings().unwrap();
///
/// assert_eq!(loadings[0], vec![1.0, 0.0]);
/// assert!((loadings[1][0] - 0.5).abs() < 1e-15);
/// assert!((loadings[1][1] - 0.75_f64.sqrt()).abs() < 1e-15);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct CorrelationMatrix {
    rows: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    /// Validate `rows` as a correlation matrix.
    ///
    /// # Errors
    ///
    /// - `DimensionMismatch` if the matrix is empty or not square
    /// - `InvalidParameter` for a non-unit diagonal, an asymmetric pair or an
    ///   entry outside [-1, 1]
    pub fn new(rows: Vec<Vec<f64>>) -> Result<Self> {
        let dim = rows.len();
        if dim == 0 {
            return Err(SimulationError::DimensionMismatch {
                what: "correlation matrix rows",
                expected: 1,
                got: 0,
            });
        }
        if let Some(row) = rows.iter().find(|row| row.len() != dim) {
            return Err(SimulationError::DimensionMismatch {
                what: "correlation matrix columns",
                expected: dim,
                got: row.len(),
            });
        }

        for (i, row) in rows.iter().enumerate() {
            if row[i].is_nan() || (row[i] - 1.0).abs() > EPSILON {
                return Err(SimulationError::invalid_parameter(
                    "correlation",
                    format!("diagonal element {} is {}, expected 1", i, row[i]),
                ));
            }
        }

        for i in 0..dim {
            for j in (i + 1)..dim {
                let value = rows[i][j];
                if value.is_nan() || (value - rows[j][i]).abs() > EPSILON {
                    return Err(SimulationError::invalid_parameter(
                        "correlation",
                        format!("matrix is not symmetric at ({}, {})", i, j),
                    ));
                }
                if !(-1.0..=1.0).contains(&value) {
                    return Err(SimulationError::invalid_parameter(
                        "correlation",
                        format!("element ({}, {}) = {} is outside [-1, 1]", i, j, value),
                    ));
                }
            }
        }

        Ok(Self { rows })
    }

    /// Identity matrix of dimension `dim`.
    pub fn identity(dim: usize) -> Self {
        let rows = (0..dim)
            .map(|i| (0..dim).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
            .collect();
        Self { rows }
    }

    /// Matrix dimension.
    pub fn dim(&self) -> usize {
        self.rows.len()
    }

    /// Element at (i, j).
    pub fn get(&self, i: usize, j: usize) -> Result<f64> {
        stochastic_core::check_index("correlation row", i, self.dim())?;
        stochastic_core::check_index("correlation column", j, self.dim())?;
        Ok(self.rows[i][j])
    }

    /// Rows of the lower triangular Cholesky factor.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if the matrix is not positive definite.
    pub fn factor_loadings(&self) -> Result<Vec<Vec<f64>>> {
        let n = self.dim();
        let mut lower = vec![vec![0.0; n]; n];

        for i in 0..n {
            for j in 0..=i {
                let sum: f64 = (0..j).map(|k| lower[i][k] * lower[j][k]).sum();
                if i == j {
                    let diag = self.rows[i][i] - sum;
                    if diag <= 0.0 {
                        return Err(not_positive_definite());
                    }
                    lower[i][i] = diag.sqrt();
                } else {
                    let l_jj = lower[j][j];
                    if l_jj <= 0.0 {
                        return Err(not_positive_definite());
                    }
                    lower[i][j] = (self.rows[i][j] - sum) / l_jj;
                }
            }
        }

        Ok(lower)
    }
}

fn not_positive_definite() -> SimulationError {
    SimulationError::invalid_parameter("correlation", "matrix is not positive definite")
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_validation() {
        assert!(CorrelationMatrix::new(vec![]).is_err());
        assert!(CorrelationMatrix::new(vec![vec![1.0, 0.5]]).is_err());
        assert!(CorrelationMatrix::new(vec![vec![0.9, 0.0], vec![0.0, 1.0]]).is_err());
        assert!(CorrelationMatrix::new(vec![vec![1.0, 0.5], vec![0.4, 1.0]]).is_err());
        assert!(CorrelationMatrix::new(vec![vec![1.0, 1.5], vec![1.5, 1.0]]).is_err());
        assert!(CorrelationMatrix::new(vec![vec![f64::NAN]]).is_err());
    }

    #[test]
    fn test_identity_loadings() {
        let loadings = CorrelationMatrix::identity(3).factor_loadings().unwrap();
        assert_eq!(
            loadings,
            vec![
                vec![1.0, 0.0, 0.0],
                vec![0.0, 1.0, 0.0],
                vec![0.0, 0.0, 1.0]
            ]
        );
    }

    #[test]
    fn test_loadings_reproduce_matrix() {
        let rows = vec![
            vec![1.0, 0.3, -0.2],
            vec![0.3, 1.0, 0.5],
            vec![-0.2, 0.5, 1.0],
        ];
        let correlation = CorrelationMatrix::new(rows.clone()).unwrap();
        let lower = correlation.factor_loadings().unwrap();

        for i in 0..3 {
            for j in 0..3 {
                let product: f64 = (0..3).map(|k| lower[i][k] * lower[j][k]).sum();
                assert_relative_eq!(product, rows[i][j], epsilon = 1e-12);
            }
            for j in (i + 1)..3 {
                assert_eq!(lower[i][j], 0.0);
            }
        }
    }

    #[test]
    fn test_perfect_correlation_is_not_positive_definite() {
        let correlation = CorrelationMatrix::new(vec![vec![1.0, 1.0], vec![1.0, 1.0]]).unwrap();
        assert!(matches!(
            correlation.factor_loadings(),
            Err(SimulationError::InvalidParameter { name: "correlation", .. })
        ));
    }

    #[test]
    fn test_get_out_of_range() {
        let correlation = CorrelationMatrix::identity(2);
        assert_eq!(correlation.get(1, 1).unwrap(), 1.0);
        assert!(correlation.get(2, 0).is_err());
    }
}
