//! Dense reference model backed by nalgebra's LU decomposition.
//!
//! `DenseModel` turns a pair of closures (residual and Jacobian over a named
//! parameter set) into a [`ContinuationModel`]. It is meant for small systems,
//! prototyping, and as the reference backend the continuation core is tested
//! against; large discretizations should implement the trait directly on top
//! of their own sparse solver.

use std::collections::BTreeMap;
use std::ops::Index;

use nalgebra::linalg::LU;
use nalgebra::{DMatrix, DVector, Dyn};
use serde::{Deserialize, Serialize};

use crate::error::{ContinuationError, Result};
use crate::model::ContinuationModel;

/// Named scalar parameters participating in F.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(BTreeMap<String, f64>);

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    /// Update an existing parameter. Unknown names are rejected so that a
    /// misspelled continuation parameter fails loudly.
    pub fn set(&mut self, name: &str, value: f64) -> Result<()> {
        match self.0.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(ContinuationError::UnknownParameter(name.to_string())),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, &value)| (name.as_str(), value))
    }
}

/// `params["name"]` shorthand for use inside residual and Jacobian closures.
///
/// # Panics
///
/// Panics if `name` is not defined. Use [`ParameterSet::get`] when the name
/// may be missing.
impl Index<&str> for ParameterSet {
    type Output = f64;

    fn index(&self, name: &str) -> &f64 {
        self.0
            .get(name)
            .unwrap_or_else(|| panic!("parameter `{name}` is not defined"))
    }
}

/// Jacobian of a [`DenseModel`]: the assembled matrix plus its LU factors, so
/// repeated solves with the same Jacobian factor only once.
pub struct DenseJacobian {
    matrix: DMatrix<f64>,
    lu: LU<f64, Dyn, Dyn>,
}

impl DenseJacobian {
    pub fn new(matrix: DMatrix<f64>) -> Self {
        let lu = matrix.clone().lu();
        Self { matrix, lu }
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }
}

pub struct DenseModel<F, J> {
    dim: usize,
    params: ParameterSet,
    rhs_fn: F,
    jacobian_fn: J,
    bordered: bool,
}

impl<F, J> DenseModel<F, J>
where
    F: FnMut(&DVector<f64>, &ParameterSet) -> DVector<f64>,
    J: FnMut(&DVector<f64>, &ParameterSet) -> DMatrix<f64>,
{
    pub fn new(dim: usize, params: ParameterSet, rhs_fn: F, jacobian_fn: J) -> Self {
        Self {
            dim,
            params,
            rhs_fn,
            jacobian_fn,
            bordered: false,
        }
    }

    /// Solve the corrector's augmented system in one factorization instead of
    /// two solves with J.
    pub fn with_bordered_solver(mut self, enabled: bool) -> Self {
        self.bordered = enabled;
        self
    }

    pub fn parameters(&self) -> &ParameterSet {
        &self.params
    }

    fn check_len(&self, len: usize) -> Result<()> {
        if len != self.dim {
            return Err(ContinuationError::DimensionMismatch {
                expected: self.dim,
                actual: len,
            });
        }
        Ok(())
    }
}

impl<F, J> ContinuationModel for DenseModel<F, J>
where
    F: FnMut(&DVector<f64>, &ParameterSet) -> DVector<f64>,
    J: FnMut(&DVector<f64>, &ParameterSet) -> DMatrix<f64>,
{
    type Jacobian = DenseJacobian;

    fn dimension(&self) -> usize {
        self.dim
    }

    fn rhs(&mut self, x: &DVector<f64>) -> Result<DVector<f64>> {
        self.check_len(x.len())?;
        let out = (self.rhs_fn)(x, &self.params);
        self.check_len(out.len())?;
        Ok(out)
    }

    fn jacobian(&mut self, x: &DVector<f64>) -> Result<DenseJacobian> {
        self.check_len(x.len())?;
        let matrix = (self.jacobian_fn)(x, &self.params);
        if matrix.nrows() != self.dim || matrix.ncols() != self.dim {
            return Err(ContinuationError::InvalidInput(format!(
                "Jacobian must be {}x{}, got {}x{}",
                self.dim,
                self.dim,
                matrix.nrows(),
                matrix.ncols()
            )));
        }
        Ok(DenseJacobian::new(matrix))
    }

    fn solve(&mut self, jac: &DenseJacobian, rhs: &DVector<f64>) -> Result<DVector<f64>> {
        self.check_len(rhs.len())?;
        jac.lu
            .solve(rhs)
            .filter(|y| y.iter().all(|v| v.is_finite()))
            .ok_or_else(|| ContinuationError::SingularJacobian("LU solve failed".into()))
    }

    fn solve_bordered(
        &mut self,
        jac: &DenseJacobian,
        rhs: &DVector<f64>,
        rhs2: f64,
        v: &DVector<f64>,
        w: &DVector<f64>,
        c: f64,
    ) -> Result<(DVector<f64>, f64)> {
        let dim = self.dim;
        self.check_len(rhs.len())?;
        self.check_len(v.len())?;
        self.check_len(w.len())?;

        let mut a = DMatrix::zeros(dim + 1, dim + 1);
        a.view_mut((0, 0), (dim, dim)).copy_from(&jac.matrix);
        for i in 0..dim {
            a[(i, dim)] = v[i];
            a[(dim, i)] = w[i];
        }
        a[(dim, dim)] = c;

        let mut b = DVector::zeros(dim + 1);
        b.rows_mut(0, dim).copy_from(rhs);
        b[dim] = rhs2;

        let solution = a
            .lu()
            .solve(&b)
            .filter(|y| y.iter().all(|v| v.is_finite()))
            .ok_or_else(|| {
                ContinuationError::SingularJacobian("bordered LU solve failed".into())
            })?;

        Ok((solution.rows(0, dim).into_owned(), solution[dim]))
    }

    fn supports_bordered_solve(&self) -> bool {
        self.bordered
    }

    fn set_parameter(&mut self, name: &str, value: f64) -> Result<()> {
        self.params.set(name, value)
    }

    fn get_parameter(&self, name: &str) -> Result<f64> {
        self.params
            .get(name)
            .ok_or_else(|| ContinuationError::UnknownParameter(name.to_string()))
    }
}
