/*
Data model and interfaces of the relaxation (global Newton) BVP solver.
The solver works on a system of NE first order equations obtained from N2
second order equations (value + derivative pairs), discretized on a fixed
mesh of M points. NB boundary conditions are imposed at the left end of the
domain, the remaining NE-NB at the right end.
*/
use nalgebra::{DMatrix, DVector};
use thiserror::Error;

/// Error taxonomy of the relaxation solver. `SingularBlock` is structural
/// and aborts the whole solve; `IterationLimitExceeded` is ordinary
/// non-convergence - the caller may retry with a better initial guess or a
/// relaxed tolerance; `NonFiniteState` is surfaced so that the problem
/// definition layer can re-clamp a driving parameter and call again.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RelaxError {
    #[error("singular matrix in block reduction at mesh point {point} (zero row or zero pivot in the pivot zone)")]
    SingularBlock { point: usize },
    #[error("relaxation did not converge: {max_iterations} iterations exhausted, last error {last_error:.6e}")]
    IterationLimitExceeded {
        max_iterations: usize,
        last_error: f64,
    },
    #[error("non-finite trial value for variable {variable} at mesh point {point} on iteration {iteration}")]
    NonFiniteState {
        variable: usize,
        point: usize,
        iteration: usize,
    },
}

/// Fixed one dimensional mesh spanning the domain from the inner to the
/// outer boundary. Spacing is uniform in the driving use case but nothing
/// in the elimination scheme requires it.
#[derive(Debug, Clone)]
pub struct Grid {
    pub x: DVector<f64>,
}

impl Grid {
    pub fn uniform(x0: f64, x_end: f64, m: usize) -> Grid {
        assert!(m > 1, "mesh must have at least 2 points");
        assert!(x_end > x0, "x_end must be greater than x0");
        let h = (x_end - x0) / (m - 1) as f64;
        let x: Vec<f64> = (0..m).map(|i| x0 + (i as f64) * h).collect();
        Grid {
            x: DVector::from_vec(x),
        }
    }

    pub fn from_vec(x: Vec<f64>) -> Grid {
        assert!(x.len() > 1, "mesh must have at least 2 points");
        Grid {
            x: DVector::from_vec(x),
        }
    }

    /// number of mesh points M
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// spacing between point k-1 and point k
    pub fn h(&self, k: usize) -> f64 {
        self.x[k] - self.x[k - 1]
    }
}

/// Shape of one equation block and the slot permutation.
///
/// The per-point Equation Block is a NE x (2*NE+1) matrix: columns
/// 0..NE hold derivatives with respect to the previous-point variables,
/// columns NE..2*NE with respect to the current-point variables, and the
/// trailing column holds the residual. `indexv` is the bijection from
/// variable index to the column slot it occupies inside a block; it exists
/// because the boundary conditions partition the variables asymmetrically
/// between the two ends and the eliminated slots must come first.
#[derive(Debug, Clone)]
pub struct BlockLayout {
    /// number of second order physical equations
    pub n2: usize,
    /// number of first order equations, always 2*n2
    pub ne: usize,
    /// number of boundary conditions at the left end
    pub nb: usize,
    /// variable -> slot permutation, length ne
    pub indexv: Vec<usize>,
}

impl BlockLayout {
    pub fn new(n2: usize, nb: usize, indexv: Vec<usize>) -> BlockLayout {
        let ne = 2 * n2;
        assert!(nb > 0 && nb < ne, "nb must satisfy 0 < nb < ne");
        assert_eq!(indexv.len(), ne, "indexv must have one entry per variable");
        // indexv must be a bijection on 0..ne
        let mut seen = vec![false; ne];
        for &jv in indexv.iter() {
            assert!(jv < ne && !seen[jv], "indexv must be a permutation of 0..ne");
            seen[jv] = true;
        }
        BlockLayout { n2, ne, nb, indexv }
    }

    /// number of right-end boundary conditions (= reduced unknowns per point)
    pub fn nbf(&self) -> usize {
        self.ne - self.nb
    }

    /// residual column of the equation block
    pub fn jsf(&self) -> usize {
        2 * self.ne
    }

    /// column of the block holding d(residual)/d(variable jv at point k-1)
    pub fn col_prev(&self, variable: usize) -> usize {
        self.indexv[variable]
    }

    /// column of the block holding d(residual)/d(variable jv at point k)
    pub fn col_curr(&self, variable: usize) -> usize {
        self.ne + self.indexv[variable]
    }

    /// fresh zeroed equation block of the right shape
    pub fn empty_block(&self) -> DMatrix<f64> {
        DMatrix::zeros(self.ne, 2 * self.ne + 1)
    }
}

/// Elimination Store: one NE x (NE-NB+1) slice per mesh point plus one for
/// the virtual point beyond the right boundary. The forward sweep fills the
/// slices with reduced coefficients, the backward sweep consumes them and
/// leaves the final correction in column 0 of slices 0..M.
#[derive(Debug, Clone)]
pub struct EliminationStore {
    slabs: Vec<DMatrix<f64>>,
    ncols: usize,
}

impl EliminationStore {
    pub fn new(layout: &BlockLayout, m: usize) -> EliminationStore {
        let ncols = layout.nbf() + 1;
        EliminationStore {
            slabs: (0..m + 1).map(|_| DMatrix::zeros(layout.ne, ncols)).collect(),
            ncols,
        }
    }

    /// number of slices, M+1
    pub fn len(&self) -> usize {
        self.slabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slabs.is_empty()
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn slab(&self, k: usize) -> &DMatrix<f64> {
        &self.slabs[k]
    }

    pub fn slab_mut(&mut self, k: usize) -> &mut DMatrix<f64> {
        &mut self.slabs[k]
    }

    /// shared view of slice k-1 together with a mutable view of slice k,
    /// needed when folding the previous reduction into the current block
    pub fn pair_mut(&mut self, k: usize) -> (&DMatrix<f64>, &mut DMatrix<f64>) {
        let (left, right) = self.slabs.split_at_mut(k);
        (&left[k - 1], &mut right[0])
    }

    /// correction for equation slot `jv` at mesh point `k`, valid after
    /// back substitution
    pub fn correction(&self, jv: usize, k: usize) -> f64 {
        self.slabs[k][(jv, 0)]
    }
}

/// Problem definition interface consumed by the solver (the local
/// linearization callback). Implementations embed all the physics and
/// chemistry: reaction rates, diffusion coefficients, flux boundary
/// conditions. They must be stateless with respect to the solver's
/// elimination bookkeeping and must not perform I/O inside `fill_block`.
///
/// Conventions for `fill_block(k, ...)`, all indices 0-based:
/// - `k == 0`: left boundary. Only rows `nbf..ne` are meaningful; write
///   derivatives with respect to point 0 variables into the current-point
///   columns (`layout.col_curr`) and the boundary residuals into the
///   trailing column.
/// - `0 < k < M`: interior. All `ne` rows are meaningful; the residuals
///   couple points k-1 and k, derivatives go into `col_prev`/`col_curr`.
/// - `k == M`: virtual point past the right boundary. Only rows `0..nbf`
///   are meaningful; derivatives with respect to point M-1 variables go
///   into the current-point columns.
///
/// The block is zeroed by the solver before every call.
pub trait DifferenceEquation {
    fn fill_block(
        &self,
        k: usize,
        grid: &Grid,
        layout: &BlockLayout,
        y: &DMatrix<f64>,
        s: &mut DMatrix<f64>,
    );

    /// Auxiliary convergence gate evaluated alongside the numeric tolerance
    /// check. The default accepts; a problem that ramps a driving parameter
    /// across iterations can refuse convergence until the ramp completes.
    fn converged_aux(&self, _iteration: usize) -> bool {
        true
    }
}
