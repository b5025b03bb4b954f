/*
Steady state radial diffusion-reaction model around a spherical shell,
reduced to first order for the relaxation solver.

Per species j (concentration c_j, diffusion coefficient D_j):

    D_j (c_j'' + 2/r c_j') + q_j(c) = 0

with q_j the net chemical production rate. First order form with
y_j = c_j and y_{j+n2} = c_j':

    y_j'      = y_{j+n2}
    y_{j+n2}' = g_j(y, r) = -2/r y_{j+n2} - q_j(c)/D_j

Interior points use the midpoint (trapezoid) discretization

    E_j,k      = y_j,k - y_j,k-1 - h/2 (y_{j+n2},k + y_{j+n2},k-1)
    E_{j+n2},k = y_{j+n2},k - y_{j+n2},k-1 - h/2 (g_j(y_k) + g_j(y_k-1))

The uptake by the shell enters as a gradient condition on every derivative
variable at the inner boundary (optionally Michaelis-Menten saturated for
species 0); the bulk concentrations pin the value variables at the outer
boundary. Derivative variables are therefore the ones eliminated first and
the slot permutation swaps the value and derivative blocks.
*/
use crate::chemistry::carbonate::CarbonateKinetics;
use crate::numerical::Relax_Damp::relax_traits::{BlockLayout, DifferenceEquation, Grid};
use nalgebra::{DMatrix, DVector};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Geometry {
    /// slab domain, no curvature term (c'' = -q/D)
    Planar,
    /// spherically symmetric domain, curvature term 2/r
    Spherical,
}

/// Inner boundary condition on the concentration gradients.
#[derive(Debug, Clone)]
pub enum Uptake {
    /// fixed gradient per species at the inner boundary
    Gradient(DVector<f64>),
    /// Michaelis-Menten saturated uptake of species 0
    /// (gradient = vmax*c0/(ks + c0)/D_0), fixed gradients for the rest
    MichaelisMenten {
        vmax: f64,
        ks: f64,
        rest: DVector<f64>,
    },
}

#[derive(Debug, Clone)]
pub struct SphericalDiffusionReaction {
    pub n2: usize,
    pub geometry: Geometry,
    /// diffusion coefficient per species
    pub diff: DVector<f64>,
    /// inner boundary uptake
    pub uptake: Uptake,
    /// bulk concentration per species, imposed at the outer boundary
    pub bulk: DVector<f64>,
    /// reversible interconversion between species 0 and 1, None for pure
    /// diffusion
    pub kinetics: Option<CarbonateKinetics>,
}

impl SphericalDiffusionReaction {
    pub fn pure_diffusion(
        geometry: Geometry,
        diff: DVector<f64>,
        flux: DVector<f64>,
        bulk: DVector<f64>,
    ) -> SphericalDiffusionReaction {
        let n2 = bulk.len();
        assert_eq!(diff.len(), n2);
        assert_eq!(flux.len(), n2);
        SphericalDiffusionReaction {
            n2,
            geometry,
            diff,
            uptake: Uptake::Gradient(flux),
            bulk,
            kinetics: None,
        }
    }

    /// Slot permutation: the derivative block is eliminated at the left
    /// end, so derivative variables take the first n2 slots and value
    /// variables the last n2.
    pub fn indexv(&self) -> Vec<usize> {
        let n2 = self.n2;
        let mut indexv = vec![0usize; 2 * n2];
        for i in 0..n2 {
            indexv[i] = n2 + i;
            indexv[n2 + i] = i;
        }
        indexv
    }

    pub fn layout(&self) -> BlockLayout {
        BlockLayout::new(self.n2, self.n2, self.indexv())
    }

    /// Scale vector from the bulk values: |c_bulk| for the concentrations,
    /// |c_bulk|/(r2-r1) for the gradients.
    pub fn scalv(&self, grid: &Grid) -> DVector<f64> {
        let n2 = self.n2;
        let width = grid.x[grid.len() - 1] - grid.x[0];
        let mut scalv = DVector::zeros(2 * n2);
        for j in 0..n2 {
            scalv[j] = self.bulk[j].abs();
            scalv[n2 + j] = self.bulk[j].abs() / width;
        }
        scalv
    }

    /// Constant bulk profile with zero gradients, the usual starting guess.
    pub fn initial_guess(&self, m: usize) -> DMatrix<f64> {
        let n2 = self.n2;
        let mut y = DMatrix::zeros(2 * n2, m);
        for j in 0..n2 {
            for k in 0..m {
                y[(j, k)] = self.bulk[j];
            }
        }
        y
    }

    /// Analytic profile for the pure diffusion case with a fixed gradient
    /// F at the inner radius r1 and bulk value at r2:
    /// spherical  c(r) = bulk - F r1^2 (1/r - 1/r2),
    /// planar     c(x) = bulk + F (x - x2).
    pub fn analytic_pure_diffusion(&self, j: usize, r: f64, r1: f64, r2: f64) -> f64 {
        let flux = match &self.uptake {
            Uptake::Gradient(flux) => flux[j],
            Uptake::MichaelisMenten { .. } => {
                panic!("no closed form with Michaelis-Menten uptake")
            }
        };
        match self.geometry {
            Geometry::Spherical => self.bulk[j] - flux * r1 * r1 * (1.0 / r - 1.0 / r2),
            Geometry::Planar => self.bulk[j] + flux * (r - r2),
        }
    }

    fn curvature(&self, r: f64) -> f64 {
        match self.geometry {
            Geometry::Planar => 0.0,
            Geometry::Spherical => 2.0 / r,
        }
    }

    /// net production rate q and its jacobian dq/dc at one mesh point
    fn source(&self, c0: f64, c1: f64) -> (DVector<f64>, DMatrix<f64>) {
        let n2 = self.n2;
        let mut q = DVector::zeros(n2);
        let mut dq = DMatrix::zeros(n2, n2);
        if let Some(kin) = &self.kinetics {
            assert!(n2 >= 2, "interconversion kinetics needs at least 2 species");
            let w = kin.rate(c0, c1);
            let (dw0, dw1) = kin.rate_derivatives();
            q[0] = -w;
            q[1] = w;
            dq[(0, 0)] = -dw0;
            dq[(0, 1)] = -dw1;
            dq[(1, 0)] = dw0;
            dq[(1, 1)] = dw1;
        }
        (q, dq)
    }

    /// right hand side g_j of the derivative equation at one mesh point
    fn g(&self, j: usize, r: f64, yd: f64, q: &DVector<f64>) -> f64 {
        -self.curvature(r) * yd - q[j] / self.diff[j]
    }
}

impl DifferenceEquation for SphericalDiffusionReaction {
    fn fill_block(
        &self,
        k: usize,
        grid: &Grid,
        layout: &BlockLayout,
        y: &DMatrix<f64>,
        s: &mut DMatrix<f64>,
    ) {
        let n2 = self.n2;
        let jsf = layout.jsf();
        let m = grid.len();

        if k == 0 {
            // inner boundary: gradient conditions on the derivative rows
            match &self.uptake {
                Uptake::Gradient(flux) => {
                    for a in 0..n2 {
                        s[(n2 + a, layout.col_curr(n2 + a))] = 1.0;
                        s[(n2 + a, jsf)] = y[(n2 + a, 0)] - flux[a];
                    }
                }
                Uptake::MichaelisMenten { vmax, ks, rest } => {
                    // saturated uptake of species 0 at the shell
                    let c0 = y[(0, 0)];
                    let grad = vmax * c0 / (ks + c0) / self.diff[0];
                    s[(n2, layout.col_curr(n2))] = 1.0;
                    s[(n2, layout.col_curr(0))] =
                        -vmax * ks / ((ks + c0) * (ks + c0)) / self.diff[0];
                    s[(n2, jsf)] = y[(n2, 0)] - grad;
                    for a in 1..n2 {
                        s[(n2 + a, layout.col_curr(n2 + a))] = 1.0;
                        s[(n2 + a, jsf)] = y[(n2 + a, 0)] - rest[a - 1];
                    }
                }
            }
        } else if k == m {
            // outer boundary: bulk values on the concentration rows
            for a in 0..n2 {
                s[(a, layout.col_curr(a))] = 1.0;
                s[(a, jsf)] = y[(a, m - 1)] - self.bulk[a];
            }
        } else {
            let h = grid.h(k);
            let (rp, rc) = (grid.x[k - 1], grid.x[k]);
            // the interconversion couples species 0 and 1; a single species
            // model has no partner concentration
            let c1 = |p: usize| if n2 > 1 { y[(1, p)] } else { 0.0 };
            let (qp, dqp) = self.source(y[(0, k - 1)], c1(k - 1));
            let (qc, dqc) = self.source(y[(0, k)], c1(k));

            for j in 0..n2 {
                // value rows: y_j' = y_{j+n2}
                s[(j, layout.col_prev(j))] = -1.0;
                s[(j, layout.col_prev(n2 + j))] = -0.5 * h;
                s[(j, layout.col_curr(j))] = 1.0;
                s[(j, layout.col_curr(n2 + j))] = -0.5 * h;
                s[(j, jsf)] = y[(j, k)] - y[(j, k - 1)]
                    - 0.5 * h * (y[(n2 + j, k)] + y[(n2 + j, k - 1)]);

                // derivative rows: y_{j+n2}' = g_j
                for n in 0..n2 {
                    s[(n2 + j, layout.col_prev(n))] = 0.5 * h * dqp[(j, n)] / self.diff[j];
                    s[(n2 + j, layout.col_curr(n))] = 0.5 * h * dqc[(j, n)] / self.diff[j];
                }
                s[(n2 + j, layout.col_prev(n2 + j))] = -1.0 + 0.5 * h * self.curvature(rp);
                s[(n2 + j, layout.col_curr(n2 + j))] = 1.0 + 0.5 * h * self.curvature(rc);
                let gp = self.g(j, rp, y[(n2 + j, k - 1)], &qp);
                let gc = self.g(j, rc, y[(n2 + j, k)], &qc);
                s[(n2 + j, jsf)] =
                    y[(n2 + j, k)] - y[(n2 + j, k - 1)] - 0.5 * h * (gc + gp);
            }
        }
    }
}
