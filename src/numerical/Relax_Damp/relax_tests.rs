#[cfg(test)]
mod tests {
    use crate::chemistry::spherical_model::{Geometry, SphericalDiffusionReaction};
    use crate::numerical::Relax_Damp::NR_relax_solver::{RelaxBVP, RelaxParams};
    use crate::numerical::Relax_Damp::block_elimination::reduce_block;
    use crate::numerical::Relax_Damp::relax_traits::{
        BlockLayout, DifferenceEquation, EliminationStore, Grid, RelaxError,
    };
    use approx::assert_relative_eq;
    use nalgebra::{DMatrix, DVector, dvector};

    fn planar_line_problem() -> (SphericalDiffusionReaction, Grid) {
        // c'' = 0 on [1, 2] with dc/dx(1) = -1 and c(2) = 4;
        // the exact solution is the straight line c(x) = -x + 6
        let problem = SphericalDiffusionReaction::pure_diffusion(
            Geometry::Planar,
            dvector![1.0],
            dvector![-1.0],
            dvector![4.0],
        );
        let grid = Grid::uniform(1.0, 2.0, 5);
        (problem, grid)
    }

    fn default_params(problem: &SphericalDiffusionReaction, grid: &Grid) -> RelaxParams {
        RelaxParams {
            conv: 1e-9,
            slowc: 1.0,
            max_iterations: 30,
            scalv: problem.scalv(grid),
        }
    }

    /// linear problem: the linearization is exact, so the very first
    /// correction lands on the solution and the second iteration only
    /// confirms convergence
    #[test]
    fn test_linear_problem_converges_in_one_step() {
        let (problem, grid) = planar_line_problem();
        let layout = problem.layout();
        let params = default_params(&problem, &grid);
        let guess = problem.initial_guess(grid.len());
        let mut solver = RelaxBVP::new(problem, grid.clone(), layout, params, guess);
        let y = solver.solver().unwrap();

        for k in 0..grid.len() {
            let x = grid.x[k];
            assert_relative_eq!(y[(0, k)], -x + 6.0, epsilon = 1e-10);
            assert_relative_eq!(y[(1, k)], -1.0, epsilon = 1e-10);
        }
        let iterations = solver.get_statistics()["number of iterations"];
        assert!(
            iterations <= 2,
            "linear problem took {} iterations",
            iterations
        );
    }

    /// both boundary conditions are satisfied by the converged profile
    #[test]
    fn test_boundary_satisfaction() {
        let problem = SphericalDiffusionReaction::pure_diffusion(
            Geometry::Spherical,
            dvector![1.0, 1.0],
            dvector![0.7, -0.3],
            dvector![5.0, 2.0],
        );
        let grid = Grid::uniform(1.0, 2.0, 21);
        let layout = problem.layout();
        let params = default_params(&problem, &grid);
        let guess = problem.initial_guess(grid.len());
        let mut solver = RelaxBVP::new(problem.clone(), grid.clone(), layout, params, guess);
        let y = solver.solver().unwrap();

        let m = grid.len();
        for a in 0..2 {
            // right end: value pinned to the bulk
            assert_relative_eq!(y[(a, m - 1)], problem.bulk[a], epsilon = 1e-8);
            // left end: gradient pinned to the uptake flux
            let flux = match &problem.uptake {
                crate::chemistry::spherical_model::Uptake::Gradient(f) => f[a],
                _ => unreachable!(),
            };
            assert_relative_eq!(y[(2 + a, 0)], flux, epsilon = 1e-8);
        }
    }

    /// a valid slot permutation that is not its own inverse must produce
    /// the same profiles as the canonical derivative/value block swap;
    /// corrections live in slot indexv[j], not in slot j
    #[test]
    fn test_non_involutive_permutation() {
        let problem = SphericalDiffusionReaction::pure_diffusion(
            Geometry::Planar,
            dvector![1.0, 1.0],
            dvector![-1.0, 0.5],
            dvector![4.0, 2.0],
        );
        let grid = Grid::uniform(1.0, 2.0, 9);
        // derivative variables take slots 1 and 0, value variables 2 and 3
        let layout = BlockLayout::new(2, 2, vec![2, 3, 1, 0]);
        let params = default_params(&problem, &grid);
        let guess = problem.initial_guess(grid.len());
        let mut solver = RelaxBVP::new(problem.clone(), grid.clone(), layout, params, guess);
        let y = solver.solver().unwrap();

        for j in 0..2 {
            for k in 0..grid.len() {
                let exact = problem.analytic_pure_diffusion(j, grid.x[k], 1.0, 2.0);
                assert_relative_eq!(y[(j, k)], exact, epsilon = 1e-9);
            }
        }
        let iterations = solver.get_statistics()["number of iterations"];
        assert!(
            iterations <= 2,
            "linear problem took {} iterations",
            iterations
        );
    }

    /// halving the mesh spacing shrinks the discretization error by about
    /// a factor of four (trapezoid rule is second order)
    #[test]
    fn test_mesh_refinement_second_order() {
        let problem = SphericalDiffusionReaction::pure_diffusion(
            Geometry::Spherical,
            dvector![1.0],
            dvector![1.0],
            dvector![5.0],
        );
        let max_error = |m: usize| -> f64 {
            let grid = Grid::uniform(1.0, 2.0, m);
            let layout = problem.layout();
            let params = default_params(&problem, &grid);
            let guess = problem.initial_guess(grid.len());
            let mut solver =
                RelaxBVP::new(problem.clone(), grid.clone(), layout, params, guess);
            let y = solver.solver().unwrap();
            let mut emax = 0.0f64;
            for k in 0..grid.len() {
                let exact = problem.analytic_pure_diffusion(0, grid.x[k], 1.0, 2.0);
                emax = emax.max((y[(0, k)] - exact).abs());
            }
            emax
        };
        let coarse = max_error(11);
        let fine = max_error(21);
        let ratio = coarse / fine;
        assert!(
            ratio > 2.5 && ratio < 6.0,
            "expected roughly 4x error reduction, got {} ({} -> {})",
            ratio,
            coarse,
            fine
        );
    }

    /// species whose concentrations and fluxes differ by six orders of
    /// magnitude: the scaled pivoting must keep the reduction stable and
    /// both profiles must land on the analytic solution
    #[test]
    fn test_pivot_robustness_across_scales() {
        let problem = SphericalDiffusionReaction::pure_diffusion(
            Geometry::Spherical,
            dvector![1.0e-9, 1.0e3],
            dvector![1.0, 2.0e-7],
            dvector![5.0, 3.0e-6],
        );
        let grid = Grid::uniform(1.0, 2.0, 41);
        let layout = problem.layout();
        let params = default_params(&problem, &grid);
        let guess = problem.initial_guess(grid.len());
        let mut solver = RelaxBVP::new(problem.clone(), grid.clone(), layout, params, guess);
        let y = solver.solver().unwrap();

        for j in 0..2 {
            for k in 0..grid.len() {
                let exact = problem.analytic_pure_diffusion(j, grid.x[k], 1.0, 2.0);
                assert_relative_eq!(y[(j, k)], exact, max_relative = 1e-3);
            }
        }
    }

    /// when the raw correction exceeds the damping ceiling, the applied
    /// update must be exactly slowc/err times the raw correction
    #[test]
    fn test_damping_bounds_the_step() {
        let (problem, grid) = planar_line_problem();
        let layout = problem.layout();
        let scalv = problem.scalv(&grid);
        let m = grid.len();
        let slowc = 0.01;
        let params = RelaxParams {
            conv: 1e-9,
            slowc,
            max_iterations: 1,
            scalv: scalv.clone(),
        };

        // start far away so the raw Newton correction is huge
        let mut guess = problem.initial_guess(m);
        for k in 0..m {
            guess[(0, k)] = 1000.0;
        }
        let y0 = guess.clone();

        let mut solver = RelaxBVP::new(problem.clone(), grid.clone(), layout, params, guess);
        let res = solver.solver();
        assert!(matches!(
            res,
            Err(RelaxError::IterationLimitExceeded { .. })
        ));
        let y1 = solver.get_result().unwrap();

        // the raw correction of a linear problem is y0 - y_exact
        let mut delta = DMatrix::zeros(2, m);
        for k in 0..m {
            let x = grid.x[k];
            delta[(0, k)] = y0[(0, k)] - (-x + 6.0);
            delta[(1, k)] = y0[(1, k)] - (-1.0);
        }
        // reproduce the solver's error metric and the resulting factor
        let mut err = 0.0;
        for v in 0..2 {
            for k in 0..m {
                err += delta[(v, k)].abs() / scalv[v];
            }
        }
        err /= (2 * m) as f64;
        assert!(err > slowc);
        let fac = slowc / err;

        for v in 0..2 {
            for k in 0..m {
                assert_relative_eq!(
                    y1[(v, k)],
                    y0[(v, k)] - fac * delta[(v, k)],
                    epsilon = 1e-8
                );
            }
        }
    }

    /// problem definition that leaves the left boundary rows empty
    struct ZeroBoundaryRows {
        inner: SphericalDiffusionReaction,
    }

    impl DifferenceEquation for ZeroBoundaryRows {
        fn fill_block(
            &self,
            k: usize,
            grid: &Grid,
            layout: &BlockLayout,
            y: &DMatrix<f64>,
            s: &mut DMatrix<f64>,
        ) {
            if k != 0 {
                self.inner.fill_block(k, grid, layout, y, s);
            }
        }
    }

    /// an all-zero pivot row must abort the solve, not produce a
    /// plausible-looking answer
    #[test]
    fn test_singular_block_is_fatal() {
        let (inner, grid) = planar_line_problem();
        let layout = inner.layout();
        let params = default_params(&inner, &grid);
        let guess = inner.initial_guess(grid.len());
        let problem = ZeroBoundaryRows { inner };
        let mut solver = RelaxBVP::new(problem, grid, layout, params, guess);
        let res = solver.solver();
        assert_eq!(res, Err(RelaxError::SingularBlock { point: 0 }));
    }

    #[test]
    fn test_non_finite_state_is_reported() {
        let (problem, grid) = planar_line_problem();
        let layout = problem.layout();
        let params = default_params(&problem, &grid);
        let mut guess = problem.initial_guess(grid.len());
        guess[(0, 2)] = f64::NAN;
        let mut solver = RelaxBVP::new(problem, grid, layout, params, guess);
        match solver.solver() {
            Err(RelaxError::NonFiniteState { iteration, .. }) => assert_eq!(iteration, 1),
            other => panic!("expected NonFiniteState, got {:?}", other),
        }
    }

    /// problem gated by an auxiliary convergence predicate: the numeric
    /// tolerance alone must not end the solve
    struct GatedProblem {
        inner: SphericalDiffusionReaction,
        open_after: usize,
    }

    impl DifferenceEquation for GatedProblem {
        fn fill_block(
            &self,
            k: usize,
            grid: &Grid,
            layout: &BlockLayout,
            y: &DMatrix<f64>,
            s: &mut DMatrix<f64>,
        ) {
            self.inner.fill_block(k, grid, layout, y, s);
        }

        fn converged_aux(&self, iteration: usize) -> bool {
            iteration >= self.open_after
        }
    }

    #[test]
    fn test_auxiliary_convergence_gate() {
        let (inner, grid) = planar_line_problem();
        let layout = inner.layout();
        let params = default_params(&inner, &grid);
        let guess = inner.initial_guess(grid.len());
        let problem = GatedProblem {
            inner,
            open_after: 4,
        };
        let mut solver = RelaxBVP::new(problem, grid.clone(), layout, params, guess);
        let y = solver.solver().unwrap();
        let iterations = solver.get_statistics()["number of iterations"];
        assert!(iterations >= 4, "gate ignored, {} iterations", iterations);
        for k in 0..grid.len() {
            assert_relative_eq!(y[(0, k)], -grid.x[k] + 6.0, epsilon = 1e-9);
        }
    }

    /// direct check of the row reducer bookkeeping on a one-row pivot zone
    #[test]
    fn test_reduce_block_stores_normalized_rows() {
        let layout = BlockLayout::new(1, 1, vec![1, 0]);
        let mut store = EliminationStore::new(&layout, 2);
        let mut s = layout.empty_block();
        // left-boundary shaped block: active row 1, pivot zone column 2
        s[(1, 2)] = 2.0;
        s[(1, 3)] = 4.0;
        s[(1, 4)] = 6.0;
        reduce_block(&mut s, (1, 2), 2, &layout, store.slab_mut(0), 0, 0).unwrap();
        // stored coefficients are the trailing columns divided by the pivot
        assert_relative_eq!(store.slab(0)[(1, 0)], 2.0);
        assert_relative_eq!(store.slab(0)[(1, 1)], 3.0);
    }

    #[test]
    fn test_reduce_block_rejects_zero_row() {
        let layout = BlockLayout::new(1, 1, vec![1, 0]);
        let mut store = EliminationStore::new(&layout, 2);
        let mut s = layout.empty_block();
        let res = reduce_block(&mut s, (1, 2), 2, &layout, store.slab_mut(0), 0, 7);
        assert_eq!(res, Err(RelaxError::SingularBlock { point: 7 }));
    }

    #[test]
    fn test_grid_spacing() {
        let grid = Grid::uniform(1.0, 2.0, 5);
        assert_eq!(grid.len(), 5);
        assert_relative_eq!(grid.h(1), 0.25);
        assert_relative_eq!(grid.x[4], 2.0);
    }

    #[test]
    fn test_scalv_is_positive() {
        let (problem, grid) = planar_line_problem();
        let scalv: DVector<f64> = problem.scalv(&grid);
        assert!(scalv.iter().all(|&s| s > 0.0));
    }
}
