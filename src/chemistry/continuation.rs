/*
Outer continuation loop for strong uptake fluxes. A solve started from the
flat bulk profile can fail (or drive concentrations negative) when the
target uptake is large; ramping the uptake toward its target across outer
steps, each started from the previous converged profile, keeps every inner
Newton solve in its convergence basin. The ramp is a separate concern from
Newton convergence: each inner solve runs to full convergence for a fixed
flux value.
*/
use crate::chemistry::spherical_model::{SphericalDiffusionReaction, Uptake};
use crate::numerical::Relax_Damp::NR_relax_solver::{RelaxBVP, RelaxParams};
use crate::numerical::Relax_Damp::relax_traits::{Grid, RelaxError};
use log::info;
use nalgebra::DMatrix;

pub struct UptakeContinuation {
    pub problem: SphericalDiffusionReaction,
    pub grid: Grid,
    pub params: RelaxParams,
    /// number of outer steps the uptake is ramped over
    pub ramp_steps: usize,
}

impl UptakeContinuation {
    pub fn new(
        problem: SphericalDiffusionReaction,
        grid: Grid,
        params: RelaxParams,
        ramp_steps: usize,
    ) -> UptakeContinuation {
        assert!(ramp_steps >= 1, "at least one ramp step is required");
        UptakeContinuation {
            problem,
            grid,
            params,
            ramp_steps,
        }
    }

    fn scaled_problem(&self, lambda: f64) -> SphericalDiffusionReaction {
        let mut scaled = self.problem.clone();
        scaled.uptake = match &self.problem.uptake {
            Uptake::Gradient(flux) => Uptake::Gradient(flux * lambda),
            Uptake::MichaelisMenten { vmax, ks, rest } => Uptake::MichaelisMenten {
                vmax: vmax * lambda,
                ks: *ks,
                rest: rest * lambda,
            },
        };
        scaled
    }

    /// Ramp the uptake linearly from target/ramp_steps to the target,
    /// re-solving at every step from the previous converged profile.
    pub fn solve(&self) -> Result<DMatrix<f64>, RelaxError> {
        let layout = self.problem.layout();
        let mut guess = self.problem.initial_guess(self.grid.len());
        let mut profile = guess.clone();
        for step in 1..=self.ramp_steps {
            let lambda = step as f64 / self.ramp_steps as f64;
            info!(
                "continuation step {}/{}: uptake at {:.3} of target",
                step, self.ramp_steps, lambda
            );
            let scaled = self.scaled_problem(lambda);
            let mut solver = RelaxBVP::new(
                scaled,
                self.grid.clone(),
                layout.clone(),
                self.params.clone(),
                guess,
            );
            profile = solver.solver()?;
            guess = profile.clone();
        }
        Ok(profile)
    }
}
