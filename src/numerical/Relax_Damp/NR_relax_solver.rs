/*
Relaxation (global Newton) solver for two-point boundary value problems on
a fixed one dimensional mesh.
The code implements the classic relaxation scheme for block-tridiagonal
BVP systems (Numerical Recipes, ch. 17.3): forward elimination with scaled
full pivoting per mesh point, reverse back substitution, damped Newton
update with per-variable convergence reporting.
*/
use crate::Utils::logger::save_profile_to_file;
use crate::numerical::Relax_Damp::block_elimination::{
    back_substitute, fold_reduced, reduce_block,
};
use crate::numerical::Relax_Damp::relax_traits::{
    BlockLayout, DifferenceEquation, EliminationStore, Grid, RelaxError,
};
use crate::numerical::Relax_Damp::relax_utils::{
    check_finite, damping_factor, elapsed_time, normalized_error, statistics_table,
};
use chrono::Local;
use log::{info, warn};
use nalgebra::{DMatrix, DVector};
use simplelog::*;
use std::collections::HashMap;
use std::fs::File;
use std::time::Instant;

/// Convergence parameters of one relaxation solve, supplied once at solve
/// start.
#[derive(Debug, Clone)]
pub struct RelaxParams {
    /// convergence tolerance on the normalized error
    pub conv: f64,
    /// damping ceiling: corrections whose normalized error exceeds this are
    /// scaled down to `slowc / err` of the raw step
    pub slowc: f64,
    /// iteration budget, the solve is fatal once it is exhausted
    pub max_iterations: usize,
    /// one positive scale factor per variable, used only to normalize
    /// corrections into the dimensionless error measure
    pub scalv: DVector<f64>,
}

pub struct RelaxBVP<P: DifferenceEquation> {
    pub problem: P, // all physics and chemistry live behind this interface
    pub grid: Grid,
    pub layout: BlockLayout,
    pub params: RelaxParams,
    pub y: DMatrix<f64>, // trial solution, ne rows x m columns, mutated in place
    pub result: Option<DMatrix<f64>>, // last accepted trial solution
    pub loglevel: Option<String>,
    calc_statistics: HashMap<String, usize>,
}

impl<P: DifferenceEquation> RelaxBVP<P> {
    pub fn new(
        problem: P,
        grid: Grid,
        layout: BlockLayout,
        params: RelaxParams,
        initial_guess: DMatrix<f64>,
    ) -> RelaxBVP<P> {
        let vec_of_tuples = vec![
            ("number of iterations".to_string(), 0),
            ("number of block reductions".to_string(), 0),
            ("number of coupling eliminations".to_string(), 0),
            ("number of back substitutions".to_string(), 0),
        ];
        let Hashmap_statistics: HashMap<String, usize> = vec_of_tuples.into_iter().collect();
        RelaxBVP {
            problem,
            grid,
            layout,
            params,
            y: initial_guess,
            result: None,
            loglevel: None,
            calc_statistics: Hashmap_statistics,
        }
    }

    // check if user specified task is correct
    pub fn task_check(&self) {
        let m = self.grid.len();
        assert_eq!(
            self.layout.ne,
            2 * self.layout.n2,
            "ne must be exactly 2*n2 (value + derivative per physical equation)"
        );
        assert_eq!(
            self.y.shape(),
            (self.layout.ne, m),
            "initial guess must be ne x m, got {:?}",
            self.y.shape()
        );
        assert!(m > 1, "mesh must have at least 2 points");
        assert!(
            self.params.max_iterations >= 1,
            "max_iterations must be at least 1"
        );
        assert!(self.params.conv > 0.0, "tolerance must be greater than 0.0");
        assert!(self.params.slowc > 0.0, "slowc must be greater than 0.0");
        assert_eq!(
            self.params.scalv.len(),
            self.layout.ne,
            "scalv must have one entry per variable"
        );
        assert!(
            self.params.scalv.iter().all(|&s| s > 0.0),
            "scale factors must be positive"
        );
    }

    /// One full elimination sweep: left boundary, interior points, virtual
    /// right boundary, then back substitution. On success the store holds
    /// the correction for every equation at every mesh point.
    fn sweep(&mut self) -> Result<EliminationStore, RelaxError> {
        let layout = self.layout.clone();
        let layout = &layout;
        let ne = layout.ne;
        let nb = layout.nb;
        let nbf = layout.nbf();
        let m = self.grid.len();
        let mut store = EliminationStore::new(layout, m);
        // one block buffer reused across mesh points; the store keeps an
        // independent slice per point instead
        let mut s = layout.empty_block();

        // left boundary: only the rows of the variables fixed at this end
        self.problem.fill_block(0, &self.grid, layout, &self.y, &mut s);
        reduce_block(&mut s, (nbf, ne), ne, layout, store.slab_mut(0), 0, 0)?;
        *self
            .calc_statistics
            .entry("number of block reductions".to_string())
            .or_insert(0) += 1;

        // interior points: fold in the previous reduction, then reduce
        for k in 1..m {
            s.fill(0.0);
            self.problem.fill_block(k, &self.grid, layout, &self.y, &mut s);
            let (prev, cur) = store.pair_mut(k);
            fold_reduced(&mut s, prev, (0, ne), 0, nb, layout);
            reduce_block(&mut s, (0, ne), nb, layout, cur, 0, k)?;
            *self
                .calc_statistics
                .entry("number of coupling eliminations".to_string())
                .or_insert(0) += 1;
            *self
                .calc_statistics
                .entry("number of block reductions".to_string())
                .or_insert(0) += 1;
        }

        // virtual point past the right boundary: remaining ne-nb conditions
        s.fill(0.0);
        self.problem.fill_block(m, &self.grid, layout, &self.y, &mut s);
        let (prev, cur) = store.pair_mut(m);
        fold_reduced(&mut s, prev, (0, nbf), ne, ne + nb, layout);
        reduce_block(&mut s, (0, nbf), ne + nb, layout, cur, nbf, m)?;
        *self
            .calc_statistics
            .entry("number of coupling eliminations".to_string())
            .or_insert(0) += 1;
        *self
            .calc_statistics
            .entry("number of block reductions".to_string())
            .or_insert(0) += 1;

        back_substitute(&mut store, layout, m);
        *self
            .calc_statistics
            .entry("number of back substitutions".to_string())
            .or_insert(0) += 1;
        Ok(store)
    }

    /// main iteration loop: sweep, damped update, convergence control
    pub fn solver(&mut self) -> Result<DMatrix<f64>, RelaxError> {
        self.task_check();
        let begin = Instant::now();
        let ne = self.layout.ne;
        let m = self.grid.len();
        let mut last_error = f64::INFINITY;

        for it in 1..=self.params.max_iterations {
            *self
                .calc_statistics
                .entry("number of iterations".to_string())
                .or_insert(0) += 1;

            let store = self.sweep()?;
            let report = normalized_error(&store, &self.layout, &self.params.scalv, m);
            last_error = report.err;
            let fac = damping_factor(report.err, self.params.slowc);

            // apply the damped correction: variable j is corrected by
            // store slot indexv[j], the slot its block columns occupy
            for j in 0..ne {
                let jv = self.layout.indexv[j];
                for k in 0..m {
                    self.y[(j, k)] -= fac * store.correction(jv, k);
                }
            }
            check_finite(&self.y, it)?;
            self.result = Some(self.y.clone());

            info!("{:>8} {:>12} {:>12}", "Iter.", "Error", "FAC");
            info!("{:>8} {:>12.6e} {:>12.6}", it, report.err, fac);
            for j in 0..ne {
                info!(
                    "var {:>3}  kmax {:>5}  max error {:>14.6e}",
                    j, report.kmax[j], report.ermax[j]
                );
            }

            if report.err < self.params.conv {
                if self.problem.converged_aux(it) {
                    info!("\n \n Solution has converged after {} iterations!", it);
                    let end = begin.elapsed();
                    elapsed_time(end);
                    statistics_table(&self.calc_statistics);
                    return Ok(self.y.clone());
                }
                info!(
                    "numeric tolerance met on iteration {} but the auxiliary condition still holds the solve open",
                    it
                );
            }
        }

        warn!(
            "\n \n too many iterations in relaxation solver, last error {:.6e}",
            last_error
        );
        statistics_table(&self.calc_statistics);
        Err(RelaxError::IterationLimitExceeded {
            max_iterations: self.params.max_iterations,
            last_error,
        })
    }

    // wrapper around solver function to implement logging
    pub fn solve(&mut self) -> Result<DMatrix<f64>, RelaxError> {
        let loglevel = self.loglevel.clone();
        let log_option = if let Some(level) = loglevel {
            match level.as_str() {
                "debug" => LevelFilter::Info,
                "info" => LevelFilter::Info,
                "warn" => LevelFilter::Warn,
                "error" => LevelFilter::Error,
                _ => panic!("loglevel must be debug, info, warn or error"),
            }
        } else {
            LevelFilter::Info
        };
        let date_and_time = Local::now().format("%Y-%m-%d_%H-%M-%S");
        let name = format!("log_{}.txt", date_and_time);
        let logger_instance = CombinedLogger::init(vec![
            TermLogger::new(
                log_option,
                Config::default(),
                TerminalMode::Mixed,
                ColorChoice::Auto,
            ),
            WriteLogger::new(log_option, Config::default(), File::create(name).unwrap()),
        ]);

        match logger_instance {
            Ok(()) => {
                let res = self.solver();
                info!(" \n \n Program ended");
                res
            }
            Err(_) => self.solver(),
        }
    }

    pub fn get_result(&self) -> Option<DMatrix<f64>> {
        self.result.clone()
    }

    pub fn get_statistics(&self) -> &HashMap<String, usize> {
        &self.calc_statistics
    }

    pub fn save_to_file(&self, headers: &Vec<String>, filename: Option<String>) {
        let name = if let Some(name) = filename {
            format!("{}.txt", name)
        } else {
            "result.txt".to_string()
        };
        if let Some(result) = self.get_result() {
            let _ = save_profile_to_file(&result, headers, &name, &self.grid.x, &"r".to_string());
        }
    }
}
