use super::relax_traits::{BlockLayout, EliminationStore, RelaxError};
use log::info;
use nalgebra::{DMatrix, DVector};
use std::collections::HashMap;
use std::time::Duration;
use tabled::{builder::Builder, settings::Style};

/// Convergence bookkeeping of one iteration: the total normalized error and,
/// per equation, the largest normalized correction and the mesh point where
/// it occured.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub err: f64,
    pub ermax: Vec<f64>,
    pub kmax: Vec<usize>,
}

/// Error metric over the correction left in the store by back substitution:
/// for each variable the absolute corrections of its store slot are summed
/// over the mesh and normalized by the variable's scale; the total error is
/// the mean over all NE*M unknowns.
pub fn normalized_error(
    store: &EliminationStore,
    layout: &BlockLayout,
    scalv: &DVector<f64>,
    m: usize,
) -> ErrorReport {
    let ne = layout.ne;
    let mut err = 0.0;
    let mut ermax = vec![0.0; ne];
    let mut kmax = vec![0usize; ne];
    for j in 0..ne {
        // variable j is solved for in store slot indexv[j]
        let jv = layout.indexv[j];
        let mut errj = 0.0;
        let mut vmax = 0.0;
        let mut km = 0;
        for k in 0..m {
            let vz = store.correction(jv, k).abs();
            if vz > vmax {
                vmax = vz;
                km = k;
            }
            errj += vz;
        }
        err += errj / scalv[j];
        ermax[j] = store.correction(jv, km) / scalv[j];
        kmax[j] = km;
    }
    err /= (ne * m) as f64;
    ErrorReport { err, ermax, kmax }
}

/// Damping factor for the Newton update: the full correction is taken when
/// the normalized error is below the ceiling `slowc`, otherwise the step is
/// shortened to `slowc / err` of the raw correction.
pub fn damping_factor(err: f64, slowc: f64) -> f64 {
    if err > slowc { slowc / err } else { 1.0 }
}

/// Scan the updated trial solution for NaN or infinity. The relaxation
/// itself cannot recover from a non-finite state but the problem definition
/// layer can (re-clamp a driving parameter, soften an uptake flux), so the
/// condition is reported as an error instead of propagating garbage.
pub fn check_finite(y: &DMatrix<f64>, iteration: usize) -> Result<(), RelaxError> {
    let (ne, m) = y.shape();
    for j in 0..ne {
        for k in 0..m {
            if !y[(j, k)].is_finite() {
                return Err(RelaxError::NonFiniteState {
                    variable: j,
                    point: k,
                    iteration,
                });
            }
        }
    }
    Ok(())
}

pub fn elapsed_time(elapsed: Duration) -> (String, f64) {
    let time = elapsed.as_millis();
    if time < 1000 {
        info!("Elapsed {} ms", time);
        (" ms ".to_string(), time as f64)
    } else if time >= 1000 && time < 60_000 {
        info!("Elapsed {} s", elapsed.as_secs());
        (" s".to_string(), elapsed.as_secs() as f64)
    } else if time >= 60_000 && time < 3600_000 {
        info!("Elapsed {} min", elapsed.as_secs() / 60);
        (" min".to_string(), elapsed.as_secs() as f64 / 60.0)
    } else {
        info!("Elapsed {} h", elapsed.as_secs() / 3600);
        (" h".to_string(), elapsed.as_secs() as f64 / 3600.0)
    }
}

// render the per-solve counters as a table
pub fn statistics_table(stats: &HashMap<String, usize>) {
    let mut table = Builder::from(stats.clone()).build();
    table.with(Style::modern_rounded());
    info!("\n \n CALC STATISTICS \n \n {}", table.to_string());
}
