/*
Block elimination kernel of the relaxation solver: pivoted row reduction of
one equation block, folding of the previous point's stored reduction into
the current block (block-tridiagonal forward elimination), and the reverse
back substitution sweep. The full (NE*M) x (NE*M) matrix is never formed -
each mesh point only ever sees its own block and the reduced coefficients
of its left neighbour.
*/
use super::relax_traits::{BlockLayout, EliminationStore, RelaxError};
use nalgebra::DMatrix;

/// Row Reducer: Gauss-Jordan elimination with scaled full pivoting over the
/// pivot zone of one equation block.
///
/// Rows `rows.0..rows.1` of `s` are active; the pivot zone spans columns
/// `je1..je1 + (rows.1 - rows.0)`. Pivots are chosen as the largest entry
/// of the zone scaled by the inverse of its row's maximum absolute value -
/// raw magnitude would bias the selection when diffusion and reaction
/// coefficients differ by many orders of magnitude. After the reduction the
/// trailing columns `je1 + nrows ..= jsf` are copied, with the row
/// permutation applied, into columns `jc1..` of the store slice `slab`.
///
/// A pivot-zone row that is identically zero, or an exactly zero pivot,
/// makes the linearization degenerate: the whole solve is aborted with
/// `SingularBlock`.
pub fn reduce_block(
    s: &mut DMatrix<f64>,
    rows: (usize, usize),
    je1: usize,
    layout: &BlockLayout,
    slab: &mut DMatrix<f64>,
    jc1: usize,
    point: usize,
) -> Result<(), RelaxError> {
    let (ie1, ie2) = rows;
    let nrows = ie2 - ie1;
    let je2 = je1 + nrows; // exclusive end of the pivot zone
    let jsf = layout.jsf();

    // implicit row scales: 1 / max |s[i, pivot zone]|
    let mut pscl = vec![0.0f64; nrows];
    let mut indxr: Vec<Option<usize>> = vec![None; nrows];
    for i in ie1..ie2 {
        let mut big = 0.0f64;
        for j in je1..je2 {
            big = big.max(s[(i, j)].abs());
        }
        if big == 0.0 {
            return Err(RelaxError::SingularBlock { point });
        }
        pscl[i - ie1] = 1.0 / big;
    }

    for _id in 0..nrows {
        // scaled full pivot search over the not-yet-assigned rows
        let mut piv = 0.0f64;
        let mut ipiv = ie1;
        let mut jpiv = je1;
        for i in ie1..ie2 {
            if indxr[i - ie1].is_some() {
                continue;
            }
            let mut big = 0.0f64;
            let mut jp = je1;
            for j in je1..je2 {
                if s[(i, j)].abs() > big {
                    big = s[(i, j)].abs();
                    jp = j;
                }
            }
            if big * pscl[i - ie1] > piv {
                piv = big * pscl[i - ie1];
                ipiv = i;
                jpiv = jp;
            }
        }
        if s[(ipiv, jpiv)] == 0.0 {
            return Err(RelaxError::SingularBlock { point });
        }
        indxr[ipiv - ie1] = Some(jpiv);

        // normalize the pivot row and clear the pivot column elsewhere
        let pivinv = 1.0 / s[(ipiv, jpiv)];
        for j in je1..=jsf {
            s[(ipiv, j)] *= pivinv;
        }
        s[(ipiv, jpiv)] = 1.0;
        for i in ie1..ie2 {
            if indxr[i - ie1] != Some(jpiv) && s[(i, jpiv)] != 0.0 {
                let dum = s[(i, jpiv)];
                for j in je1..=jsf {
                    s[(i, j)] -= dum * s[(ipiv, j)];
                }
                s[(i, jpiv)] = 0.0;
            }
        }
    }

    // copy the reduced trailing columns into the store, unscrambling the
    // row order chosen by the pivoting
    let js1 = je2;
    for i in ie1..ie2 {
        let assigned = indxr[i - ie1].unwrap_or(je1);
        let irow = assigned + ie1 - je1;
        for j in js1..=jsf {
            slab[(irow, jc1 + j - js1)] = s[(i, j)];
        }
    }
    Ok(())
}

/// Block Coupling Eliminator: folds the stored reduction of mesh point k-1
/// into the raw block of mesh point k before that block is itself reduced.
///
/// `jz1..jz1+nb` are the columns of the already-eliminated slot unknowns,
/// `jm1..jm1+nbf` the columns they are expressed through; for every
/// eliminated column a multiple of the stored row is subtracted from the
/// coupled coefficient columns and from the residual column.
pub fn fold_reduced(
    s: &mut DMatrix<f64>,
    prev: &DMatrix<f64>,
    rows: (usize, usize),
    jz1: usize,
    jm1: usize,
    layout: &BlockLayout,
) {
    let (iz1, iz2) = rows;
    let nb = layout.nb;
    let nbf = layout.nbf();
    let jmf = layout.jsf();
    let jcf = nbf; // residual column of the store slice

    let mut ic = nbf;
    for j in jz1..jz1 + nb {
        for l in jm1..jm1 + nbf {
            let vx = prev[(ic, l - jm1)];
            for i in iz1..iz2 {
                s[(i, l)] -= s[(i, j)] * vx;
            }
        }
        let vx = prev[(ic, jcf)];
        for i in iz1..iz2 {
            s[(i, jmf)] -= s[(i, j)] * vx;
        }
        ic += 1;
    }
}

/// Back-Substitution: reverse sweep over the fully populated store. At the
/// last point the reduced coefficients give the correction directly; every
/// earlier point substitutes the correction already computed for its right
/// neighbour. Afterwards column 0 of slices `0..M` holds the correction per
/// equation slot, in slot order. Pure linear combination, never fails on a
/// well formed store.
pub fn back_substitute(store: &mut EliminationStore, layout: &BlockLayout, m: usize) {
    let ne = layout.ne;
    let nb = layout.nb;
    let nbf = layout.nbf();
    let jf = nbf; // residual column of a store slice

    for k in (0..m).rev() {
        let im = if k == 0 { nbf } else { 0 };
        for j in 0..nbf {
            let xx = store.slab(k + 1)[(j, jf)];
            let slab = store.slab_mut(k);
            for i in im..ne {
                slab[(i, jf)] -= slab[(i, j)] * xx;
            }
        }
    }
    // gather the corrections into column 0, in equation slot order
    for k in 0..m {
        for i in 0..nb {
            let v = store.slab(k)[(i + nbf, jf)];
            store.slab_mut(k)[(i, 0)] = v;
        }
        for i in 0..nbf {
            let v = store.slab(k + 1)[(i, jf)];
            store.slab_mut(k)[(i + nb, 0)] = v;
        }
    }
}
