/// Numerical machinery of the crate. `Relax_Damp` is the relaxation
/// (global Newton) solver for two-point boundary value problems on a fixed
/// mesh: per-point linearization, block-tridiagonal forward elimination
/// with scaled full pivoting, back substitution and damped iteration
/// control.
///
/// The usual workflow: implement `relax_traits::DifferenceEquation` for the
/// problem (or use a ready made model from `chemistry`), build a
/// `BlockLayout` and a `Grid`, pick `RelaxParams`, then construct
/// `NR_relax_solver::RelaxBVP` and call `solve()` (with logging) or
/// `solver()` (bare).
pub mod Relax_Damp;
