mod relax_tests;

pub mod NR_relax_solver;
pub mod block_elimination;
pub mod relax_traits;
pub mod relax_utils;
