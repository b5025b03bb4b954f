
pub mod carbonate;
pub mod continuation;
pub mod spherical_model;
