//! different utility modules used throughout the project
/// tiny module to save a converged profile into a text or csv file
pub mod logger;
