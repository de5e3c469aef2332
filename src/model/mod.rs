// public modules
pub mod config;
pub mod core;
pub mod predict;
pub mod validation;

// private modules
mod setters;
