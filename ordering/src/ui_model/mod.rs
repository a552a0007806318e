pub mod filter_model;

pub use filter_model::*;
