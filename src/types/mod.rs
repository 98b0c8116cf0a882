//! Core domain types shared by the config, decoder and dispatch layers.

pub mod ids;

pub use ids::{ProjectPath, Stage};
