// src/lib.rs

// Top-level modules (each has its own mod.rs or file):
pub mod config;
pub mod dataset;
pub mod error;
pub mod mesh_analysis;
pub mod metrics;
pub mod parser;
pub mod render;
pub mod structs_and_impls;
pub mod writer;
