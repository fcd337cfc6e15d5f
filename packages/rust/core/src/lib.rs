//! Core pipeline orchestration and domain logic for GridMerge.
//!
//! This crate ties together tabular loading, the boundary left join, and
//! shapefile output into one end-to-end workflow ([`pipeline::run_pipeline`]).

pub mod merge;
pub mod pipeline;
pub mod writer;
