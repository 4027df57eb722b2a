//! Analysis stages.
//!
//! Records flow normalizer → aggregator → ranker; [`pipeline`] drives the
//! stages after fetching.

pub mod aggregator;
pub mod normalizer;
pub mod pipeline;
pub mod ranker;

pub use pipeline::{analyze_all, AnalysisOptions};
