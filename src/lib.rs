//! # movie_insights
//!
//! Exploratory analysis over tabular movie data, run as one linear pipeline:
//!
//! - **Loader**: memory-mapped CSV reading with quoted fields and per-column
//!   type inference (int, float, string)
//! - **Cleaner**: coerces formatted numbers and years, drops incomplete records
//! - **Aggregator**: top-N ranking, group-by reductions, group filters and
//!   Pearson correlation, SIMD-accelerated where AVX2 is available
//! - **Presenter**: console summaries plus chart specs handed to a
//!   [`presenter::ChartSink`]
//!
//! Which columns play which role, and which analyses run, is data
//! ([`config::AnalysisConfig`]), either one of the built-in presets or a TOML
//! file.
//!
//! # Example
//!
//! ```rust,no_run
//! use movie_insights::{AnalysisConfig, JsonFileSink, Pipeline};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = Pipeline::new(AnalysisConfig::top_movies());
//!     let mut sink = JsonFileSink::new(Path::new("outputs"));
//!
//!     let report = pipeline.run(Path::new("top_movies.csv"), &mut sink)?;
//!     for (heading, body) in &report.sections {
//!         println!("--- {} ---\n{}", heading, body);
//!     }
//!     Ok(())
//! }
//! ```

mod helpers;

pub mod config;
pub mod pipeline;
pub mod presenter;
pub mod processor;

pub use config::{Analysis, AnalysisConfig, ColumnRoles};
pub use pipeline::{Pipeline, RunReport};
pub use presenter::{ChartSink, ChartSpec, JsonFileSink, MemorySink};
pub use processor::{AggregateOp, AggregateResult, FilterPredicate, ProcessorError, Value};
