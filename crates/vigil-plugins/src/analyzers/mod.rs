//! Analyzer plugins.

mod statistical;

pub use statistical::StatisticalAnalyzer;
