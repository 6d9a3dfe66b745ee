//! Runtime statistics for the sampling and inference pipeline.

pub mod log;

pub use log::{
    create_shared_stats, create_shared_stats_with_persistence, PersistedStats, PipelineStats,
    SharedPipelineStats, StatsSnapshot,
};
