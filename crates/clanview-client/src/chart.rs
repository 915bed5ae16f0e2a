//! Output seam for chart consumers.

use clanview_analytics::SpatialDistribution;

/// Receives every sample admitted into the time series.
pub trait ChartSink {
    fn push_series(&mut self, step: u64, population: f64, resources: f64);

    fn push_spatial(&mut self, step: u64, distribution: &SpatialDistribution);

    /// Buffers were cleared by a reset.
    fn clear(&mut self) {}
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullChart;

impl ChartSink for NullChart {
    fn push_series(&mut self, _step: u64, _population: f64, _resources: f64) {}

    fn push_spatial(&mut self, _step: u64, _distribution: &SpatialDistribution) {}
}
