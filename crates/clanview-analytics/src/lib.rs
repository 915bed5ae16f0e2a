//! Clanview Analytics
//!
//! Bounded time-series storage and the statistics computed over it.
//!
//! # Components
//!
//! - **Series**: [`TimeSeriesBuffer`] and [`SpatialSeries`] keep step-aligned
//!   columns under a FIFO bound of 10-500 points
//! - **Stats**: moving average, OLS trend, Pearson correlation and the
//!   combined [`trend_analysis`] report
//! - **Spatial**: controlled/free/disputed split of the grid
//! - **Throttle**: message-count and wall-clock gates for ingestion
//!
//! # Usage
//!
//! ```
//! use clanview_analytics::{trend_analysis, TimeSeriesBuffer, TrendAnalysis};
//!
//! let mut buffer = TimeSeriesBuffer::new(100);
//! for step in 0..10 {
//!     buffer.ingest(step, 50.0 + step as f64, 900.0);
//! }
//! assert!(matches!(trend_analysis(&buffer), TrendAnalysis::Ready(_)));
//! ```

mod series;
mod spatial;
mod stats;
mod throttle;

pub use series::{
    clamp_data_points, AlignedSeries, SpatialSeries, TimeSeriesBuffer, DEFAULT_DATA_POINTS,
    MAX_DATA_POINTS, MIN_DATA_POINTS,
};
pub use spatial::{SpatialDistribution, DISPUTED_SHARE};
pub use stats::{
    correlation, mean, moving_average, slope, trend, trend_analysis, variance, SeriesSummary,
    Stability, Trend, TrendAnalysis, TrendReport, MIN_ANALYSIS_SAMPLES, STABILITY_VARIANCE,
    TREND_THRESHOLD,
};
pub use throttle::IngestThrottle;
