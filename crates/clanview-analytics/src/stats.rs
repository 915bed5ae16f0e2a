//! Windowed statistics over sample series.

use serde::Serialize;

use crate::series::TimeSeriesBuffer;

/// Slope magnitude below which a series counts as stable.
pub const TREND_THRESHOLD: f64 = 0.1;

/// Samples required before [`trend_analysis`] reports anything.
pub const MIN_ANALYSIS_SAMPLES: usize = 5;

/// Resource variance below which the resource supply is graded stable.
pub const STABILITY_VARIANCE: f64 = 100.0;

/// Coarse direction of a series over index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
    InsufficientData,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Trend::Increasing => "increasing",
            Trend::Decreasing => "decreasing",
            Trend::Stable => "stable",
            Trend::InsufficientData => "insufficient_data",
        };
        f.write_str(label)
    }
}

/// Trailing moving average; element `i` averages `data[i+1-window ..= i]`.
///
/// Windows near the start are shorter rather than padded. A window of 0 is
/// treated as 1.
pub fn moving_average(data: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..data.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let slice = &data[start..=i];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

/// Ordinary least squares slope of `data` against its indices.
pub fn slope(data: &[f64]) -> Option<f64> {
    if data.len() < 2 {
        return None;
    }
    let n = data.len() as f64;
    // Closed forms for sum(i) and sum(i^2) over 0..n
    let sum_x = n * (n - 1.0) / 2.0;
    let sum_x2 = n * (n - 1.0) * (2.0 * n - 1.0) / 6.0;
    let sum_y: f64 = data.iter().sum();
    let sum_xy: f64 = data.iter().enumerate().map(|(i, y)| i as f64 * y).sum();

    let denominator = n * sum_x2 - sum_x * sum_x;
    Some((n * sum_xy - sum_x * sum_y) / denominator)
}

/// Classify the slope of `data` against [`TREND_THRESHOLD`].
pub fn trend(data: &[f64]) -> Trend {
    match slope(data) {
        None => Trend::InsufficientData,
        Some(s) if s > TREND_THRESHOLD => Trend::Increasing,
        Some(s) if s < -TREND_THRESHOLD => Trend::Decreasing,
        Some(_) => Trend::Stable,
    }
}

/// Pearson correlation of two equal-length series.
///
/// Returns 0 for mismatched lengths, fewer than two samples, or an undefined
/// result (zero variance in either input).
pub fn correlation(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() || x.len() < 2 {
        return 0.0;
    }
    let (Some(mean_x), Some(mean_y)) = (mean(x), mean(y)) else {
        return 0.0;
    };

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let r = cov / (var_x * var_y).sqrt();
    if r.is_nan() {
        0.0
    } else {
        r.clamp(-1.0, 1.0)
    }
}

pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        None
    } else {
        Some(data.iter().sum::<f64>() / data.len() as f64)
    }
}

/// Population variance.
pub fn variance(data: &[f64]) -> Option<f64> {
    let mean = mean(data)?;
    Some(data.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / data.len() as f64)
}

/// Descriptive statistics for one series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub trend: Trend,
    pub average: f64,
    pub max: f64,
    pub min: f64,
    pub current: f64,
    pub variance: f64,
}

impl SeriesSummary {
    /// Summarize a non-empty series.
    pub fn of(data: &[f64]) -> Option<Self> {
        let current = *data.last()?;
        Some(Self {
            trend: trend(data),
            average: mean(data)?,
            max: data.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            min: data.iter().copied().fold(f64::INFINITY, f64::min),
            current,
            variance: variance(data)?,
        })
    }
}

/// Grade of resource supply steadiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stability {
    High,
    Low,
}

impl Stability {
    pub fn from_variance(variance: f64) -> Self {
        if variance < STABILITY_VARIANCE {
            Stability::High
        } else {
            Stability::Low
        }
    }
}

/// Combined population/resource report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendReport {
    pub samples: usize,
    pub first_step: u64,
    pub last_step: u64,
    pub population: SeriesSummary,
    pub resources: SeriesSummary,
    /// Pearson correlation between population and resources
    pub correlation: f64,
    pub resource_stability: Stability,
}

/// Result of [`trend_analysis`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrendAnalysis {
    InsufficientData { samples: usize, required: usize },
    Ready(TrendReport),
}

/// Summarize the buffer's current contents without modifying it.
pub fn trend_analysis(buffer: &TimeSeriesBuffer) -> TrendAnalysis {
    let samples = buffer.len();
    let insufficient = TrendAnalysis::InsufficientData {
        samples,
        required: MIN_ANALYSIS_SAMPLES,
    };
    if samples < MIN_ANALYSIS_SAMPLES {
        return insufficient;
    }

    let labels = buffer.labels();
    let (Some(population), Some(resources)) = (
        SeriesSummary::of(buffer.population()),
        SeriesSummary::of(buffer.resource()),
    ) else {
        return insufficient;
    };

    TrendAnalysis::Ready(TrendReport {
        samples,
        first_step: labels[0],
        last_step: labels[samples - 1],
        correlation: correlation(buffer.population(), buffer.resource()),
        resource_stability: Stability::from_variance(resources.variance),
        population,
        resources,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn moving_average_identities() {
        assert_eq!(moving_average(&[7.5], 1), vec![7.5]);
        assert_eq!(moving_average(&[7.5], 20), vec![7.5]);

        let data = [3.0, -1.0, 4.0, 1.0, 5.0];
        assert_eq!(moving_average(&data, 1), data.to_vec());
        assert!(moving_average(&[], 5).is_empty());
    }

    #[test]
    fn moving_average_short_leading_windows() {
        let averaged = moving_average(&[2.0, 4.0, 6.0, 8.0], 3);
        assert_eq!(averaged.len(), 4);
        assert!(approx(averaged[0], 2.0));
        assert!(approx(averaged[1], 3.0));
        assert!(approx(averaged[2], 4.0));
        assert!(approx(averaged[3], 6.0));
    }

    #[test]
    fn moving_average_zero_window_is_identity() {
        assert_eq!(moving_average(&[1.0, 2.0], 0), vec![1.0, 2.0]);
    }

    #[test]
    fn trend_classification() {
        assert_eq!(trend(&[]), Trend::InsufficientData);
        assert_eq!(trend(&[4.0]), Trend::InsufficientData);
        assert_eq!(trend(&[1.0, 2.0, 3.0, 4.0, 5.0]), Trend::Increasing);
        assert_eq!(trend(&[5.0, 4.0, 3.0, 2.0, 1.0]), Trend::Decreasing);
        assert_eq!(trend(&[3.0, 3.0, 3.0, 3.0]), Trend::Stable);
    }

    #[test]
    fn trend_threshold_is_absolute() {
        // slope 0.05 per step stays stable regardless of magnitude
        let gentle: Vec<f64> = (0..10).map(|i| 1000.0 + i as f64 * 0.05).collect();
        assert_eq!(trend(&gentle), Trend::Stable);
        assert!((slope(&gentle).unwrap() - 0.05).abs() < 1e-6);
    }

    #[test]
    fn correlation_edge_cases() {
        let x = [1.0, 2.0, 4.0, 8.0, 3.0];
        assert!(approx(correlation(&x, &x), 1.0));

        let inverted: Vec<f64> = x.iter().map(|v| -2.0 * v).collect();
        assert!(approx(correlation(&x, &inverted), -1.0));

        assert_eq!(correlation(&[1.0, 1.0, 1.0], &[2.0, 2.0, 2.0]), 0.0);
        assert_eq!(correlation(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(correlation(&[1.0], &[1.0]), 0.0);
    }

    #[test]
    fn variance_matches_population_formula() {
        assert_eq!(variance(&[]), None);
        assert!(approx(variance(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap(), 4.0));
    }

    #[test]
    fn analysis_needs_five_samples() {
        let mut buffer = TimeSeriesBuffer::new(50);
        for step in 0..4 {
            buffer.ingest(step, 10.0, 10.0);
        }
        assert_eq!(
            trend_analysis(&buffer),
            TrendAnalysis::InsufficientData { samples: 4, required: MIN_ANALYSIS_SAMPLES }
        );
    }

    #[test]
    fn analysis_reports_both_series() {
        let mut buffer = TimeSeriesBuffer::new(50);
        for step in 0..10u64 {
            buffer.ingest(step, 100.0 + step as f64 * 5.0, 900.0 - step as f64 * 20.0);
        }

        let before = buffer.labels().to_vec();
        let TrendAnalysis::Ready(report) = trend_analysis(&buffer) else {
            panic!("expected a report");
        };
        assert_eq!(buffer.labels(), before.as_slice());

        assert_eq!(report.samples, 10);
        assert_eq!(report.first_step, 0);
        assert_eq!(report.last_step, 9);
        assert_eq!(report.population.trend, Trend::Increasing);
        assert_eq!(report.resources.trend, Trend::Decreasing);
        assert_eq!(report.population.current, 145.0);
        assert_eq!(report.population.max, 145.0);
        assert_eq!(report.population.min, 100.0);
        assert!(approx(report.population.average, 122.5));
        assert!(approx(report.correlation, -1.0));
        assert_eq!(report.resource_stability, Stability::Low);
    }

    #[test]
    fn steady_resources_grade_high() {
        assert_eq!(Stability::from_variance(12.0), Stability::High);
        assert_eq!(Stability::from_variance(100.0), Stability::Low);
    }
}
