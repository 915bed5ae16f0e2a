//! Bounded, index-aligned sample buffers.

/// Smallest accepted buffer bound.
pub const MIN_DATA_POINTS: usize = 10;

/// Largest accepted buffer bound.
pub const MAX_DATA_POINTS: usize = 500;

/// Bound used when none is configured.
pub const DEFAULT_DATA_POINTS: usize = 100;

/// Clamp a requested bound into `[MIN_DATA_POINTS, MAX_DATA_POINTS]`.
pub fn clamp_data_points(requested: usize) -> usize {
    requested.clamp(MIN_DATA_POINTS, MAX_DATA_POINTS)
}

/// A step-labelled table of `N` value columns with FIFO eviction.
///
/// Invariant: the label column and every value column always have the same
/// length, never above `max_points`.
#[derive(Debug, Clone)]
pub struct AlignedSeries<const N: usize> {
    labels: Vec<u64>,
    columns: [Vec<f64>; N],
    max_points: usize,
}

impl<const N: usize> AlignedSeries<N> {
    /// Create an empty table; the bound is clamped.
    pub fn new(max_points: usize) -> Self {
        let max_points = clamp_data_points(max_points);
        Self {
            labels: Vec::with_capacity(max_points + 1),
            columns: std::array::from_fn(|_| Vec::with_capacity(max_points + 1)),
            max_points,
        }
    }

    /// Append one row, evicting the oldest row if the bound is exceeded.
    pub fn push(&mut self, label: u64, values: [f64; N]) {
        self.labels.push(label);
        for (column, value) in self.columns.iter_mut().zip(values) {
            column.push(value);
        }
        if self.labels.len() > self.max_points {
            self.evict_front(1);
        }
    }

    /// Change the bound, evicting from the front if it shrank.
    ///
    /// Returns the bound actually applied.
    pub fn set_max_points(&mut self, requested: usize) -> usize {
        self.max_points = clamp_data_points(requested);
        let excess = self.labels.len().saturating_sub(self.max_points);
        if excess > 0 {
            self.evict_front(excess);
        }
        self.max_points
    }

    fn evict_front(&mut self, count: usize) {
        self.labels.drain(..count);
        for column in &mut self.columns {
            column.drain(..count);
        }
    }

    pub fn max_points(&self) -> usize {
        self.max_points
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[u64] {
        &self.labels
    }

    /// Value column `index`.
    pub fn column(&self, index: usize) -> &[f64] {
        &self.columns[index]
    }

    /// Most recent row.
    pub fn last(&self) -> Option<(u64, [f64; N])> {
        let label = *self.labels.last()?;
        let mut values = [0.0; N];
        for (slot, column) in values.iter_mut().zip(&self.columns) {
            *slot = *column.last()?;
        }
        Some((label, values))
    }

    pub fn clear(&mut self) {
        self.labels.clear();
        for column in &mut self.columns {
            column.clear();
        }
    }
}

/// Population and resource totals per simulation step.
#[derive(Debug, Clone)]
pub struct TimeSeriesBuffer {
    inner: AlignedSeries<2>,
}

impl Default for TimeSeriesBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_POINTS)
    }
}

impl TimeSeriesBuffer {
    pub fn new(max_points: usize) -> Self {
        Self {
            inner: AlignedSeries::new(max_points),
        }
    }

    /// Record the totals observed at `step`.
    pub fn ingest(&mut self, step: u64, population: f64, resource: f64) {
        self.inner.push(step, [population, resource]);
    }

    pub fn set_max_points(&mut self, requested: usize) -> usize {
        self.inner.set_max_points(requested)
    }

    pub fn max_points(&self) -> usize {
        self.inner.max_points()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn labels(&self) -> &[u64] {
        self.inner.labels()
    }

    pub fn population(&self) -> &[f64] {
        self.inner.column(0)
    }

    pub fn resource(&self) -> &[f64] {
        self.inner.column(1)
    }

    /// Latest `(step, population, resource)` sample.
    pub fn latest(&self) -> Option<(u64, f64, f64)> {
        self.inner.last().map(|(step, [p, r])| (step, p, r))
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }
}

/// Controlled, free and disputed area per simulation step.
#[derive(Debug, Clone)]
pub struct SpatialSeries {
    inner: AlignedSeries<3>,
}

impl Default for SpatialSeries {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_POINTS)
    }
}

impl SpatialSeries {
    pub fn new(max_points: usize) -> Self {
        Self {
            inner: AlignedSeries::new(max_points),
        }
    }

    pub fn ingest(&mut self, step: u64, controlled: f64, free: f64, disputed: f64) {
        self.inner.push(step, [controlled, free, disputed]);
    }

    pub fn set_max_points(&mut self, requested: usize) -> usize {
        self.inner.set_max_points(requested)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn labels(&self) -> &[u64] {
        self.inner.labels()
    }

    pub fn controlled(&self) -> &[f64] {
        self.inner.column(0)
    }

    pub fn free(&self) -> &[f64] {
        self.inner.column(1)
    }

    pub fn disputed(&self) -> &[f64] {
        self.inner.column(2)
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn keeps_last_hundred_of_one_fifty() {
        let mut buffer = TimeSeriesBuffer::new(100);
        for step in 0..150u64 {
            buffer.ingest(step, step as f64 * 2.0, step as f64 * 3.0);
        }

        assert_eq!(buffer.len(), 100);
        let expected: Vec<u64> = (50..150).collect();
        assert_eq!(buffer.labels(), expected.as_slice());
        assert_eq!(buffer.population()[0], 100.0);
        assert_eq!(buffer.resource()[99], 447.0);
        assert_eq!(buffer.latest(), Some((149, 298.0, 447.0)));
    }

    #[test]
    fn bound_is_clamped() {
        assert_eq!(TimeSeriesBuffer::new(3).max_points(), MIN_DATA_POINTS);
        assert_eq!(TimeSeriesBuffer::new(10_000).max_points(), MAX_DATA_POINTS);

        let mut buffer = TimeSeriesBuffer::default();
        assert_eq!(buffer.max_points(), DEFAULT_DATA_POINTS);
        assert_eq!(buffer.set_max_points(0), MIN_DATA_POINTS);
        assert_eq!(buffer.set_max_points(501), MAX_DATA_POINTS);
    }

    #[test]
    fn shrinking_evicts_oldest() {
        let mut buffer = TimeSeriesBuffer::new(50);
        for step in 0..40u64 {
            buffer.ingest(step, 1.0, 2.0);
        }
        buffer.set_max_points(20);
        assert_eq!(buffer.len(), 20);
        assert_eq!(buffer.labels().first(), Some(&20));
        assert_eq!(buffer.population().len(), 20);
        assert_eq!(buffer.resource().len(), 20);
    }

    #[test]
    fn clear_empties_every_column() {
        let mut spatial = SpatialSeries::new(10);
        spatial.ingest(1, 10.0, 80.0, 1.0);
        assert_eq!(spatial.len(), 1);
        spatial.clear();
        assert!(spatial.is_empty());
        assert!(spatial.controlled().is_empty());
        assert!(spatial.disputed().is_empty());
    }

    proptest! {
        #[test]
        fn columns_stay_aligned(
            bound in 0usize..600,
            samples in prop::collection::vec((0u64..10_000, -1e6f64..1e6, -1e6f64..1e6), 0..700),
        ) {
            let mut buffer = TimeSeriesBuffer::new(bound);
            for (step, population, resource) in samples {
                buffer.ingest(step, population, resource);
                prop_assert_eq!(buffer.labels().len(), buffer.population().len());
                prop_assert_eq!(buffer.labels().len(), buffer.resource().len());
                prop_assert!(buffer.len() <= buffer.max_points());
                prop_assert_eq!(buffer.latest(), Some((step, population, resource)));
            }
        }

        #[test]
        fn resize_keeps_alignment(pushes in 0usize..300, bound in 0usize..600) {
            let mut spatial = SpatialSeries::new(MAX_DATA_POINTS);
            for step in 0..pushes as u64 {
                spatial.ingest(step, step as f64, 0.0, 1.0);
            }
            spatial.set_max_points(bound);
            prop_assert!(spatial.len() <= clamp_data_points(bound));
            prop_assert_eq!(spatial.labels().len(), spatial.controlled().len());
            prop_assert_eq!(spatial.labels().len(), spatial.free().len());
            prop_assert_eq!(spatial.labels().len(), spatial.disputed().len());
            if let Some(&first) = spatial.labels().first() {
                prop_assert_eq!(spatial.controlled()[0], first as f64);
            }
        }
    }
}
