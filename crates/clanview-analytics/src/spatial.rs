//! Territorial split of the grid into controlled, free and disputed area.

use clanview_model::Snapshot;
use serde::Serialize;

/// Fraction of controlled area counted as contested.
pub const DISPUTED_SHARE: f64 = 0.1;

/// Area split of one snapshot, in cells.
///
/// Invariant: `controlled + free + disputed == total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SpatialDistribution {
    pub controlled: f64,
    pub free: f64,
    pub disputed: f64,
    pub total: f64,
}

impl SpatialDistribution {
    /// Derive the split from agent territory sizes.
    ///
    /// The grid area comes from the resource grid, falling back to the
    /// reported grid size when the grid itself is absent.
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let total = if snapshot.has_grid() {
            snapshot.total_cells()
        } else {
            snapshot.grid_size.map(|g| g.cells()).unwrap_or(0)
        } as f64;

        let claimed: f64 = snapshot
            .agents
            .iter()
            .filter_map(|a| a.territory_size)
            .filter(|t| t.is_finite() && *t > 0.0)
            .sum();

        Self::split(claimed, total)
    }

    /// Split `total` cells given `claimed` raw territory.
    pub fn split(claimed: f64, total: f64) -> Self {
        let total = total.max(0.0);
        let controlled = claimed.clamp(0.0, total);
        let disputed = (controlled * DISPUTED_SHARE).min(total - controlled);
        let free = total - controlled - disputed;
        Self {
            controlled,
            free,
            disputed,
            total,
        }
    }

    pub fn sum(&self) -> f64 {
        self.controlled + self.free + self.disputed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clanview_model::{Agent, GridSize};

    fn snapshot_with(territories: &[Option<f64>], rows: usize, cols: usize) -> Snapshot {
        Snapshot {
            grid: vec![vec![0.0; cols]; rows],
            agents: territories
                .iter()
                .enumerate()
                .map(|(i, t)| Agent {
                    id: i as u32 + 1,
                    territory_size: *t,
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn parts_cover_the_grid() {
        let snap = snapshot_with(&[Some(120.0), None, Some(30.0)], 20, 20);
        let dist = SpatialDistribution::from_snapshot(&snap);
        assert_eq!(dist.total, 400.0);
        assert!((dist.sum() - dist.total).abs() < 1e-9);
        assert_eq!(dist.controlled, 150.0);
    }

    #[test]
    fn overclaimed_territory_is_capped() {
        let snap = snapshot_with(&[Some(5_000.0), Some(f64::NAN), Some(-4.0)], 10, 10);
        let dist = SpatialDistribution::from_snapshot(&snap);
        assert_eq!(dist.controlled, 100.0);
        assert_eq!(dist.disputed, 0.0);
        assert_eq!(dist.free, 0.0);
    }

    #[test]
    fn falls_back_to_reported_grid_size() {
        let snap = Snapshot {
            grid_size: Some(GridSize::new(10, 5)),
            ..Default::default()
        };
        let dist = SpatialDistribution::from_snapshot(&snap);
        assert_eq!(dist.total, 50.0);
        assert_eq!(dist.free, 50.0);
    }

    #[test]
    fn empty_snapshot_is_all_zero() {
        assert_eq!(SpatialDistribution::from_snapshot(&Snapshot::default()), SpatialDistribution::default());
    }
}
