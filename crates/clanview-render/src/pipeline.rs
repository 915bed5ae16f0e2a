//! Full-frame snapshot renderer.

use clanview_model::{Agent, Snapshot};
use tracing::{debug, warn};

use crate::color;
use crate::scale::{FrameGeometry, MAX_CELL_SIZE, MIN_CELL_SIZE};
use crate::species::Species;
use crate::surface::{Point, Surface};

/// Smallest agent radius in pixels.
pub const MIN_AGENT_RADIUS: f64 = 4.0;

/// Thresholds and bounds for one renderer.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub min_cell_size: f64,
    pub max_cell_size: f64,
    /// Size labels are drawn above this cell size
    pub label_threshold: f64,
    /// Energy bars are drawn above this cell size
    pub energy_bar_threshold: f64,
    /// Grid lines are drawn above this cell size
    pub grid_line_threshold: f64,
    /// Resource value rendered at full intensity
    pub resource_ceiling: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            min_cell_size: MIN_CELL_SIZE,
            max_cell_size: MAX_CELL_SIZE,
            label_threshold: 10.0,
            energy_bar_threshold: 12.0,
            grid_line_threshold: 10.0,
            resource_ceiling: 100.0,
        }
    }
}

/// Why a frame was not drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The snapshot carried no grid or an empty one
    MissingGrid,
}

/// What one drawn frame contained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    pub geometry: FrameGeometry,
    pub heat_cells: usize,
    pub agents_drawn: usize,
    pub agents_skipped: usize,
    pub labels: usize,
    pub energy_bars: usize,
    pub grid_lines: bool,
}

/// Result of [`Renderer::render`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderOutcome {
    Drawn(FrameStats),
    Skipped(SkipReason),
}

/// Draws snapshots as resource heat, grid overlay and agent layers.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    config: RenderConfig,
    frames: u64,
    last_geometry: Option<FrameGeometry>,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            frames: 0,
            last_geometry: None,
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Frames drawn so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Geometry of the most recent drawn frame.
    pub fn last_geometry(&self) -> Option<FrameGeometry> {
        self.last_geometry
    }

    /// Redraw `snapshot` from scratch.
    ///
    /// A snapshot without grid data leaves the surface untouched.
    pub fn render<S: Surface + ?Sized>(
        &mut self,
        snapshot: &Snapshot,
        container_width: f64,
        surface: &mut S,
    ) -> RenderOutcome {
        if !snapshot.has_grid() {
            warn!(step = snapshot.step, "snapshot has no grid data, frame skipped");
            return RenderOutcome::Skipped(SkipReason::MissingGrid);
        }

        let geometry = FrameGeometry::with_bounds(
            snapshot.rows(),
            snapshot.cols(),
            container_width,
            self.config.min_cell_size,
            self.config.max_cell_size,
        );
        surface.resize(geometry.width(), geometry.height());
        surface.clear(color::BACKGROUND);

        let heat_cells = self.draw_resources(snapshot, &geometry, surface);
        let grid_lines = geometry.cell_size > self.config.grid_line_threshold;
        if grid_lines {
            draw_grid_lines(&geometry, surface);
        }

        let mut stats = FrameStats {
            geometry,
            heat_cells,
            agents_drawn: 0,
            agents_skipped: 0,
            labels: 0,
            energy_bars: 0,
            grid_lines,
        };
        for agent in &snapshot.agents {
            self.draw_agent(agent, &geometry, surface, &mut stats);
        }

        self.frames += 1;
        self.last_geometry = Some(geometry);
        debug!(
            step = snapshot.step,
            cell_size = geometry.cell_size,
            agents = stats.agents_drawn,
            skipped = stats.agents_skipped,
            "frame rendered"
        );
        RenderOutcome::Drawn(stats)
    }

    fn draw_resources<S: Surface + ?Sized>(
        &self,
        snapshot: &Snapshot,
        geometry: &FrameGeometry,
        surface: &mut S,
    ) -> usize {
        let mut drawn = 0;
        for (row, values) in snapshot.grid.iter().enumerate() {
            // short rows leave their missing cells blank
            for (col, value) in values.iter().take(geometry.cols).enumerate() {
                let intensity = self.resource_intensity(*value);
                if intensity <= 0.0 {
                    continue;
                }
                surface.fill_rect(
                    geometry.cell_origin(row, col),
                    geometry.cell_size,
                    geometry.cell_size,
                    color::RESOURCE.with_alpha(intensity),
                );
                drawn += 1;
            }
        }
        drawn
    }

    /// Linear heat intensity in `[0, 1]`.
    pub fn resource_intensity(&self, value: f64) -> f64 {
        if !value.is_finite() || self.config.resource_ceiling <= 0.0 {
            return 0.0;
        }
        (value / self.config.resource_ceiling).clamp(0.0, 1.0)
    }

    fn draw_agent<S: Surface + ?Sized>(
        &self,
        agent: &Agent,
        geometry: &FrameGeometry,
        surface: &mut S,
        stats: &mut FrameStats,
    ) {
        let center = geometry.to_screen(agent.position);
        if !center.is_finite() {
            debug!(id = agent.id, "agent position is not finite, skipped");
            stats.agents_skipped += 1;
            return;
        }

        let radius = agent_radius(agent, geometry.cell_size);
        let body = color::agent_color(agent.id);
        Species::from_id(agent.id).draw(surface, center, radius, body);
        if agent.state.is_combat() {
            surface.stroke_circle(center, radius + 2.0, color::COMBAT_RING, 1.5);
        }
        stats.agents_drawn += 1;

        if geometry.cell_size > self.config.label_threshold {
            surface.text(center, &agent.size.to_string(), color::LABEL, (radius * 1.2).max(8.0));
            stats.labels += 1;
        }

        if geometry.cell_size > self.config.energy_bar_threshold {
            if let Some(fraction) = agent.energy_fraction() {
                draw_energy_bar(surface, center, radius, fraction);
                stats.energy_bars += 1;
            }
        }
    }
}

/// `max(4, min(cell/2, hint))` where the hint is the server's visual size or
/// `sqrt(size) * 1.5`.
pub fn agent_radius(agent: &Agent, cell_size: f64) -> f64 {
    let hint = agent
        .visual_size
        .filter(|v| v.is_finite() && *v > 0.0)
        .unwrap_or_else(|| (agent.size as f64).sqrt() * 1.5);
    (cell_size / 2.0).min(hint).max(MIN_AGENT_RADIUS)
}

fn draw_grid_lines<S: Surface + ?Sized>(geometry: &FrameGeometry, surface: &mut S) {
    let (width, height) = (geometry.width(), geometry.height());
    for col in 0..=geometry.cols {
        let x = col as f64 * geometry.cell_size;
        surface.line(Point::new(x, 0.0), Point::new(x, height), color::GRID_LINE, 0.5);
    }
    for row in 0..=geometry.rows {
        let y = row as f64 * geometry.cell_size;
        surface.line(Point::new(0.0, y), Point::new(width, y), color::GRID_LINE, 0.5);
    }
}

fn draw_energy_bar<S: Surface + ?Sized>(surface: &mut S, center: Point, radius: f64, fraction: f64) {
    const BAR_HEIGHT: f64 = 3.0;
    let width = radius * 2.0;
    let origin = Point::new(center.x - radius, center.y - radius - BAR_HEIGHT - 2.0);
    surface.fill_rect(origin, width, BAR_HEIGHT, color::ENERGY_TRACK);
    surface.fill_rect(origin, width * fraction, BAR_HEIGHT, color::energy_color(fraction));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{DrawCommand, FrameRecorder};
    use clanview_model::AgentState;

    fn grid(rows: usize, cols: usize, value: f64) -> Vec<Vec<f64>> {
        vec![vec![value; cols]; rows]
    }

    fn agent(id: u32, position: [f64; 2], size: u32, energy: Option<f64>) -> Agent {
        Agent {
            id,
            position,
            size,
            energy,
            ..Default::default()
        }
    }

    #[test]
    fn empty_grid_keeps_previous_frame() {
        let mut renderer = Renderer::default();
        let mut surface = FrameRecorder::new();

        let first = Snapshot {
            grid: grid(10, 10, 50.0),
            agents: vec![agent(1, [2.0, 2.0], 9, Some(80.0))],
            ..Default::default()
        };
        assert!(matches!(renderer.render(&first, 160.0, &mut surface), RenderOutcome::Drawn(_)));
        let before = surface.commands().to_vec();

        let empty = Snapshot { step: 2, ..Default::default() };
        assert_eq!(
            renderer.render(&empty, 160.0, &mut surface),
            RenderOutcome::Skipped(SkipReason::MissingGrid)
        );
        let rows_without_cols = Snapshot { grid: vec![vec![], vec![]], ..Default::default() };
        assert_eq!(
            renderer.render(&rows_without_cols, 160.0, &mut surface),
            RenderOutcome::Skipped(SkipReason::MissingGrid)
        );

        assert_eq!(surface.commands(), before.as_slice());
        assert_eq!(surface.resizes(), 1);
        assert_eq!(renderer.frames(), 1);
    }

    #[test]
    fn surface_is_sized_from_grid() {
        let mut renderer = Renderer::default();
        let mut surface = FrameRecorder::new();
        let snap = Snapshot { grid: grid(30, 50, 0.0), ..Default::default() };

        let RenderOutcome::Drawn(stats) = renderer.render(&snap, 600.0, &mut surface) else {
            panic!("frame should be drawn");
        };
        assert_eq!(stats.geometry.cell_size, 12.0);
        assert_eq!(surface.width(), 600.0);
        assert_eq!(surface.height(), 360.0);
        assert_eq!(stats.heat_cells, 0);
    }

    #[test]
    fn inverted_cell_bounds_still_render() {
        let mut renderer = Renderer::new(RenderConfig {
            min_cell_size: 20.0,
            max_cell_size: 10.0,
            ..Default::default()
        });
        let mut surface = FrameRecorder::new();
        let snap = Snapshot { grid: grid(5, 5, 10.0), ..Default::default() };

        let RenderOutcome::Drawn(stats) = renderer.render(&snap, 800.0, &mut surface) else {
            panic!("frame should be drawn");
        };
        assert_eq!(stats.geometry.cell_size, 10.0);
        assert_eq!(surface.width(), 50.0);
    }

    #[test]
    fn heat_alpha_tracks_resource_level() {
        let mut renderer = Renderer::default();
        let mut surface = FrameRecorder::new();
        let snap = Snapshot {
            grid: vec![vec![0.0, 50.0, 100.0, 250.0]],
            ..Default::default()
        };
        renderer.render(&snap, 32.0, &mut surface);

        let alphas: Vec<u8> = surface
            .commands()
            .iter()
            .filter_map(|cmd| match cmd {
                DrawCommand::FillRect { color, .. } if color.r == 0 && color.g == 100 => Some(color.a),
                _ => None,
            })
            .collect();
        assert_eq!(alphas, vec![128, 255, 255]);
    }

    #[test]
    fn small_cells_hide_overlays() {
        let mut renderer = Renderer::default();
        let mut surface = FrameRecorder::new();
        let snap = Snapshot {
            grid: grid(100, 100, 10.0),
            agents: vec![agent(1, [5.0, 5.0], 16, Some(90.0))],
            ..Default::default()
        };

        let RenderOutcome::Drawn(stats) = renderer.render(&snap, 800.0, &mut surface) else {
            panic!("frame should be drawn");
        };
        assert_eq!(stats.geometry.cell_size, 8.0);
        assert!(!stats.grid_lines);
        assert_eq!(stats.labels, 0);
        assert_eq!(stats.energy_bars, 0);
        assert_eq!(surface.count(|c| matches!(c, DrawCommand::Line { .. })), 0);
        assert!(surface.texts().is_empty());
    }

    #[test]
    fn large_cells_show_overlays() {
        let mut renderer = Renderer::default();
        let mut surface = FrameRecorder::new();
        let snap = Snapshot {
            grid: grid(10, 10, 10.0),
            agents: vec![
                agent(1, [5.0, 5.0], 16, Some(90.0)),
                agent(2, [1.0, 1.0], 4, None),
            ],
            ..Default::default()
        };

        let RenderOutcome::Drawn(stats) = renderer.render(&snap, 800.0, &mut surface) else {
            panic!("frame should be drawn");
        };
        assert_eq!(stats.geometry.cell_size, 16.0);
        assert!(stats.grid_lines);
        assert_eq!(surface.count(|c| matches!(c, DrawCommand::Line { .. })), 22);
        assert_eq!(stats.labels, 2);
        assert_eq!(surface.texts(), vec!["16", "4"]);
        // the agent without energy still draws, just without a bar
        assert_eq!(stats.agents_drawn, 2);
        assert_eq!(stats.energy_bars, 1);
    }

    #[test]
    fn non_finite_agents_are_skipped() {
        let mut renderer = Renderer::default();
        let mut surface = FrameRecorder::new();
        let snap = Snapshot {
            grid: grid(5, 5, 10.0),
            agents: vec![
                agent(1, [f64::NAN, 1.0], 4, None),
                agent(3, [1.0, 1.0], 4, None),
            ],
            ..Default::default()
        };
        let RenderOutcome::Drawn(stats) = renderer.render(&snap, 80.0, &mut surface) else {
            panic!("frame should be drawn");
        };
        assert_eq!(stats.agents_drawn, 1);
        assert_eq!(stats.agents_skipped, 1);
    }

    #[test]
    fn radius_bounds() {
        let small = agent(1, [0.0, 0.0], 1, None);
        assert_eq!(agent_radius(&small, 16.0), MIN_AGENT_RADIUS);

        let big = agent(1, [0.0, 0.0], 400, None);
        assert_eq!(agent_radius(&big, 16.0), 8.0);

        let mid = agent(1, [0.0, 0.0], 25, None);
        assert_eq!(agent_radius(&mid, 16.0), 7.5);

        let hinted = Agent { visual_size: Some(5.0), ..agent(1, [0.0, 0.0], 400, None) };
        assert_eq!(agent_radius(&hinted, 16.0), 5.0);
    }

    #[test]
    fn combat_agents_get_a_ring() {
        let mut renderer = Renderer::default();
        let mut surface = FrameRecorder::new();
        let fighter = Agent {
            state: AgentState::Fighting,
            ..agent(1, [2.0, 2.0], 9, None)
        };
        let snap = Snapshot {
            grid: grid(5, 5, 0.0),
            agents: vec![fighter],
            ..Default::default()
        };
        renderer.render(&snap, 40.0, &mut surface);
        assert_eq!(
            surface.count(|c| matches!(c, DrawCommand::StrokeCircle { color: ring, .. } if *ring == color::COMBAT_RING)),
            1
        );
    }
}
