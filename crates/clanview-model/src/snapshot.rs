//! Authoritative simulation view received from the server.

use serde::{Deserialize, Deserializer, Serialize};

/// Deserialize `null` the same way as an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Behavioral state of an agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    Foraging,
    Migrating,
    Resting,
    Fighting,
    Defending,
    /// Tag not known to this client
    #[default]
    #[serde(other)]
    Unknown,
}

impl AgentState {
    /// Whether the agent is engaged in combat.
    pub fn is_combat(&self) -> bool {
        matches!(self, AgentState::Fighting | AgentState::Defending)
    }
}

/// One simulated territorial group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Stable identifier, also selects the visual species
    pub id: u32,
    /// Continuous position in grid units `[x, y]`
    #[serde(default)]
    pub position: [f64; 2],
    /// Population count
    #[serde(default)]
    pub size: u32,
    /// Energy level, 0-100
    #[serde(default)]
    pub energy: Option<f64>,
    #[serde(default)]
    pub state: AgentState,
    /// Controlled area in cells
    #[serde(default, alias = "territorySize")]
    pub territory_size: Option<f64>,
    /// Radius hint computed by the server
    #[serde(default, alias = "visualSize")]
    pub visual_size: Option<f64>,
    #[serde(default)]
    pub strategy: Option<String>,
}

impl Agent {
    /// Energy as a fraction in `[0, 1]`, if the agent reports one.
    pub fn energy_fraction(&self) -> Option<f64> {
        self.energy
            .filter(|e| e.is_finite())
            .map(|e| (e / 100.0).clamp(0.0, 1.0))
    }
}

/// Aggregate scalars computed by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemMetrics {
    pub total_population: u64,
    pub total_resources: f64,
    pub average_energy: f64,
    #[serde(alias = "active_clans")]
    pub active_agents: u32,
    pub grid_width: u32,
    pub grid_height: u32,
}

/// Grid dimensions in cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "GridSizeRepr")]
pub struct GridSize {
    pub width: u32,
    pub height: u32,
}

impl GridSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn cells(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// The server sends grid sizes either as `[w, h]` or as an object.
#[derive(Deserialize)]
#[serde(untagged)]
enum GridSizeRepr {
    Pair([u32; 2]),
    Object { width: u32, height: u32 },
}

impl From<GridSizeRepr> for GridSize {
    fn from(repr: GridSizeRepr) -> Self {
        match repr {
            GridSizeRepr::Pair([width, height]) => GridSize { width, height },
            GridSizeRepr::Object { width, height } => GridSize { width, height },
        }
    }
}

/// One point-in-time view of the simulated grid and agents.
///
/// Snapshots are never merged: every received message replaces the previous
/// one wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub step: u64,
    #[serde(default)]
    pub running: bool,
    /// Simulation clock
    #[serde(default)]
    pub time: f64,
    #[serde(default)]
    pub mode: Option<String>,
    /// Resource field, `grid[row][col]`
    #[serde(default, alias = "resource_grid", deserialize_with = "null_as_default")]
    pub grid: Vec<Vec<f64>>,
    #[serde(default, alias = "clans", deserialize_with = "null_as_default")]
    pub agents: Vec<Agent>,
    #[serde(default, alias = "systemMetrics")]
    pub system_metrics: Option<SystemMetrics>,
    #[serde(default, alias = "maxSteps")]
    pub max_steps: Option<u32>,
    #[serde(default, alias = "autoStop")]
    pub auto_stop: Option<bool>,
    #[serde(default, alias = "gridSize")]
    pub grid_size: Option<GridSize>,
}

impl Snapshot {
    /// Number of grid rows.
    pub fn rows(&self) -> usize {
        self.grid.len()
    }

    /// Number of grid columns, taken from the first row.
    pub fn cols(&self) -> usize {
        self.grid.first().map(Vec::len).unwrap_or(0)
    }

    /// Whether the snapshot carries a drawable resource grid.
    pub fn has_grid(&self) -> bool {
        self.rows() > 0 && self.cols() > 0
    }

    pub fn total_cells(&self) -> u64 {
        self.rows() as u64 * self.cols() as u64
    }

    /// Total population, preferring the server's aggregate.
    pub fn total_population(&self) -> f64 {
        match &self.system_metrics {
            Some(metrics) => metrics.total_population as f64,
            None => self.agents.iter().map(|a| a.size as f64).sum(),
        }
    }

    /// Total resources, preferring the server's aggregate.
    pub fn total_resources(&self) -> f64 {
        match &self.system_metrics {
            Some(metrics) => metrics.total_resources,
            None => self
                .grid
                .iter()
                .flatten()
                .filter(|v| v.is_finite())
                .sum(),
        }
    }
}
